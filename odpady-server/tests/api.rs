//! End-to-end tests of the HTTP API against the in-memory backend.

use std::io::{Cursor, Read as _};
use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::http::header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE};
use actix_web::{App, test, web};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDate, TimeZone as _, Utc};
use odpady_core::{
    Backend, Clock, CollectionRecord, Municipality, MunicipalityId, PostalAddress, ReportService,
    UserId, WasteCodeTable, WasteType,
};
use odpady_server::{AppState, configure};
use odpady_store_memory::{Account, MemoryStore};
use rust_decimal::Decimal;
use serde_json::{Value, json};

const TOKEN: &str = "token-obec";
const ORPHAN_TOKEN: &str = "token-orphan";

struct FixedClock;

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 10, 0, 0)
            .single()
            .expect("valid timestamp")
    }
}

fn record(municipality: i64, tag: &str, date: (i32, u32, u32), mass: Decimal) -> CollectionRecord {
    CollectionRecord::new(
        MunicipalityId(municipality),
        NaiveDate::from_ymd_opt(date.0, date.1, date.2).expect("valid date"),
        WasteType::from_tag(tag),
        mass,
    )
}

fn seeded_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new()
        .with_account(Account {
            token: TOKEN.to_owned(),
            user: UserId("user-1".to_owned()),
            municipality: Some(Municipality {
                id: MunicipalityId(1),
                name: "Obec Lúčka".to_owned(),
                ico: Some("00312345".to_owned()),
                address: PostalAddress {
                    street: Some("Hlavná 1".to_owned()),
                    city: Some("Lúčka".to_owned()),
                    postal_code: Some("900 01".to_owned()),
                },
            }),
        })
        .with_account(Account {
            token: ORPHAN_TOKEN.to_owned(),
            user: UserId("user-2".to_owned()),
            municipality: None,
        })
        .with_collections([
            record(1, "plast", (2024, 2, 1), Decimal::new(35, 1)),
            record(1, "papier", (2024, 2, 15), Decimal::new(125, 2)),
            record(1, "plast", (2024, 3, 1), Decimal::new(75, 2)),
            record(1, "sklo", (2024, 5, 10), Decimal::new(2, 0)),
            record(2, "plast", (2024, 2, 1), Decimal::new(100, 0)),
        ]);
    Arc::new(store)
}

fn state(store: &Arc<MemoryStore>) -> web::Data<AppState> {
    let service = ReportService::new(
        Backend::from_shared(Arc::clone(store)),
        Arc::new(WasteCodeTable::slovak_defaults()),
        odpady_export::encoders(),
    )
    .with_clock(Arc::new(FixedClock));
    web::Data::new(AppState::new(service))
}

macro_rules! app {
    ($store:expr) => {
        test::init_service(App::new().app_data(state($store)).configure(configure)).await
    };
}

fn generate(token: Option<&str>, body: &Value) -> test::TestRequest {
    let req = test::TestRequest::post()
        .uri("/api/reports/generate")
        .set_json(body);
    match token {
        Some(token) => req.insert_header((AUTHORIZATION, format!("Bearer {token}"))),
        None => req,
    }
}

fn authorized_get(uri: &str) -> test::TestRequest {
    test::TestRequest::get()
        .uri(uri)
        .insert_header((AUTHORIZATION, format!("Bearer {TOKEN}")))
}

#[actix_web::test]
async fn health_reports_version() {
    let app = app!(&seeded_store());

    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/health").to_request())
            .await;

    assert_eq!(body["healthy"], true, "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"), "version");
}

#[actix_web::test]
async fn generates_all_artifacts_for_quarter() {
    let store = seeded_store();
    let app = app!(&store);

    let resp = test::call_service(
        &app,
        generate(Some(TOKEN), &json!({ "quarter": 1, "year": 2024 })).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK, "status");
    let body: Value = test::read_body_json(resp).await;

    assert_eq!(body["success"], true, "success");
    assert_eq!(
        body["summary"],
        json!({ "totalCollections": 3, "totalKg": "5.50" }),
        "summary"
    );
    assert_eq!(
        body["csv"],
        "\u{feff}Kód odpadu;Názov odpadu;Kód nakladania;Množstvo (kg)\r\n\
         20 01 01;Papier a lepenka;R03;1,25\r\n\
         20 01 39;Plasty;R03;4,25\r\n",
        "csv"
    );

    let xml = body["xml"].as_str().expect("xml present");
    assert!(xml.contains("<nazov>Obec Lúčka</nazov>"), "municipality name");
    assert!(xml.contains("<mnozstvo_kg>4.25</mnozstvo_kg>"), "plastic total");
    assert!(xml.contains("<mnozstvo_kg>1.25</mnozstvo_kg>"), "paper total");
    assert!(!xml.contains("100.00"), "other municipality excluded");

    let xlsx = STANDARD
        .decode(body["xlsx"].as_str().expect("xlsx present"))
        .expect("base64 workbook");
    let mut archive = zip::ZipArchive::new(Cursor::new(xlsx)).expect("valid package");
    let mut workbook = String::new();
    archive
        .by_name("xl/workbook.xml")
        .expect("workbook part")
        .read_to_string(&mut workbook)
        .expect("utf-8 part");
    assert!(workbook.contains(r#"name="Q1 2024""#), "sheet name");

    assert_eq!(store.report_count(), 1, "report stored");
}

#[actix_web::test]
async fn regeneration_is_idempotent() {
    let store = seeded_store();
    let app = app!(&store);
    let request = json!({ "kvartal": 1, "rok": 2024 });

    let first: Value =
        test::call_and_read_body_json(&app, generate(Some(TOKEN), &request).to_request()).await;
    let second: Value =
        test::call_and_read_body_json(&app, generate(Some(TOKEN), &request).to_request()).await;

    assert_eq!(first, second, "identical artifacts");
    assert_eq!(store.report_count(), 1, "single stored row");
}

#[actix_web::test]
async fn empty_period_returns_message_without_artifacts() {
    let store = seeded_store();
    let app = app!(&store);

    let body: Value = test::call_and_read_body_json(
        &app,
        generate(Some(TOKEN), &json!({ "quarter": 3, "year": 2024 })).to_request(),
    )
    .await;

    assert_eq!(
        body,
        json!({
            "success": true,
            "xml": null,
            "csv": null,
            "xlsx": null,
            "summary": {
                "totalCollections": 0,
                "totalKg": "0.00",
                "message": "No collections recorded for Q3 2024"
            }
        }),
        "empty response"
    );
    assert_eq!(store.report_count(), 0, "nothing stored");
}

#[actix_web::test]
async fn rejects_invalid_requests_in_order() {
    let store = seeded_store();
    let app = app!(&store);

    let cases = [
        (None, json!({ "quarter": 1, "year": 2024 }), StatusCode::UNAUTHORIZED),
        (None, json!({ "quarter": 5, "year": 2024 }), StatusCode::UNAUTHORIZED),
        (Some(TOKEN), json!({ "quarter": 5, "year": 2024 }), StatusCode::BAD_REQUEST),
        (Some(TOKEN), json!({ "quarter": 1, "year": 1999 }), StatusCode::BAD_REQUEST),
        (Some(TOKEN), json!({ "quarter": 1 }), StatusCode::BAD_REQUEST),
        (Some(TOKEN), json!({ "quarter": "first", "year": 2024 }), StatusCode::BAD_REQUEST),
        (Some("forged"), json!({ "quarter": 1, "year": 2024 }), StatusCode::UNAUTHORIZED),
        (Some(ORPHAN_TOKEN), json!({ "quarter": 1, "year": 2024 }), StatusCode::NOT_FOUND),
    ];

    for (token, request, status) in cases {
        let resp = test::call_service(&app, generate(token, &request).to_request()).await;
        assert_eq!(resp.status(), status, "{token:?} {request}");
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string(), "error body for {request}");
    }

    assert_eq!(store.report_count(), 0, "no side effects");
}

#[actix_web::test]
async fn lists_stored_reports_newest_first() {
    let app = app!(&seeded_store());
    for quarter in [1, 2] {
        let resp = test::call_service(
            &app,
            generate(Some(TOKEN), &json!({ "quarter": quarter, "year": 2024 })).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK, "generate Q{quarter}");
    }

    let body: Value =
        test::call_and_read_body_json(&app, authorized_get("/api/reports").to_request()).await;

    assert_eq!(
        body,
        json!([
            {
                "year": 2024,
                "quarter": 2,
                "generatedAt": "2024-07-01T10:00:00Z",
                "formats": ["csv", "xml", "xlsx"]
            },
            {
                "year": 2024,
                "quarter": 1,
                "generatedAt": "2024-07-01T10:00:00Z",
                "formats": ["csv", "xml", "xlsx"]
            }
        ]),
        "listing"
    );
}

#[actix_web::test]
async fn downloads_stored_artifact() {
    let app = app!(&seeded_store());
    let generated: Value = test::call_and_read_body_json(
        &app,
        generate(Some(TOKEN), &json!({ "quarter": 1, "year": 2024 })).to_request(),
    )
    .await;

    let resp = test::call_service(&app, authorized_get("/api/reports/2024/1/csv").to_request()).await;

    assert_eq!(resp.status(), StatusCode::OK, "status");
    assert_eq!(
        resp.headers().get(CONTENT_TYPE).and_then(|value| value.to_str().ok()),
        Some("text/csv; charset=utf-8"),
        "content type"
    );
    assert_eq!(
        resp.headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok()),
        Some(r#"attachment; filename="report_Q1_2024.csv""#),
        "file name"
    );
    let bytes = test::read_body(resp).await;
    assert_eq!(
        bytes.as_ref(),
        generated["csv"].as_str().expect("csv present").as_bytes(),
        "stored payload matches generated one"
    );
}

#[actix_web::test]
async fn download_errors() {
    let app = app!(&seeded_store());

    let missing = test::call_service(&app, authorized_get("/api/reports/2024/4/xml").to_request()).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND, "never generated");

    let format = test::call_service(&app, authorized_get("/api/reports/2024/1/pdf").to_request()).await;
    assert_eq!(format.status(), StatusCode::BAD_REQUEST, "unsupported format");

    for uri in [
        "/api/reports/abc/1/csv",
        "/api/reports/2024/x/csv",
        "/api/reports/99999999999999999999/1/csv",
    ] {
        let resp = test::call_service(&app, authorized_get(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert!(
            body["error"]
                .as_str()
                .is_some_and(|error| error.starts_with("Invalid request path")),
            "json error body for {uri}"
        );
    }

    let anonymous = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/reports/2024/1/csv")
            .to_request(),
    )
    .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED, "no token");
}
