//! Backend implementation for Supabase: GoTrue for identity, PostgREST for the
//! `obce`, `vyvozy`, and `reporty` tables.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, warn};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, InvalidHeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use rust_decimal::Decimal;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};

use odpady_core::{
    CollectionPort, CollectionRecord, DateRange, IdentityPort, Municipality, MunicipalityId,
    MunicipalityPort, PortError, PostalAddress, Quarter, ReportArtifact, ReportKey,
    ReportListing, ReportStorePort, UpsertOutcome, UserId, WasteType,
};

const MUNICIPALITIES: &str = "obce";
const COLLECTIONS: &str = "vyvozy";
const REPORTS: &str = "reporty";
const REPORT_KEY_COLUMNS: &str = "obec_id,kvartal,rok";
const REPORT_COLUMNS: &str = "obec_id,kvartal,rok,subor_csv,subor_xml,subor_xlsx,vygenerovane_dna";

/// Account as returned by `/auth/v1/user`.
#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
}

/// Row of the `obce` table.
#[derive(Debug, Deserialize)]
struct MunicipalityRow {
    id: i64,
    nazov: String,
    #[serde(default)]
    ico: Option<String>,
    #[serde(default)]
    ulica: Option<String>,
    #[serde(default)]
    mesto: Option<String>,
    #[serde(default)]
    psc: Option<String>,
}

impl From<MunicipalityRow> for Municipality {
    fn from(row: MunicipalityRow) -> Self {
        Self {
            id: MunicipalityId(row.id),
            name: row.nazov,
            ico: row.ico,
            address: PostalAddress {
                street: row.ulica,
                city: row.mesto,
                postal_code: row.psc,
            },
        }
    }
}

/// Row of the `vyvozy` table.
#[derive(Debug, Deserialize)]
struct CollectionRow {
    obec_id: i64,
    datum: NaiveDate,
    typ_odpadu: String,
    mnozstvo_kg: Decimal,
    #[serde(default)]
    kod_odpadu: Option<String>,
    #[serde(default)]
    kod_nakladania: Option<String>,
}

impl From<CollectionRow> for CollectionRecord {
    fn from(row: CollectionRow) -> Self {
        Self {
            municipality: MunicipalityId(row.obec_id),
            collected_on: row.datum,
            waste_type: WasteType::from_tag(&row.typ_odpadu),
            mass_kg: row.mnozstvo_kg,
            waste_code: row.kod_odpadu,
            treatment_code: row.kod_nakladania,
        }
    }
}

/// Row of the `reporty` table. The workbook is stored base64-encoded in a text column.
#[derive(Debug, Serialize, Deserialize)]
struct ReportRow {
    obec_id: i64,
    kvartal: Quarter,
    rok: i32,
    subor_csv: Option<String>,
    subor_xml: Option<String>,
    subor_xlsx: Option<String>,
    vygenerovane_dna: DateTime<Utc>,
}

impl ReportRow {
    fn from_artifact(artifact: &ReportArtifact) -> Self {
        Self {
            obec_id: artifact.key.municipality.0,
            kvartal: artifact.key.quarter,
            rok: artifact.key.year,
            subor_csv: artifact.csv.clone(),
            subor_xml: artifact.xml.clone(),
            subor_xlsx: artifact.xlsx.as_deref().map(|bytes| STANDARD.encode(bytes)),
            vygenerovane_dna: artifact.generated_at,
        }
    }

    fn into_artifact(self) -> Result<ReportArtifact, PortError> {
        let xlsx = self
            .subor_xlsx
            .map(|encoded| STANDARD.decode(encoded.trim()))
            .transpose()
            .map_err(|err| PortError::Decode(format!("subor_xlsx: {err}")))?;

        Ok(ReportArtifact {
            key: ReportKey {
                municipality: MunicipalityId(self.obec_id),
                year: self.rok,
                quarter: self.kvartal,
            },
            csv: self.subor_csv,
            xml: self.subor_xml,
            xlsx,
            generated_at: self.vygenerovane_dna,
        })
    }
}

/// Connection settings and HTTP client shared by all Supabase ports.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_headers: HeaderMap,
}

impl SupabaseClient {
    /// Bind to a project URL using the service-role key for table access.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Internal`] if the key cannot be sent as a header.
    pub fn new(client: Client, base_url: &str, service_key: &str) -> Result<Self, PortError> {
        let invalid_key = |err: InvalidHeaderValue| PortError::Internal(format!("service key: {err}"));

        let mut service_headers = HeaderMap::new();
        service_headers.insert("apikey", HeaderValue::from_str(service_key).map_err(invalid_key)?);
        let mut bearer =
            HeaderValue::from_str(&format!("Bearer {service_key}")).map_err(invalid_key)?;
        bearer.set_sensitive(true);
        service_headers.insert(AUTHORIZATION, bearer);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            service_headers,
        })
    }

    fn table(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn get(&self, table: &str) -> RequestBuilder {
        self.client
            .get(self.table(table))
            .headers(self.service_headers.clone())
    }

    fn report_filter(key: &ReportKey) -> [(&'static str, String); 3] {
        [
            ("obec_id", format!("eq.{}", key.municipality)),
            ("kvartal", format!("eq.{}", key.quarter.number())),
            ("rok", format!("eq.{}", key.year)),
        ]
    }

    async fn report_exists(&self, key: &ReportKey) -> Result<bool, PortError> {
        let req = self
            .get(REPORTS)
            .query(&Self::report_filter(key))
            .query(&[("select", "obec_id")]);
        let rows = fetch_json::<Vec<IgnoredAny>>(req).await?;
        Ok(!rows.is_empty())
    }
}

#[async_trait]
impl IdentityPort for SupabaseClient {
    async fn authenticate(&self, token: &str) -> Result<UserId, PortError> {
        let apikey = self
            .service_headers
            .get("apikey")
            .cloned()
            .ok_or_else(|| PortError::Internal("service key missing".to_owned()))?;
        let req = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", apikey)
            .bearer_auth(token);

        let user = fetch_json::<AuthUser>(req).await?;
        Ok(UserId(user.id))
    }
}

#[async_trait]
impl MunicipalityPort for SupabaseClient {
    async fn municipality_for_user(
        &self,
        user: &UserId,
    ) -> Result<Option<Municipality>, PortError> {
        let req = self.get(MUNICIPALITIES).query(&[
            ("auth_user_id", format!("eq.{}", user.0)),
            ("select", "id,nazov,ico,ulica,mesto,psc".to_owned()),
            ("limit", "2".to_owned()),
        ]);

        let mut rows = fetch_json::<Vec<MunicipalityRow>>(req).await?;
        if rows.len() > 1 {
            return Err(PortError::Internal(format!(
                "multiple municipalities for account {}",
                user.0
            )));
        }
        Ok(rows.pop().map(Municipality::from))
    }
}

#[async_trait]
impl CollectionPort for SupabaseClient {
    async fn collections(
        &self,
        municipality: MunicipalityId,
        range: DateRange,
    ) -> Result<Vec<CollectionRecord>, PortError> {
        let req = self.get(COLLECTIONS).query(&[
            ("obec_id", format!("eq.{municipality}")),
            ("datum", format!("gte.{}", range.start)),
            ("datum", format!("lte.{}", range.end)),
            (
                "select",
                "obec_id,datum,typ_odpadu,mnozstvo_kg,kod_odpadu,kod_nakladania".to_owned(),
            ),
            ("order", "datum.asc".to_owned()),
        ]);

        let rows = fetch_json::<Vec<CollectionRow>>(req).await?;
        debug!(
            "Fetched {} collections for municipality {municipality} between {} and {}",
            rows.len(),
            range.start,
            range.end
        );
        Ok(rows.into_iter().map(CollectionRecord::from).collect())
    }
}

#[async_trait]
impl ReportStorePort for SupabaseClient {
    async fn insert_report(&self, artifact: &ReportArtifact) -> Result<(), PortError> {
        let req = self
            .client
            .post(self.table(REPORTS))
            .headers(self.service_headers.clone())
            .header("Prefer", "return=minimal")
            .json(&[ReportRow::from_artifact(artifact)]);

        send(req).await.map(drop)
    }

    async fn update_report(&self, artifact: &ReportArtifact) -> Result<(), PortError> {
        let req = self
            .client
            .patch(self.table(REPORTS))
            .headers(self.service_headers.clone())
            .header("Prefer", "return=representation")
            .query(&Self::report_filter(&artifact.key))
            .query(&[("select", "obec_id")])
            .json(&ReportRow::from_artifact(artifact));

        let updated = fetch_json::<Vec<IgnoredAny>>(req).await?;
        if updated.is_empty() {
            return Err(PortError::NotFound);
        }
        Ok(())
    }

    async fn upsert_report(&self, artifact: &ReportArtifact) -> Result<UpsertOutcome, PortError> {
        // The write below is atomic on its own; this lookup only labels the outcome.
        let existed = self
            .report_exists(&artifact.key)
            .await
            .inspect_err(|err| {
                warn!(
                    "Could not check for a stored report of municipality {} for Q{} {}: {err}",
                    artifact.key.municipality,
                    artifact.key.quarter.number(),
                    artifact.key.year
                );
            })
            .unwrap_or(true);

        let req = self
            .client
            .post(self.table(REPORTS))
            .headers(self.service_headers.clone())
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .query(&[("on_conflict", REPORT_KEY_COLUMNS)])
            .json(&[ReportRow::from_artifact(artifact)]);
        send(req).await?;

        Ok(if existed {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        })
    }

    async fn find_report(&self, key: &ReportKey) -> Result<Option<ReportArtifact>, PortError> {
        let req = self
            .get(REPORTS)
            .query(&Self::report_filter(key))
            .query(&[("select", REPORT_COLUMNS), ("limit", "1")]);

        let rows = fetch_json::<Vec<ReportRow>>(req).await?;
        rows.into_iter().next().map(ReportRow::into_artifact).transpose()
    }

    async fn list_reports(
        &self,
        municipality: MunicipalityId,
    ) -> Result<Vec<ReportListing>, PortError> {
        let req = self.get(REPORTS).query(&[
            ("obec_id", format!("eq.{municipality}")),
            ("select", REPORT_COLUMNS.to_owned()),
            ("order", "rok.desc,kvartal.desc".to_owned()),
        ]);

        fetch_json::<Vec<ReportRow>>(req)
            .await?
            .into_iter()
            .map(|row| row.into_artifact().map(|artifact| artifact.listing()))
            .collect()
    }
}

fn transport_error(err: &reqwest::Error) -> PortError {
    if err.is_decode() {
        PortError::Decode(err.to_string())
    } else {
        PortError::Network(err.to_string())
    }
}

fn status_error(status: StatusCode, body: &str) -> PortError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PortError::Unauthorized,
        StatusCode::CONFLICT => PortError::Conflict,
        StatusCode::NOT_FOUND => PortError::NotFound,
        _ => PortError::Network(format!("HTTP {status}: {}", body.trim())),
    }
}

// Send a request and turn non-success statuses into port errors.
async fn send(req: RequestBuilder) -> Result<Response, PortError> {
    let response = req.send().await.map_err(|err| transport_error(&err))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, PortError> {
    send(req)
        .await?
        .json()
        .await
        .map_err(|err| PortError::Decode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    #[test]
    fn decodes_municipality_rows() {
        let json = r#"[{"id": 4, "nazov": "Obec Lúka", "ico": "00312345",
                        "ulica": "Hlavná 1", "mesto": "Lúka", "psc": null}]"#;

        let rows: Vec<MunicipalityRow> = serde_json::from_str(json).expect("valid rows");
        let municipality = rows.into_iter().next().map(Municipality::from).expect("one row");

        assert_eq!(municipality.id, MunicipalityId(4), "id");
        assert_eq!(municipality.name, "Obec Lúka", "name");
        assert_eq!(municipality.address.city.as_deref(), Some("Lúka"), "city");
        assert_eq!(municipality.address.postal_code, None, "postal code");
    }

    #[test]
    fn decodes_collection_rows_with_numeric_mass() {
        let json = r#"[
            {"obec_id": 4, "datum": "2024-02-01", "typ_odpadu": "Plast", "mnozstvo_kg": 12.5,
             "kod_odpadu": null, "kod_nakladania": null},
            {"obec_id": 4, "datum": "2024-03-31", "typ_odpadu": "kov", "mnozstvo_kg": "0.125",
             "kod_odpadu": "20 01 40", "kod_nakladania": "R04"}
        ]"#;

        let rows: Vec<CollectionRow> = serde_json::from_str(json).expect("valid rows");
        let records: Vec<_> = rows.into_iter().map(CollectionRecord::from).collect();

        assert_eq!(records.len(), 2, "two records");
        let plastic = records.first().expect("first record");
        assert_eq!(plastic.waste_type, WasteType::Plastic, "tag normalised");
        assert_eq!(plastic.mass_kg, Decimal::new(125, 1), "numeric mass");
        let metal = records.get(1).expect("second record");
        assert_eq!(metal.mass_kg, Decimal::new(125, 3), "string mass");
        assert_eq!(metal.waste_code.as_deref(), Some("20 01 40"), "explicit code kept");
    }

    #[test]
    fn report_rows_store_workbook_as_base64() {
        let artifact = ReportArtifact {
            key: ReportKey {
                municipality: MunicipalityId(4),
                year: 2024,
                quarter: Quarter::new(1).expect("valid quarter"),
            },
            csv: Some("csv".to_owned()),
            xml: None,
            xlsx: Some(vec![0x50, 0x4b, 0x03, 0x04]),
            generated_at: Utc
                .with_ymd_and_hms(2024, 4, 2, 9, 30, 0)
                .single()
                .expect("valid timestamp"),
        };

        let row = ReportRow::from_artifact(&artifact);
        let json = serde_json::to_value(&row).expect("serializable row");

        assert_eq!(json["kvartal"], 1, "quarter as number");
        assert_eq!(json["subor_xlsx"], "UEsDBA==", "base64 workbook");
        assert!(json["subor_xml"].is_null(), "missing xml stays null");

        let restored = row.into_artifact().expect("decodable row");
        assert_eq!(restored, artifact, "row restores the artifact");
    }

    #[test]
    fn rejects_corrupt_workbook_payload() {
        let json = r#"{"obec_id": 4, "kvartal": 2, "rok": 2024, "subor_csv": null,
                       "subor_xml": null, "subor_xlsx": "not base64!",
                       "vygenerovane_dna": "2024-07-01T08:00:00+00:00"}"#;

        let row: ReportRow = serde_json::from_str(json).expect("valid row");

        assert!(
            matches!(row.into_artifact(), Err(PortError::Decode(_))),
            "decode error"
        );
    }

    #[test]
    fn rejects_out_of_range_quarter_rows() {
        let json = r#"{"obec_id": 4, "kvartal": 5, "rok": 2024, "subor_csv": null,
                       "subor_xml": null, "subor_xlsx": null,
                       "vygenerovane_dna": "2024-07-01T08:00:00+00:00"}"#;

        assert!(
            serde_json::from_str::<ReportRow>(json).is_err(),
            "quarter 5 rejected"
        );
    }

    #[test]
    fn maps_http_statuses_to_port_errors() {
        assert!(
            matches!(status_error(StatusCode::UNAUTHORIZED, ""), PortError::Unauthorized),
            "401"
        );
        assert!(
            matches!(status_error(StatusCode::CONFLICT, "duplicate key"), PortError::Conflict),
            "409"
        );
        assert!(
            matches!(
                status_error(StatusCode::BAD_GATEWAY, " upstream down\n"),
                PortError::Network(message) if message.ends_with("upstream down")
            ),
            "502"
        );
    }

    #[test]
    fn trims_trailing_slash_from_project_url() {
        let client = SupabaseClient::new(Client::new(), "https://demo.supabase.co/", "key")
            .expect("valid key");
        assert_eq!(
            client.table(REPORTS),
            "https://demo.supabase.co/rest/v1/reporty",
            "table url"
        );
    }
}
