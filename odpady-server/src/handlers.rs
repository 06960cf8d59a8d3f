//! HTTP handler functions for the report API.

use actix_web::http::header::{self, ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpRequest, HttpResponse, web};
use odpady_core::{ArtifactFormat, ReportRequest, ServiceError};

use crate::AppState;
use crate::error::ApiError;
use crate::models::{GenerateBody, HealthBody, ListingBody};

/// `GET /api/health`
pub(crate) async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthBody {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_owned(),
    })
}

/// `POST /api/reports/generate`
///
/// Generates, stores, and returns the three artifacts for one quarter.
pub(crate) async fn generate_report(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    // Credentials are checked before the body so an anonymous caller gets 401.
    let token = bearer_token(&req).ok_or(ServiceError::Unauthenticated)?;
    let request: ReportRequest =
        serde_json::from_slice(&body).map_err(|err| ApiError::InvalidBody(err.to_string()))?;

    let outcome = state.service.generate(Some(token), &request).await?;
    Ok(HttpResponse::Ok().json(GenerateBody::from(outcome)))
}

/// `GET /api/reports`
///
/// Lists stored reports of the caller's municipality, newest first.
pub(crate) async fn list_reports(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let listings = state.service.list_reports(bearer_token(&req)).await?;
    let body: Vec<ListingBody> = listings.into_iter().map(ListingBody::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// `GET /api/reports/{year}/{quarter}/{format}`
///
/// Serves one stored artifact as a file download.
pub(crate) async fn download_report(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(i64, i64, String)>,
) -> Result<HttpResponse, ApiError> {
    let (year, quarter, format) = path.into_inner();
    let format: ArtifactFormat = format.parse()?;

    let download = state
        .service
        .stored_artifact(bearer_token(&req), year, quarter, format)
        .await?;

    Ok(HttpResponse::Ok()
        .content_type(download.format.content_type())
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(download.file_name)],
        })
        .body(download.bytes))
}

/// Token from an `Authorization: Bearer <token>` header.
fn bearer_token(req: &HttpRequest) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|token| !token.is_empty())
}
