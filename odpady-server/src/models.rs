//! JSON bodies exchanged with the dashboard.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::Serialize;

use odpady_core::{ArtifactFormat, ReportListing, ReportOutcome};

/// `GET /api/health` response.
#[derive(Debug, Serialize)]
pub struct HealthBody {
    /// Always `true` while the process serves requests.
    pub healthy: bool,
    /// Crate version.
    pub version: String,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable description.
    pub error: String,
}

/// Totals attached to every generation response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryBody {
    /// Number of collection records in the period.
    pub total_collections: usize,
    /// Total mass with two decimals.
    pub total_kg: String,
    /// Explanation for periods without collections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `POST /api/reports/generate` response.
#[derive(Debug, Serialize)]
pub struct GenerateBody {
    /// Always `true`; failures use [`ErrorBody`].
    pub success: bool,
    /// ISOH XML document.
    pub xml: Option<String>,
    /// Semicolon-delimited text.
    pub csv: Option<String>,
    /// Workbook bytes, base64-encoded.
    pub xlsx: Option<String>,
    /// Totals.
    pub summary: SummaryBody,
}

impl From<ReportOutcome> for GenerateBody {
    fn from(outcome: ReportOutcome) -> Self {
        let summary = outcome.summary();
        match outcome {
            ReportOutcome::Generated { artifacts, .. } => Self {
                success: true,
                xml: artifacts.xml,
                csv: artifacts.csv,
                xlsx: artifacts.xlsx.map(|bytes| STANDARD.encode(bytes)),
                summary: SummaryBody {
                    total_collections: summary.total_collections,
                    total_kg: summary.total_kg_formatted(),
                    message: None,
                },
            },
            ReportOutcome::Empty { period } => Self {
                success: true,
                xml: None,
                csv: None,
                xlsx: None,
                summary: SummaryBody {
                    total_collections: 0,
                    total_kg: summary.total_kg_formatted(),
                    message: Some(format!("No collections recorded for {period}")),
                },
            },
        }
    }
}

/// Entry of `GET /api/reports`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingBody {
    /// Calendar year.
    pub year: i32,
    /// Quarter number, 1-4.
    pub quarter: u8,
    /// When the stored payloads were generated.
    pub generated_at: DateTime<Utc>,
    /// Formats available for download.
    pub formats: Vec<ArtifactFormat>,
}

impl From<ReportListing> for ListingBody {
    fn from(listing: ReportListing) -> Self {
        Self {
            year: listing.key.year,
            quarter: listing.key.quarter.number(),
            generated_at: listing.generated_at,
            formats: listing.formats,
        }
    }
}
