//! High-level service facade: generates, stores, and serves quarterly reports.

use std::sync::Arc;

use log::{error, info, warn};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::aggregate::{AggregateError, aggregate};
use crate::backend::Backend;
use crate::codes::WasteCodeTable;
use crate::document::ReportDocument;
use crate::model::{
    ArtifactFormat, Municipality, ReportArtifact, ReportKey, ReportListing, format_kg,
};
use crate::period::{Quarter, ReportPeriod, ValidationError, validate_year};
use crate::ports::{Clock, EncodeError, PortError, ReportEncoder, SystemClock};

#[derive(thiserror::Error, Debug)]
/// Errors surfaced to callers of [`ReportService`].
pub enum ServiceError {
    /// Request parameters were rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// No usable identity accompanied the request.
    #[error("Missing or invalid credentials")]
    Unauthenticated,
    /// The account is not linked to a municipality.
    #[error("No municipality is registered for this account")]
    MunicipalityNotFound,
    /// The requested stored report or format does not exist.
    #[error("Report not found")]
    ReportNotFound,
    /// Stored records violate the data model.
    #[error(transparent)]
    InvalidData(#[from] AggregateError),
    /// A backend read failed.
    #[error("Backend request failed: {0}")]
    Upstream(#[source] PortError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
/// Parameters of a generation request.
pub struct ReportRequest {
    /// Quarter number, 1-4.
    #[serde(default, alias = "kvartal")]
    pub quarter: Option<i64>,
    /// Calendar year.
    #[serde(default, alias = "rok")]
    pub year: Option<i64>,
}

impl ReportRequest {
    /// Request for the given quarter and year.
    #[must_use]
    pub fn new(quarter: i64, year: i64) -> Self {
        Self {
            quarter: Some(quarter),
            year: Some(year),
        }
    }

    /// Validate the parameters and compute the period.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for missing or out-of-range values.
    pub fn period(&self) -> Result<ReportPeriod, ValidationError> {
        let quarter = self.quarter.ok_or(ValidationError::MissingField("quarter"))?;
        let year = self.year.ok_or(ValidationError::MissingField("year"))?;
        ReportPeriod::new(year, quarter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Totals returned with every generation.
pub struct ReportSummary {
    /// Number of collection records in the period.
    pub total_collections: usize,
    /// Exact total mass in kilograms.
    pub total_kg: Decimal,
}

impl ReportSummary {
    /// Total mass with two decimals.
    #[must_use]
    pub fn total_kg_formatted(&self) -> String {
        format_kg(self.total_kg)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Payloads produced by one generation; a failed encoder leaves its slot empty.
pub struct GeneratedArtifacts {
    /// Delimited-text payload.
    pub csv: Option<String>,
    /// ISOH XML payload.
    pub xml: Option<String>,
    /// Workbook payload.
    pub xlsx: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of a generation request.
pub enum ReportOutcome {
    /// Records existed and the artifacts were produced.
    Generated {
        /// Reported period.
        period: ReportPeriod,
        /// Produced payloads.
        artifacts: GeneratedArtifacts,
        /// Totals.
        summary: ReportSummary,
        /// Whether the artifacts were persisted for later download.
        saved: bool,
    },
    /// No collections were recorded in the period.
    Empty {
        /// Reported period.
        period: ReportPeriod,
    },
}

impl ReportOutcome {
    /// Totals for the response, zero for empty periods.
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        match self {
            Self::Generated { summary, .. } => *summary,
            Self::Empty { .. } => ReportSummary {
                total_collections: 0,
                total_kg: Decimal::ZERO,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One stored artifact ready to be served.
pub struct StoredDownload {
    /// Suggested file name.
    pub file_name: String,
    /// Payload format.
    pub format: ArtifactFormat,
    /// Payload bytes.
    pub bytes: Vec<u8>,
}

/// Public entry point for report generation and retrieval.
pub struct ReportService {
    backend: Backend,
    codes: Arc<WasteCodeTable>,
    encoders: Vec<Arc<dyn ReportEncoder>>,
    clock: Arc<dyn Clock>,
}

impl ReportService {
    /// Create a service bound to a backend, code table, and encoder set.
    #[must_use]
    pub fn new(
        backend: Backend,
        codes: Arc<WasteCodeTable>,
        encoders: Vec<Arc<dyn ReportEncoder>>,
    ) -> Self {
        Self {
            backend,
            codes,
            encoders,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for generation timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Generate, store, and return the report for one quarter.
    ///
    /// Storage failures are logged and reported through
    /// [`ReportOutcome::Generated::saved`]; they do not fail the request.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] for missing credentials, invalid parameters,
    /// unknown municipalities, invalid records, or failed backend reads.
    pub async fn generate(
        &self,
        token: Option<&str>,
        request: &ReportRequest,
    ) -> Result<ReportOutcome, ServiceError> {
        let token = bearer(token)?;
        let period = request.period()?;
        let municipality = self.caller_municipality(token).await?;

        let mut records = self
            .backend
            .collections
            .collections(municipality.id, period.range)
            .await
            .map_err(ServiceError::Upstream)?;

        // Scope to the caller even if the store over-fetches.
        let fetched = records.len();
        records.retain(|record| {
            record.municipality == municipality.id && period.range.contains(record.collected_on)
        });
        if records.len() != fetched {
            warn!(
                "Dropped {} collections outside municipality {} / {period}",
                fetched - records.len(),
                municipality.id
            );
        }

        if records.is_empty() {
            info!(
                "No collections for municipality {} in {period}",
                municipality.id
            );
            return Ok(ReportOutcome::Empty { period });
        }

        let aggregate = aggregate(&self.codes, &records)?;
        let generated_at = self.clock.now();
        let document = ReportDocument {
            municipality: &municipality,
            period: &period,
            generated_at,
            aggregate: &aggregate,
        };
        let artifacts = self.encode_all(&document);

        let stored = ReportArtifact {
            key: ReportKey {
                municipality: municipality.id,
                year: period.year,
                quarter: period.quarter,
            },
            csv: artifacts.csv,
            xml: artifacts.xml,
            xlsx: artifacts.xlsx,
            generated_at,
        };

        let saved = match self.backend.reports.upsert_report(&stored).await {
            Ok(outcome) => {
                info!(
                    "Stored report for municipality {} / {period}: {outcome:?}",
                    municipality.id
                );
                true
            }
            Err(err) => {
                error!(
                    "Failed to store report for municipality {} / {period}: {err}",
                    municipality.id
                );
                false
            }
        };

        Ok(ReportOutcome::Generated {
            period,
            artifacts: GeneratedArtifacts {
                csv: stored.csv,
                xml: stored.xml,
                xlsx: stored.xlsx,
            },
            summary: ReportSummary {
                total_collections: aggregate.record_count(),
                total_kg: aggregate.total_kg(),
            },
            saved,
        })
    }

    /// Stored reports of the caller's municipality.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] for missing credentials, unknown
    /// municipalities, or failed backend reads.
    pub async fn list_reports(&self, token: Option<&str>) -> Result<Vec<ReportListing>, ServiceError> {
        let municipality = self.caller_municipality(bearer(token)?).await?;
        self.backend
            .reports
            .list_reports(municipality.id)
            .await
            .map_err(ServiceError::Upstream)
    }

    /// Load one stored artifact for re-download without regenerating it.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ReportNotFound`] when the report or format was
    /// never stored, and other [`ServiceError`]s as for [`Self::list_reports`].
    pub async fn stored_artifact(
        &self,
        token: Option<&str>,
        year: i64,
        quarter: i64,
        format: ArtifactFormat,
    ) -> Result<StoredDownload, ServiceError> {
        let token = bearer(token)?;
        let quarter = Quarter::new(quarter)?;
        let year = validate_year(year)?;
        let municipality = self.caller_municipality(token).await?;

        let key = ReportKey {
            municipality: municipality.id,
            year,
            quarter,
        };
        let artifact = self
            .backend
            .reports
            .find_report(&key)
            .await
            .map_err(ServiceError::Upstream)?
            .ok_or(ServiceError::ReportNotFound)?;
        let bytes = artifact
            .payload(format)
            .ok_or(ServiceError::ReportNotFound)?
            .to_vec();

        Ok(StoredDownload {
            file_name: key.file_name(format),
            format,
            bytes,
        })
    }

    async fn caller_municipality(&self, token: &str) -> Result<Municipality, ServiceError> {
        let user = self
            .backend
            .identity
            .authenticate(token)
            .await
            .map_err(|err| match err {
                PortError::Unauthorized => ServiceError::Unauthenticated,
                other => ServiceError::Upstream(other),
            })?;

        self.backend
            .municipalities
            .municipality_for_user(&user)
            .await
            .map_err(ServiceError::Upstream)?
            .ok_or(ServiceError::MunicipalityNotFound)
    }

    fn encode_all(&self, document: &ReportDocument<'_>) -> GeneratedArtifacts {
        let mut artifacts = GeneratedArtifacts::default();

        for encoder in &self.encoders {
            let format = encoder.format();
            let encoded = encoder.encode(document).and_then(|bytes| match format {
                ArtifactFormat::Xlsx => {
                    artifacts.xlsx = Some(bytes);
                    Ok(())
                }
                ArtifactFormat::Csv | ArtifactFormat::Xml => {
                    let text = String::from_utf8(bytes)
                        .ok()
                        .ok_or(EncodeError::InvalidUtf8(format))?;
                    if format == ArtifactFormat::Csv {
                        artifacts.csv = Some(text);
                    } else {
                        artifacts.xml = Some(text);
                    }
                    Ok(())
                }
            });

            if let Err(err) = encoded {
                error!("Encoding {format} report for {} failed: {err}", document.period);
            }
        }

        artifacts
    }
}

fn bearer(token: Option<&str>) -> Result<&str, ServiceError> {
    token
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ServiceError::Unauthenticated)
}
