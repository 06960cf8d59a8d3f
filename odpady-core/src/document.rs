//! Input shared by every report encoder.

use chrono::{DateTime, Utc};

use crate::aggregate::Aggregate;
use crate::model::Municipality;
use crate::period::ReportPeriod;

/// Everything an encoder needs to render one quarterly report.
#[derive(Debug, Clone, Copy)]
pub struct ReportDocument<'doc> {
    /// Reporting municipality.
    pub municipality: &'doc Municipality,
    /// Reported quarter.
    pub period: &'doc ReportPeriod,
    /// Generation timestamp.
    pub generated_at: DateTime<Utc>,
    /// Aggregated lines.
    pub aggregate: &'doc Aggregate,
}

impl ReportDocument<'_> {
    /// Sheet or caption title, e.g. `Q1 2024`.
    #[must_use]
    pub fn title(&self) -> String {
        self.period.to_string()
    }
}
