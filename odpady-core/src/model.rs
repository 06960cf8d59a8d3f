//! Domain data structures for municipalities, waste collections, and stored reports.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::period::Quarter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// Identifier for a municipality ("obec") known to the data store.
pub struct MunicipalityId(pub i64);

impl fmt::Display for MunicipalityId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier of an authenticated account as issued by the identity provider.
pub struct UserId(pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Postal address of the municipal office.
pub struct PostalAddress {
    /// Street and building number.
    pub street: Option<String>,
    /// Town or village.
    pub city: Option<String>,
    /// Postal code ("PSČ").
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Municipality metadata printed on every report.
pub struct Municipality {
    /// Unique identifier.
    pub id: MunicipalityId,
    /// Official name.
    pub name: String,
    /// Organisation tax identifier ("IČO").
    pub ico: Option<String>,
    /// Office address.
    pub address: PostalAddress,
}

/// Waste-type tags used when a collection is entered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WasteType {
    /// Mixed municipal waste (`zmesovy`).
    Mixed,
    /// Plastics (`plast`).
    Plastic,
    /// Paper and cardboard (`papier`).
    Paper,
    /// Glass (`sklo`).
    Glass,
    /// Any tag outside the built-in vocabulary, kept as entered (trimmed).
    Other(String),
}

impl WasteType {
    /// Parse a raw tag; matching is case-insensitive and ignores surrounding whitespace.
    #[must_use]
    pub fn from_tag(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_lowercase().as_str() {
            "zmesovy" => Self::Mixed,
            "plast" => Self::Plastic,
            "papier" => Self::Paper,
            "sklo" => Self::Glass,
            _ => Self::Other(trimmed.to_owned()),
        }
    }

    /// Canonical tag as stored in the database.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::Mixed => "zmesovy",
            Self::Plastic => "plast",
            Self::Paper => "papier",
            Self::Glass => "sklo",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for WasteType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.tag())
    }
}

impl From<String> for WasteType {
    fn from(raw: String) -> Self {
        Self::from_tag(&raw)
    }
}

impl From<WasteType> for String {
    fn from(waste_type: WasteType) -> Self {
        waste_type.tag().to_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One recorded waste collection.
pub struct CollectionRecord {
    /// Municipality that owns the record.
    pub municipality: MunicipalityId,
    /// Day the waste was collected.
    pub collected_on: NaiveDate,
    /// Waste-type tag entered by the operator.
    pub waste_type: WasteType,
    /// Collected mass in kilograms.
    pub mass_kg: Decimal,
    /// Regulatory waste code entered on the record, if any.
    pub waste_code: Option<String>,
    /// Regulatory treatment code entered on the record, if any.
    pub treatment_code: Option<String>,
}

impl CollectionRecord {
    /// Construct a record without explicit regulatory codes.
    #[must_use]
    pub fn new(
        municipality: MunicipalityId,
        collected_on: NaiveDate,
        waste_type: WasteType,
        mass_kg: Decimal,
    ) -> Self {
        Self {
            municipality,
            collected_on,
            waste_type,
            mass_kg,
            waste_code: None,
            treatment_code: None,
        }
    }

    /// Attach explicit waste and treatment codes.
    #[must_use]
    pub fn with_codes<W: Into<String>, T: Into<String>>(
        mut self,
        waste_code: W,
        treatment_code: T,
    ) -> Self {
        self.waste_code = Some(waste_code.into());
        self.treatment_code = Some(treatment_code.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Inclusive start/end range of calendar dates.
pub struct DateRange {
    /// Start date (inclusive).
    pub start: NaiveDate,
    /// End date (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Whether `date` falls inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Round a kilogram amount to the two decimals used in every report format.
#[must_use]
pub fn round_kg(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Format a kilogram amount with exactly two decimals and a `.` separator.
#[must_use]
pub fn format_kg(value: Decimal) -> String {
    round_kg(value).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Output encodings produced for every report.
pub enum ArtifactFormat {
    /// Semicolon-delimited text.
    Csv,
    /// ISOH government XML dialect.
    Xml,
    /// Office Open XML workbook.
    Xlsx,
}

impl ArtifactFormat {
    /// All formats in presentation order.
    pub const ALL: [Self; 3] = [Self::Csv, Self::Xml, Self::Xlsx];

    /// File extension without the leading dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xml => "xml",
            Self::Xlsx => "xlsx",
        }
    }

    /// MIME type used when serving the artifact.
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Xml => "application/xml; charset=utf-8",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.extension())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown report format: {0}")]
/// Returned when parsing an unsupported format name.
pub struct UnknownFormat(pub String);

impl FromStr for ArtifactFormat {
    type Err = UnknownFormat;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xml" => Ok(Self::Xml),
            "xlsx" => Ok(Self::Xlsx),
            _ => Err(UnknownFormat(raw.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Unique key of a stored report: one row per municipality and quarter.
pub struct ReportKey {
    /// Owning municipality.
    pub municipality: MunicipalityId,
    /// Calendar year.
    pub year: i32,
    /// Quarter of the year.
    pub quarter: Quarter,
}

impl ReportKey {
    /// Download file name used by the dashboard, e.g. `report_Q1_2024.csv`.
    #[must_use]
    pub fn file_name(&self, format: ArtifactFormat) -> String {
        format!(
            "report_Q{}_{}.{}",
            self.quarter.number(),
            self.year,
            format.extension()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Persisted result of one report generation.
pub struct ReportArtifact {
    /// Unique key.
    pub key: ReportKey,
    /// Delimited-text payload.
    pub csv: Option<String>,
    /// ISOH XML payload.
    pub xml: Option<String>,
    /// Workbook payload.
    pub xlsx: Option<Vec<u8>>,
    /// When the payloads were generated.
    pub generated_at: DateTime<Utc>,
}

impl ReportArtifact {
    /// Formats whose payload is present.
    #[must_use]
    pub fn available_formats(&self) -> Vec<ArtifactFormat> {
        ArtifactFormat::ALL
            .into_iter()
            .filter(|format| self.payload(*format).is_some())
            .collect()
    }

    /// Raw bytes of one payload.
    #[must_use]
    pub fn payload(&self, format: ArtifactFormat) -> Option<&[u8]> {
        match format {
            ArtifactFormat::Csv => self.csv.as_deref().map(str::as_bytes),
            ArtifactFormat::Xml => self.xml.as_deref().map(str::as_bytes),
            ArtifactFormat::Xlsx => self.xlsx.as_deref(),
        }
    }

    /// Summary without payloads, used for listings.
    #[must_use]
    pub fn listing(&self) -> ReportListing {
        ReportListing {
            key: self.key,
            generated_at: self.generated_at,
            formats: self.available_formats(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Stored report metadata without the payloads.
pub struct ReportListing {
    /// Unique key.
    pub key: ReportKey,
    /// When the payloads were generated.
    pub generated_at: DateTime<Utc>,
    /// Formats available for download.
    pub formats: Vec<ArtifactFormat>,
}
