//! Report encoders for odpady: delimited text, ISOH XML, and XLSX workbooks.
//!
//! Each format is a pure function over a [`ReportDocument`]; the encoder
//! structs wrap them as [`ReportEncoder`] ports for the report service.

use std::fmt;
use std::sync::Arc;

use odpady_core::{ArtifactFormat, EncodeError, ReportDocument, ReportEncoder};

/// Semicolon-delimited text with a byte-order mark.
pub mod delimited;
/// Government XML dialect accepted by ISOH.
pub mod isoh_xml;
/// Office Open XML spreadsheet package.
pub mod workbook;

mod markup;

pub use delimited::encode_csv;
pub use isoh_xml::encode_xml;
pub use workbook::encode_xlsx;

/// Column headers shared by the tabular formats.
pub const COLUMN_HEADERS: [&str; 4] = [
    "Kód odpadu",
    "Názov odpadu",
    "Kód nakladania",
    "Množstvo (kg)",
];

fn write_error(format: ArtifactFormat, err: impl fmt::Display) -> EncodeError {
    EncodeError::Write {
        format,
        message: err.to_string(),
    }
}

/// Encoder producing [`ArtifactFormat::Csv`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvEncoder;

impl ReportEncoder for CsvEncoder {
    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::Csv
    }

    fn encode(&self, document: &ReportDocument<'_>) -> Result<Vec<u8>, EncodeError> {
        encode_csv(document).map(String::into_bytes)
    }
}

/// Encoder producing [`ArtifactFormat::Xml`].
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlEncoder;

impl ReportEncoder for XmlEncoder {
    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::Xml
    }

    fn encode(&self, document: &ReportDocument<'_>) -> Result<Vec<u8>, EncodeError> {
        encode_xml(document).map(String::into_bytes)
    }
}

/// Encoder producing [`ArtifactFormat::Xlsx`].
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxEncoder;

impl ReportEncoder for XlsxEncoder {
    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::Xlsx
    }

    fn encode(&self, document: &ReportDocument<'_>) -> Result<Vec<u8>, EncodeError> {
        encode_xlsx(document)
    }
}

/// All three encoders, ready to hand to the report service.
#[must_use]
pub fn encoders() -> Vec<Arc<dyn ReportEncoder>> {
    vec![
        Arc::new(CsvEncoder),
        Arc::new(XmlEncoder),
        Arc::new(XlsxEncoder),
    ]
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, NaiveDate, TimeZone as _, Utc};
    use odpady_core::{
        Aggregate, CollectionRecord, Municipality, MunicipalityId, PostalAddress, ReportPeriod,
        WasteCodeTable, WasteType, aggregate,
    };

    pub(crate) fn municipality() -> Municipality {
        Municipality {
            id: MunicipalityId(1),
            name: "Obec Horná & Dolná Ves".to_owned(),
            ico: Some("00312345".to_owned()),
            address: PostalAddress {
                street: Some("Hlavná 1".to_owned()),
                city: Some("Dolná Ves".to_owned()),
                postal_code: Some("900 01".to_owned()),
            },
        }
    }

    pub(crate) fn period() -> ReportPeriod {
        ReportPeriod::new(2024, 1).expect("valid period")
    }

    pub(crate) fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, 9, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    fn record(tag: &str, month: u32, day: u32, mass: &str) -> CollectionRecord {
        CollectionRecord::new(
            MunicipalityId(1),
            NaiveDate::from_ymd_opt(2024, month, day).expect("valid date"),
            WasteType::from_tag(tag),
            mass.parse().expect("valid decimal"),
        )
    }

    pub(crate) fn aggregate_lines() -> Aggregate {
        let records = [
            record("plast", 2, 1, "3.5"),
            record("papier", 2, 15, "1.25"),
            record("plast", 3, 1, "0.75"),
            record("kov; <šrot>", 3, 2, "0.125"),
        ];
        aggregate(&WasteCodeTable::slovak_defaults(), &records).expect("valid records")
    }
}
