//! Delimited-text encoding tuned for spreadsheet tools in Slovak locales.
//!
//! Fields are separated by `;`, decimals use a comma, and the payload starts
//! with a UTF-8 byte-order mark so the encoding is detected on import.

use csv::{Terminator, WriterBuilder};
use odpady_core::{ArtifactFormat, EncodeError, ReportDocument};

use crate::{COLUMN_HEADERS, write_error};

/// UTF-8 byte-order mark prefixed to every payload.
pub const BYTE_ORDER_MARK: &str = "\u{feff}";

/// Render the aggregate as semicolon-delimited text.
///
/// # Errors
///
/// Returns an [`EncodeError`] if the CSV writer fails.
pub fn encode_csv(document: &ReportDocument<'_>) -> Result<String, EncodeError> {
    let fail = |err: csv::Error| write_error(ArtifactFormat::Csv, err);

    let mut writer = WriterBuilder::new()
        .delimiter(b';')
        .terminator(Terminator::CRLF)
        .from_writer(BYTE_ORDER_MARK.as_bytes().to_vec());

    writer.write_record(COLUMN_HEADERS).map_err(fail)?;
    for line in document.aggregate.lines() {
        let amount = line.formatted_kg().replace('.', ",");
        writer
            .write_record([
                line.waste_code.as_str(),
                line.label.as_str(),
                line.treatment_code.as_str(),
                amount.as_str(),
            ])
            .map_err(fail)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| write_error(ArtifactFormat::Csv, err.error()))?;
    String::from_utf8(bytes)
        .ok()
        .ok_or(EncodeError::InvalidUtf8(ArtifactFormat::Csv))
}
