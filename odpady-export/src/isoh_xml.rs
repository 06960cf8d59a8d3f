//! Quarterly report in the XML dialect accepted by ISOH.
//!
//! Element names and nesting are an external contract; do not rename them.

use std::fmt::{self, Write as _};

use odpady_core::{ArtifactFormat, EncodeError, ReportDocument};

use crate::markup::escape;
use crate::write_error;

/// Namespace of the root element.
pub const NAMESPACE: &str = "urn:sk:minzp:isoh:hlasenie:1.0";
/// Document type code written into the identification block.
pub const DOCUMENT_TYPE: &str = "KVARTALNE_HLASENIE";

/// Render the report as an ISOH XML document.
///
/// # Errors
///
/// Returns an [`EncodeError`] if formatting the document fails.
pub fn encode_xml(document: &ReportDocument<'_>) -> Result<String, EncodeError> {
    render(document).map_err(|err| write_error(ArtifactFormat::Xml, err))
}

fn render(document: &ReportDocument<'_>) -> Result<String, fmt::Error> {
    let municipality = document.municipality;
    let address = &municipality.address;
    let text = |value: &Option<String>| escape(value.as_deref().unwrap_or_default()).into_owned();

    let mut xml = String::with_capacity(1024);
    writeln!(xml, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(xml, r#"<isoh_hlasenie xmlns="{NAMESPACE}">"#)?;

    writeln!(xml, "  <identifikacia>")?;
    writeln!(xml, "    <typ_dokumentu>{DOCUMENT_TYPE}</typ_dokumentu>")?;
    writeln!(xml, "    <rok>{}</rok>", document.period.year)?;
    writeln!(xml, "    <kvartal>{}</kvartal>", document.period.quarter.number())?;
    writeln!(
        xml,
        "    <datum_vytvorenia>{}</datum_vytvorenia>",
        document.generated_at.date_naive()
    )?;
    writeln!(xml, "  </identifikacia>")?;

    writeln!(xml, "  <organizacia>")?;
    writeln!(xml, "    <ico>{}</ico>", text(&municipality.ico))?;
    writeln!(xml, "    <nazov>{}</nazov>", escape(&municipality.name))?;
    writeln!(xml, "    <adresa>")?;
    writeln!(xml, "      <ulica>{}</ulica>", text(&address.street))?;
    writeln!(xml, "      <obec>{}</obec>", text(&address.city))?;
    writeln!(xml, "      <psc>{}</psc>", text(&address.postal_code))?;
    writeln!(xml, "    </adresa>")?;
    writeln!(xml, "  </organizacia>")?;

    writeln!(xml, "  <zaznamy>")?;
    for line in document.aggregate.lines() {
        writeln!(xml, "    <zaznam>")?;
        writeln!(
            xml,
            "      <kod_odpadu>{}</kod_odpadu>",
            escape(&line.waste_code)
        )?;
        writeln!(
            xml,
            "      <kod_nakladania>{}</kod_nakladania>",
            escape(&line.treatment_code)
        )?;
        writeln!(
            xml,
            "      <mnozstvo_kg>{}</mnozstvo_kg>",
            line.formatted_kg()
        )?;
        writeln!(xml, "    </zaznam>")?;
    }
    writeln!(xml, "  </zaznamy>")?;
    writeln!(xml, "</isoh_hlasenie>")?;

    Ok(xml)
}
