//! Lookup table mapping waste-type tags to regulatory waste and treatment codes.

use std::collections::HashMap;

use crate::model::{CollectionRecord, WasteType};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Regulatory classification of a collection.
pub struct CodePair {
    /// Waste catalogue code, e.g. `20 01 39`.
    pub waste_code: String,
    /// Treatment (recovery/disposal) code, e.g. `R03`.
    pub treatment_code: String,
}

impl CodePair {
    /// Construct a code pair.
    #[must_use]
    pub fn new<W: Into<String>, T: Into<String>>(waste_code: W, treatment_code: T) -> Self {
        Self {
            waste_code: waste_code.into(),
            treatment_code: treatment_code.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Canonical codes and display label for one waste-type tag.
pub struct WasteCodeEntry {
    /// Codes reported to the government system.
    pub codes: CodePair,
    /// Human-readable label.
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
/// Where a resolved label came from. Table labels outrank raw tags.
pub enum LabelSource {
    /// The raw tag entered on the record.
    RawTag,
    /// The mapping table.
    Table,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of resolving one record.
pub struct Resolution {
    /// Codes the record is reported under.
    pub codes: CodePair,
    /// Display label for the bucket.
    pub label: String,
    /// Origin of [`Resolution::label`].
    pub label_source: LabelSource,
}

/// Immutable mapping from waste-type tag to canonical codes.
///
/// Built once and shared; tests inject alternative tables.
#[derive(Debug, Clone)]
pub struct WasteCodeTable {
    entries: HashMap<String, WasteCodeEntry>,
    fallback: CodePair,
}

impl WasteCodeTable {
    /// Build a table from `(tag, entry)` pairs. Tags are matched case-insensitively.
    #[must_use]
    pub fn new<I>(entries: I, fallback: CodePair) -> Self
    where
        I: IntoIterator<Item = (String, WasteCodeEntry)>,
    {
        let entries = entries
            .into_iter()
            .map(|(tag, entry)| (tag.trim().to_lowercase(), entry))
            .collect();
        Self { entries, fallback }
    }

    /// Table used by Slovak municipalities reporting to ISOH.
    #[must_use]
    pub fn slovak_defaults() -> Self {
        let entry = |tag: WasteType, waste_code: &str, treatment_code: &str, label: &str| {
            (
                tag.tag().to_owned(),
                WasteCodeEntry {
                    codes: CodePair::new(waste_code, treatment_code),
                    label: label.to_owned(),
                },
            )
        };

        Self::new(
            [
                entry(WasteType::Mixed, "20 03 01", "D01", "Zmesový komunálny odpad"),
                entry(WasteType::Plastic, "20 01 39", "R03", "Plasty"),
                entry(WasteType::Paper, "20 01 01", "R03", "Papier a lepenka"),
                entry(WasteType::Glass, "20 01 02", "R03", "Sklo"),
            ],
            CodePair::new("20 03 01", "D01"),
        )
    }

    /// Look up the entry for a tag.
    #[must_use]
    pub fn entry(&self, waste_type: &WasteType) -> Option<&WasteCodeEntry> {
        self.entries.get(&waste_type.tag().to_lowercase())
    }

    /// Codes used for unknown tags without explicit codes.
    #[must_use]
    pub fn fallback(&self) -> &CodePair {
        &self.fallback
    }

    /// Resolve the codes a collection is reported under.
    ///
    /// Explicit codes win when both are non-empty. Otherwise the table entry
    /// is used, and unknown tags fall back to mixed municipal waste.
    #[must_use]
    pub fn resolve(
        &self,
        waste_type: &WasteType,
        waste_code: Option<&str>,
        treatment_code: Option<&str>,
    ) -> Resolution {
        let entry = self.entry(waste_type);
        let (label, label_source) = match entry {
            Some(found) => (found.label.clone(), LabelSource::Table),
            None => (waste_type.tag().to_owned(), LabelSource::RawTag),
        };

        let explicit = waste_code
            .filter(|code| !code.trim().is_empty())
            .zip(treatment_code.filter(|code| !code.trim().is_empty()));

        let codes = match (explicit, entry) {
            (Some((waste, treatment)), _) => CodePair::new(waste, treatment),
            (None, Some(found)) => found.codes.clone(),
            (None, None) => self.fallback.clone(),
        };

        Resolution {
            codes,
            label,
            label_source,
        }
    }

    /// Resolve a stored record.
    #[must_use]
    pub fn resolve_record(&self, record: &CollectionRecord) -> Resolution {
        self.resolve(
            &record.waste_type,
            record.waste_code.as_deref(),
            record.treatment_code.as_deref(),
        )
    }
}

impl Default for WasteCodeTable {
    fn default() -> Self {
        Self::slovak_defaults()
    }
}
