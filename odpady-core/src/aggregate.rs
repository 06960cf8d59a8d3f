//! Per-code accumulation of collection records for one reporting period.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::codes::{CodePair, LabelSource, WasteCodeTable};
use crate::model::{CollectionRecord, format_kg, round_kg};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Records that violate the data model.
pub enum AggregateError {
    /// A record carries a negative mass.
    #[error("Collection on {date} has negative mass {mass_kg} kg")]
    NegativeMass {
        /// Collection date of the offending record.
        date: NaiveDate,
        /// Offending mass.
        mass_kg: Decimal,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Accumulated mass for one waste/treatment code pair.
pub struct AggregateLine {
    /// Waste catalogue code.
    pub waste_code: String,
    /// Display label.
    pub label: String,
    /// Treatment code.
    pub treatment_code: String,
    /// Exact accumulated mass in kilograms.
    pub kilograms: Decimal,
}

impl AggregateLine {
    /// Mass rounded to two decimals, as every report format prints it.
    #[must_use]
    pub fn rounded_kg(&self) -> Decimal {
        round_kg(self.kilograms)
    }

    /// Mass formatted with two decimals and a `.` separator.
    #[must_use]
    pub fn formatted_kg(&self) -> String {
        format_kg(self.kilograms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Aggregation result, lines ordered by code pair.
pub struct Aggregate {
    lines: Vec<AggregateLine>,
    record_count: usize,
    total_kg: Decimal,
}

impl Aggregate {
    /// Non-zero lines ordered by waste code, then treatment code.
    #[must_use]
    pub fn lines(&self) -> &[AggregateLine] {
        &self.lines
    }

    /// Number of records consumed.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Exact sum of all consumed masses.
    #[must_use]
    pub fn total_kg(&self) -> Decimal {
        self.total_kg
    }

    /// Whether no records were consumed at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }
}

#[derive(Debug)]
struct Bucket {
    label: String,
    label_source: LabelSource,
    kilograms: Decimal,
}

/// Streaming accumulator; feed records with [`Aggregator::push`].
#[derive(Debug)]
pub struct Aggregator<'table> {
    table: &'table WasteCodeTable,
    buckets: BTreeMap<CodePair, Bucket>,
    record_count: usize,
    total_kg: Decimal,
}

impl<'table> Aggregator<'table> {
    /// Start an empty aggregation over the given code table.
    #[must_use]
    pub fn new(table: &'table WasteCodeTable) -> Self {
        Self {
            table,
            buckets: BTreeMap::new(),
            record_count: 0,
            total_kg: Decimal::ZERO,
        }
    }

    /// Add one record.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::NegativeMass`] for records with a negative mass.
    pub fn push(&mut self, record: &CollectionRecord) -> Result<(), AggregateError> {
        if record.mass_kg.is_sign_negative() && !record.mass_kg.is_zero() {
            return Err(AggregateError::NegativeMass {
                date: record.collected_on,
                mass_kg: record.mass_kg,
            });
        }

        let resolution = self.table.resolve_record(record);
        let bucket = self
            .buckets
            .entry(resolution.codes)
            .or_insert_with(|| Bucket {
                label: resolution.label.clone(),
                label_source: resolution.label_source,
                kilograms: Decimal::ZERO,
            });

        // Keep labels independent of record order.
        if (resolution.label_source, Reverse(&resolution.label))
            > (bucket.label_source, Reverse(&bucket.label))
        {
            bucket.label = resolution.label;
            bucket.label_source = resolution.label_source;
        }

        bucket.kilograms += record.mass_kg;
        self.record_count += 1;
        self.total_kg += record.mass_kg;
        Ok(())
    }

    /// Finish aggregation, dropping lines whose total is zero.
    #[must_use]
    pub fn finish(self) -> Aggregate {
        let lines = self
            .buckets
            .into_iter()
            .filter(|(_, bucket)| !bucket.kilograms.is_zero())
            .map(|(codes, bucket)| AggregateLine {
                waste_code: codes.waste_code,
                label: bucket.label,
                treatment_code: codes.treatment_code,
                kilograms: bucket.kilograms,
            })
            .collect();

        Aggregate {
            lines,
            record_count: self.record_count,
            total_kg: self.total_kg,
        }
    }
}

/// Aggregate a batch of records.
///
/// # Errors
///
/// Returns [`AggregateError`] if any record is invalid.
pub fn aggregate<'record, I>(
    table: &WasteCodeTable,
    records: I,
) -> Result<Aggregate, AggregateError>
where
    I: IntoIterator<Item = &'record CollectionRecord>,
{
    let mut aggregator = Aggregator::new(table);
    for record in records {
        aggregator.push(record)?;
    }
    Ok(aggregator.finish())
}
