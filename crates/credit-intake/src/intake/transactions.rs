//! Statistical features derived from an uploaded transaction table.

use super::domain::{FeatureSet, TXN_AVG, TXN_COUNT, TXN_STD, TXN_TOTAL};
use tracing::warn;

const AMOUNT_COLUMN: &str = "amount";

/// Aggregates over the surviving `amount` values of a transaction table.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransactionSummary {
    pub count: usize,
    pub total: f64,
    pub average: f64,
    pub std_dev: f64,
}

impl TransactionSummary {
    /// Population statistics; every field is zero when `amounts` is empty.
    pub fn from_amounts(amounts: &[f64]) -> Self {
        if amounts.is_empty() {
            return Self::default();
        }

        let count = amounts.len();
        let total: f64 = amounts.iter().sum();
        let average = total / count as f64;
        let variance = amounts
            .iter()
            .map(|amount| (amount - average).powi(2))
            .sum::<f64>()
            / count as f64;

        Self {
            count,
            total,
            average,
            std_dev: variance.sqrt(),
        }
    }

    pub fn into_features(self) -> FeatureSet {
        let mut features = FeatureSet::new();
        features.insert(TXN_COUNT, self.count as f64);
        features.insert(TXN_TOTAL, self.total);
        features.insert(TXN_AVG, self.average);
        features.insert(TXN_STD, self.std_dev);
        features
    }
}

/// Why a transaction upload could not be read as a table.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionDegraded {
    #[error("transaction file has no header row")]
    MissingHeader,
    #[error("transaction file is not a readable table: {0}")]
    Malformed(#[from] csv::Error),
}

/// Parses the table and summarizes its amounts.
///
/// Rows whose `amount` is missing or not a finite number are dropped. A table without an
/// `amount` column yields an all-zero summary.
pub fn summarize(raw: &[u8]) -> Result<TransactionSummary, ExtractionDegraded> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(raw);

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(ExtractionDegraded::MissingHeader);
    }
    let amount_index = headers.iter().position(|header| header == AMOUNT_COLUMN);

    let mut amounts = Vec::new();
    for record in reader.records() {
        let record = record?;
        let amount = amount_index
            .and_then(|index| record.get(index))
            .and_then(parse_amount);
        if let Some(amount) = amount {
            amounts.push(amount);
        }
    }

    Ok(TransactionSummary::from_amounts(&amounts))
}

/// Feature fragment for an upload; degraded input yields an empty fragment.
pub fn extract(raw: &[u8]) -> FeatureSet {
    match summarize(raw) {
        Ok(summary) => summary.into_features(),
        Err(err) => {
            warn!(error = %err, bytes = raw.len(), "transaction extraction degraded");
            FeatureSet::new()
        }
    }
}

fn parse_amount(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
}

#[cfg(test)]
pub(crate) fn parse_amount_for_tests(value: &str) -> Option<f64> {
    parse_amount(value)
}
