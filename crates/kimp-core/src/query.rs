//! Read-side selections over a [`ResultSet`].
//!
//! Every selection checks for an empty result first: an empty cycle is a
//! "no data" error, while an empty selection over a non-empty cycle is not.

use thiserror::Error;

use crate::{PremiumRecord, ResultSet, Symbol};

pub const TOP_N_MIN: usize = 1;
pub const TOP_N_MAX: usize = 50;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("symbol '{symbol}' not found")]
    NotFound {
        symbol: String,
        available: Vec<String>,
    },
    #[error("{message}")]
    InvalidArgument { message: String },
    #[error("no premium data available")]
    NoData,
}

impl QueryError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::NoData => "no_data",
        }
    }
}

fn top_n_out_of_range() -> QueryError {
    QueryError::InvalidArgument {
        message: format!("n must be an integer between {TOP_N_MIN} and {TOP_N_MAX}"),
    }
}

/// Parses a raw path segment as a top-N count.
pub fn parse_top_n(raw: &str) -> Result<usize, QueryError> {
    let n = raw.trim().parse::<usize>().map_err(|_| top_n_out_of_range())?;
    validate_top_n(n)?;
    Ok(n)
}

pub fn validate_top_n(n: usize) -> Result<(), QueryError> {
    if !(TOP_N_MIN..=TOP_N_MAX).contains(&n) {
        return Err(top_n_out_of_range());
    }
    Ok(())
}

pub fn require_data(result: &ResultSet) -> Result<&[PremiumRecord], QueryError> {
    if result.is_empty() {
        return Err(QueryError::NoData);
    }
    Ok(&result.records)
}

/// Case-insensitive lookup by display name.
pub fn find_by_symbol<'a>(
    result: &'a ResultSet,
    symbol: &str,
) -> Result<&'a PremiumRecord, QueryError> {
    let records = require_data(result)?;
    records
        .iter()
        .find(|record| record.display_name.matches(symbol))
        .ok_or_else(|| QueryError::NotFound {
            symbol: symbol.trim().to_ascii_uppercase(),
            available: records
                .iter()
                .map(|record| record.display_name.to_string())
                .collect(),
        })
}

/// First `n` records in result order. `n` is validated before the data check.
pub fn top_n(result: &ResultSet, n: usize) -> Result<&[PremiumRecord], QueryError> {
    validate_top_n(n)?;
    let records = require_data(result)?;
    Ok(&records[..n.min(records.len())])
}

/// Records trading below the foreign price, in result order.
pub fn negative(result: &ResultSet) -> Result<Vec<&PremiumRecord>, QueryError> {
    let records = require_data(result)?;
    Ok(records
        .iter()
        .filter(|record| record.premium_pct < 0.0)
        .collect())
}

pub fn symbols(result: &ResultSet) -> Result<Vec<&Symbol>, QueryError> {
    let records = require_data(result)?;
    Ok(records.iter().map(|record| &record.display_name).collect())
}
