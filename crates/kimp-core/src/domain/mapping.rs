use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Symbol, ValidationError};

/// Pairs compared by default: Binance USDT pairs against Upbit KRW markets.
pub const DEFAULT_PAIRS: [(&str, &str, &str); 10] = [
    ("BTCUSDT", "KRW-BTC", "BTC"),
    ("ETHUSDT", "KRW-ETH", "ETH"),
    ("XRPUSDT", "KRW-XRP", "XRP"),
    ("ADAUSDT", "KRW-ADA", "ADA"),
    ("SOLUSDT", "KRW-SOL", "SOL"),
    ("AVAXUSDT", "KRW-AVAX", "AVAX"),
    ("MATICUSDT", "KRW-MATIC", "MATIC"),
    ("LINKUSDT", "KRW-LINK", "LINK"),
    ("DOTUSDT", "KRW-DOT", "DOT"),
    ("ATOMUSDT", "KRW-ATOM", "ATOM"),
];

/// One asset as listed on both venues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairMapping {
    pub foreign_symbol: Symbol,
    pub domestic_code: Symbol,
    pub display_name: Symbol,
}

impl PairMapping {
    pub fn new(
        foreign_symbol: &str,
        domestic_code: &str,
        display_name: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            foreign_symbol: Symbol::parse(foreign_symbol)?,
            domestic_code: Symbol::parse(domestic_code)?,
            display_name: Symbol::parse(display_name)?,
        })
    }
}

/// Immutable universe of assets the calculator is willing to compare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolMapping {
    pairs: Vec<PairMapping>,
}

impl SymbolMapping {
    pub fn new(pairs: Vec<PairMapping>) -> Result<Self, ValidationError> {
        if pairs.is_empty() {
            return Err(ValidationError::EmptyMapping);
        }

        let mut foreign = HashSet::new();
        let mut domestic = HashSet::new();
        let mut names = HashSet::new();
        for pair in &pairs {
            if !foreign.insert(pair.foreign_symbol.as_str()) {
                return Err(duplicate("foreign_symbol", &pair.foreign_symbol));
            }
            if !domestic.insert(pair.domestic_code.as_str()) {
                return Err(duplicate("domestic_code", &pair.domestic_code));
            }
            if !names.insert(pair.display_name.as_str()) {
                return Err(duplicate("display_name", &pair.display_name));
            }
        }

        Ok(Self { pairs })
    }

    pub fn from_triples<'a>(
        triples: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>,
    ) -> Result<Self, ValidationError> {
        let pairs = triples
            .into_iter()
            .map(|(foreign, domestic, name)| PairMapping::new(foreign, domestic, name))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(pairs)
    }

    pub fn pairs(&self) -> &[PairMapping] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Default for SymbolMapping {
    fn default() -> Self {
        Self::from_triples(DEFAULT_PAIRS).expect("default pair table is valid")
    }
}

fn duplicate(field: &'static str, value: &Symbol) -> ValidationError {
    ValidationError::DuplicateMapping {
        field,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_has_ten_pairs() {
        let mapping = SymbolMapping::default();
        assert_eq!(mapping.len(), 10);
        assert_eq!(mapping.pairs()[0].display_name.as_str(), "BTC");
        assert_eq!(mapping.pairs()[0].domestic_code.as_str(), "KRW-BTC");
    }

    #[test]
    fn rejects_duplicate_domestic_codes() {
        let err = SymbolMapping::from_triples([
            ("BTCUSDT", "KRW-BTC", "BTC"),
            ("BTCUSDC", "KRW-BTC", "BTC2"),
        ])
        .expect_err("duplicate code must fail");
        assert_eq!(
            err,
            ValidationError::DuplicateMapping {
                field: "domestic_code",
                value: String::from("KRW-BTC"),
            }
        );
    }

    #[test]
    fn display_names_are_unique_regardless_of_case() {
        let err = SymbolMapping::from_triples([
            ("ETHUSDT", "KRW-ETH", "eth"),
            ("ETHUSDC", "KRW-ETH2", "ETH"),
        ])
        .expect_err("names collide after normalization");
        assert!(matches!(err, ValidationError::DuplicateMapping { field: "display_name", .. }));
    }

    #[test]
    fn rejects_empty_table() {
        let err = SymbolMapping::new(Vec::new()).expect_err("empty must fail");
        assert_eq!(err, ValidationError::EmptyMapping);
    }
}
