use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Upstream venues the aggregator talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueId {
    /// exchangerate-api.com USD quotes.
    ExchangeRateApi,
    /// Foreign leg, USDT-quoted.
    Binance,
    /// Domestic leg, KRW-quoted.
    Upbit,
}

impl VenueId {
    pub const ALL: [Self; 3] = [Self::ExchangeRateApi, Self::Binance, Self::Upbit];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExchangeRateApi => "exchange_rate_api",
            Self::Binance => "binance",
            Self::Upbit => "upbit",
        }
    }
}

impl Display for VenueId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
