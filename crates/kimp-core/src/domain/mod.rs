//! # Domain Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated, upper-case market identifier |
//! | [`SymbolMapping`] | Immutable (foreign, domestic, display) pair table |
//! | [`PricePoint`] | Last price and 24h change from one venue |
//! | [`ExchangeRate`] | USD rate, flagged when the fallback constant was used |
//! | [`PremiumRecord`] | Derived premium for one asset |
//! | [`ResultSet`] | Sorted records plus the rate and upstream failures of a cycle |
//! | [`UtcDateTime`] | UTC timestamp |

mod mapping;
mod models;
mod symbol;
mod timestamp;

pub use mapping::{PairMapping, SymbolMapping, DEFAULT_PAIRS};
pub use models::{
    premium_pct, round_to_cents, ExchangeRate, PremiumRecord, PricePoint, ResultSet,
};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
