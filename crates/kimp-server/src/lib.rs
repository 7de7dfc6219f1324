//! HTTP surface for the kimp premium aggregator.
//!
//! | Route | Description |
//! |-------|-------------|
//! | `GET /` | Service info and endpoint directory |
//! | `GET /health` | Upstream circuit states |
//! | `GET /kimp` | All premiums, highest first, with upstream warnings |
//! | `GET /kimp/{symbol}` | One asset, case-insensitive |
//! | `GET /kimp/top/{n}` | First `n` records, `1 <= n <= 50` |
//! | `GET /kimp/negative` | Records with a negative premium |
//! | `GET /exchange-rate` | USD/KRW rate and fallback flag |
//! | `GET /symbols` | Assets in the latest result |

pub mod cli;
pub mod error;
pub mod routes;

pub use cli::Cli;
pub use error::{ApiError, ServerError};
pub use routes::{create_router, AppState};
