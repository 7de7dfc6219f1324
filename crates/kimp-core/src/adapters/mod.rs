mod binance;
mod exchange_rate;
mod transport;
mod upbit;

pub use binance::BinanceAdapter;
pub use exchange_rate::ExchangeRateApiAdapter;
pub use upbit::UpbitAdapter;
