//! Pure pipeline stages of one calculation cycle.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use super::rate::ExchangeRateProvider;
use crate::upstream::{Fetched, MarketCatalog, PriceFetcher, Stage, UpstreamFailure};
use crate::{ExchangeRate, PairMapping, PremiumRecord, PricePoint, Symbol, SymbolMapping, UtcDateTime};

pub type PriceMap = BTreeMap<Symbol, PricePoint>;

pub async fn resolve_rate(provider: &ExchangeRateProvider) -> Fetched<ExchangeRate> {
    provider.resolve().await
}

/// Domestic market codes currently listed; empty on failure.
pub async fn list_domestic_markets(catalog: &dyn MarketCatalog) -> Fetched<BTreeSet<Symbol>> {
    match catalog.list_markets().await {
        Ok(markets) => Fetched::ok(markets),
        Err(error) => {
            warn!(venue = %catalog.venue(), %error, "market catalog unavailable");
            Fetched::degraded(
                BTreeSet::new(),
                UpstreamFailure::new(catalog.venue(), Stage::MarketCatalog, &error),
            )
        }
    }
}

/// Mapping pairs whose domestic leg is listed, in mapping order.
pub fn effective_pairs(mapping: &SymbolMapping, listed: &BTreeSet<Symbol>) -> Vec<PairMapping> {
    mapping
        .pairs()
        .iter()
        .filter(|pair| listed.contains(&pair.domestic_code))
        .cloned()
        .collect()
}

async fn fetch_leg(
    fetcher: &dyn PriceFetcher,
    requested: &BTreeSet<Symbol>,
    stage: Stage,
) -> Fetched<PriceMap> {
    match fetcher.fetch_prices(requested).await {
        Ok(prices) => Fetched::ok(prices),
        Err(error) => {
            warn!(venue = %fetcher.venue(), ?stage, %error, "price fetch failed");
            Fetched::degraded(
                PriceMap::new(),
                UpstreamFailure::new(fetcher.venue(), stage, &error),
            )
        }
    }
}

/// Fetches the foreign and domestic legs of `pairs` concurrently.
pub async fn fetch_both_legs(
    foreign: &dyn PriceFetcher,
    domestic: &dyn PriceFetcher,
    pairs: &[PairMapping],
) -> (Fetched<PriceMap>, Fetched<PriceMap>) {
    let foreign_symbols: BTreeSet<Symbol> =
        pairs.iter().map(|pair| pair.foreign_symbol.clone()).collect();
    let domestic_codes: BTreeSet<Symbol> =
        pairs.iter().map(|pair| pair.domestic_code.clone()).collect();

    tokio::join!(
        fetch_leg(foreign, &foreign_symbols, Stage::ForeignPrices),
        fetch_leg(domestic, &domestic_codes, Stage::DomesticPrices),
    )
}

/// Builds a record for every pair quoted on both legs; the rest are dropped.
pub fn join_records(
    pairs: &[PairMapping],
    foreign_prices: &PriceMap,
    domestic_prices: &PriceMap,
    rate: f64,
    timestamp: UtcDateTime,
) -> Vec<PremiumRecord> {
    pairs
        .iter()
        .filter_map(|pair| {
            let foreign = foreign_prices.get(&pair.foreign_symbol)?;
            let domestic = domestic_prices.get(&pair.domestic_code)?;
            Some(PremiumRecord::derive(
                pair.display_name.clone(),
                foreign,
                domestic,
                rate,
                timestamp,
            ))
        })
        .collect()
}

/// Premium descending, then display name ascending.
pub fn sort_records(records: &mut [PremiumRecord]) {
    records.sort_by(compare_records);
}

fn compare_records(left: &PremiumRecord, right: &PremiumRecord) -> Ordering {
    right
        .premium_pct
        .total_cmp(&left.premium_pct)
        .then_with(|| left.display_name.cmp(&right.display_name))
}
