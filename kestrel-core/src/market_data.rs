//! Market data normalization and aggregation
//!
//! Fan-in from all venue sessions. Per (symbol, venue) only the latest
//! snapshot is retained (last write wins, no cross-venue ordering needed);
//! each update recomputes the symbol's aggregate view and emits it only
//! when something actually changed.

use std::collections::HashMap;
use std::time::SystemTime;

use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::codec::fields::{md_entry_type_values, tags};
use crate::codec::FixMessage;

/// Top-of-book snapshot from one venue for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketDataSnapshot {
    pub symbol: String,
    pub venue: String,
    pub bid: Option<Decimal>,
    pub bid_size: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub ask_size: Option<Decimal>,
    pub last_trade: Option<Decimal>,
    pub last_trade_size: Option<Decimal>,
    pub timestamp: SystemTime,
}

impl MarketDataSnapshot {
    /// Decode a MarketDataSnapshotFullRefresh (35=W) or incremental
    /// refresh, walking the flat MDEntry repeating group. `None` when no
    /// symbol is present.
    pub fn from_fix(msg: &FixMessage, venue: &str) -> Option<Self> {
        let symbol = msg.get(tags::SYMBOL)?.to_string();
        let mut snapshot = Self {
            symbol,
            venue: venue.to_string(),
            bid: None,
            bid_size: None,
            ask: None,
            ask_size: None,
            last_trade: None,
            last_trade_size: None,
            timestamp: SystemTime::now(),
        };

        // Entries arrive as repeated (269, 270, 271) runs; the entry type
        // opens a run and the price and size that follow belong to it
        let mut current: Option<&str> = None;
        for (tag, value) in &msg.fields {
            match *tag {
                tags::MD_ENTRY_TYPE => current = Some(value.as_str()),
                tags::MD_ENTRY_PX => {
                    let px: Decimal = match value.parse() {
                        Ok(px) => px,
                        Err(_) => continue,
                    };
                    match current {
                        Some(md_entry_type_values::BID) => snapshot.bid = Some(px),
                        Some(md_entry_type_values::OFFER) => snapshot.ask = Some(px),
                        Some(md_entry_type_values::TRADE) => snapshot.last_trade = Some(px),
                        _ => {}
                    }
                }
                tags::MD_ENTRY_SIZE => {
                    let size: Decimal = match value.parse() {
                        Ok(size) => size,
                        Err(_) => continue,
                    };
                    match current {
                        Some(md_entry_type_values::BID) => snapshot.bid_size = Some(size),
                        Some(md_entry_type_values::OFFER) => snapshot.ask_size = Some(size),
                        Some(md_entry_type_values::TRADE) => {
                            snapshot.last_trade_size = Some(size)
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }
        Some(snapshot)
    }
}

/// One side of the aggregate: a price with its displayed size and the
/// venue quoting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceLevel {
    pub price: Decimal,
    /// Displayed size, when the venue reports one.
    pub size: Option<Decimal>,
    pub venue: String,
}

/// Cross-venue aggregate view of one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateQuote {
    pub symbol: String,
    /// Highest bid across venues.
    pub best_bid: Option<PriceLevel>,
    /// Lowest ask across venues.
    pub best_ask: Option<PriceLevel>,
    /// Most recent trade across venues.
    pub last_trade: Option<PriceLevel>,
}

#[derive(Debug, Default)]
struct SymbolBook {
    /// Latest snapshot per venue.
    by_venue: HashMap<String, MarketDataSnapshot>,
    /// Aggregate as last emitted, for change gating.
    last_emitted: Option<AggregateQuote>,
    /// Most recent trade print across venues.
    last_trade: Option<(PriceLevel, SystemTime)>,
}

impl SymbolBook {
    fn aggregate(&self, symbol: &str) -> AggregateQuote {
        let best_bid = self
            .by_venue
            .values()
            .filter_map(|s| {
                s.bid.map(|price| PriceLevel {
                    price,
                    size: s.bid_size,
                    venue: s.venue.clone(),
                })
            })
            .max_by_key(|level| level.price);
        let best_ask = self
            .by_venue
            .values()
            .filter_map(|s| {
                s.ask.map(|price| PriceLevel {
                    price,
                    size: s.ask_size,
                    venue: s.venue.clone(),
                })
            })
            .min_by_key(|level| level.price);
        AggregateQuote {
            symbol: symbol.to_string(),
            best_bid,
            best_ask,
            last_trade: self.last_trade.as_ref().map(|(level, _)| level.clone()),
        }
    }
}

/// Merges venue snapshots into per-symbol aggregates and gates emission
/// on change. Symbols without subscribers are not tracked.
#[derive(Debug, Default)]
pub struct Normalizer {
    books: DashMap<String, Mutex<SymbolBook>>,
    subscriptions: DashSet<String>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in a symbol. Returns false if already subscribed.
    pub fn subscribe(&self, symbol: &str) -> bool {
        self.subscriptions.insert(symbol.to_string())
    }

    /// Drop interest in a symbol and discard its data.
    /// Returns false if there was no subscription.
    pub fn unsubscribe(&self, symbol: &str) -> bool {
        let removed = self.subscriptions.remove(symbol).is_some();
        self.books.remove(symbol);
        removed
    }

    pub fn is_subscribed(&self, symbol: &str) -> bool {
        self.subscriptions.contains(symbol)
    }

    /// Currently subscribed symbols.
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.iter().map(|s| s.key().clone()).collect()
    }

    /// Merge one venue snapshot. Returns the new aggregate only when it
    /// differs from the last one emitted for that symbol.
    pub fn apply(&self, snapshot: MarketDataSnapshot) -> Option<AggregateQuote> {
        if !self.is_subscribed(&snapshot.symbol) {
            debug!(symbol = %snapshot.symbol, "dropping data for unsubscribed symbol");
            return None;
        }
        let symbol = snapshot.symbol.clone();
        let book = self
            .books
            .entry(symbol.clone())
            .or_insert_with(|| Mutex::new(SymbolBook::default()));
        let mut book = book.lock();

        if let Some(price) = snapshot.last_trade {
            let newer = book
                .last_trade
                .as_ref()
                .map(|(_, ts)| snapshot.timestamp >= *ts)
                .unwrap_or(true);
            if newer {
                let level = PriceLevel {
                    price,
                    size: snapshot.last_trade_size,
                    venue: snapshot.venue.clone(),
                };
                book.last_trade = Some((level, snapshot.timestamp));
            }
        }
        book.by_venue.insert(snapshot.venue.clone(), snapshot);

        let aggregate = book.aggregate(&symbol);
        if book.last_emitted.as_ref() == Some(&aggregate) {
            return None;
        }
        book.last_emitted = Some(aggregate.clone());
        Some(aggregate)
    }
}
