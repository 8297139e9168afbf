use std::collections::BTreeMap;
use std::fmt;

use ahash::AHashMap;
use itertools::Itertools;
use tracing::{debug, error, instrument, trace, warn};

use crate::engine::types::{OrderEvent, OrderId, Price, Quote, Reduction, RestingOrder, Side, Timestamp};
use crate::error::{PricerError, Result};
use crate::feed::normaliser::Normaliser;

/// Aggregated price-level book for one instrument.
///
/// Each side is a `price -> total size` ledger kept sorted by the `BTreeMap`,
/// so cost queries walk distinct levels instead of individual orders. The
/// registry maps every live order to its side, price and remaining size so
/// reductions can find their level.
///
/// Invariants, holding after every public call:
/// - no level is stored with size 0;
/// - per side, the level sizes sum to the live orders' `remaining`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBook {
    bids: BTreeMap<Price, u64>,
    asks: BTreeMap<Price, u64>,
    orders: AHashMap<OrderId, RestingOrder>,
    normaliser: Normaliser,
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new(Normaliser::default())
    }
}

impl OrderBook {
    pub fn new(normaliser: Normaliser) -> Self {
        Self { bids: BTreeMap::new(), asks: BTreeMap::new(), orders: AHashMap::new(), normaliser }
    }

    pub fn normaliser(&self) -> &Normaliser {
        &self.normaliser
    }

    fn ledger(&self, side: Side) -> &BTreeMap<Price, u64> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn ledger_mut(&mut self, side: Side) -> &mut BTreeMap<Price, u64> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Apply one feed event and return the side it touched.
    pub fn apply(&mut self, event: &OrderEvent) -> Result<Side> {
        match event {
            OrderEvent::Add { ts, order_id, side, price, size } => {
                self.add_order(*ts, order_id, *side, *price, *size)?;
                Ok(*side)
            }
            OrderEvent::Reduce { order_id, size, .. } => {
                self.reduce_order(order_id, *size).map(|r| r.side)
            }
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn add_order(&mut self, ts: Timestamp, order_id: &str, side: Side, price: Price, size: u64) -> Result<()> {
        if size == 0 {
            return Err(PricerError::format(order_id, "size must be positive"));
        }
        if price.ticks() <= 0 {
            return Err(PricerError::format(order_id, "price must be positive"));
        }
        if self.orders.contains_key(order_id) {
            return Err(PricerError::DuplicateOrder { order_id: order_id.to_string() });
        }

        // Check the level total before touching anything
        let level = self.ledger(side).get(&price).copied().unwrap_or(0);
        let new_level = level
            .checked_add(size)
            .ok_or_else(|| PricerError::format(order_id, "level size out of range"))?;

        self.ledger_mut(side).insert(price, new_level);
        self.orders.insert(order_id.to_string(), RestingOrder { ts, side, price, remaining: size });
        debug!(%side, price = price.ticks(), size, level = new_level, "Added order to book");
        Ok(())
    }

    /// Take `delta` shares off a live order. A delta larger than what the
    /// order has left is clamped. Once the order reaches zero it leaves the
    /// registry, so further reductions against its id fail.
    #[instrument(level = "debug", skip(self))]
    pub fn reduce_order(&mut self, order_id: &str, delta: u64) -> Result<Reduction> {
        if delta == 0 {
            return Err(PricerError::format(order_id, "reduction must be positive"));
        }
        let order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| PricerError::OrderNotFound { order_id: order_id.to_string() })?;

        if delta > order.remaining {
            warn!(delta, remaining = order.remaining, "Reduction exceeds remaining size, clamping");
        }
        let removed = delta.min(order.remaining);
        order.remaining -= removed;
        let (side, price, order_done) = (order.side, order.price, order.remaining == 0);
        if order_done {
            self.orders.remove(order_id);
        }

        let ledger = self.ledger_mut(side);
        let exhausted = match ledger.get_mut(&price) {
            Some(level) => {
                *level = level.saturating_sub(removed);
                *level == 0
            }
            None => {
                error!(%side, price = price.ticks(), "Live order has no price level");
                false
            }
        };
        if exhausted {
            ledger.remove(&price);
            debug!(%side, price = price.ticks(), "Removed exhausted price level");
        }

        debug!(%side, price = price.ticks(), removed, order_done, "Reduced order");
        Ok(Reduction { side, price, removed, order_done })
    }

    /// Remove whatever is left of an order.
    pub fn cancel_order(&mut self, order_id: &str) -> Result<Reduction> {
        let remaining = self
            .orders
            .get(order_id)
            .map(|o| o.remaining)
            .ok_or_else(|| PricerError::OrderNotFound { order_id: order_id.to_string() })?;
        self.reduce_order(order_id, remaining)
    }

    /// Cost of buying `target` shares now, walking asks from the lowest price.
    #[instrument(level = "trace", skip(self))]
    pub fn cost_to_buy(&self, target: u64) -> Quote {
        self.walk(self.asks.iter(), target)
    }

    /// Proceeds of selling `target` shares now, walking bids from the highest price.
    #[instrument(level = "trace", skip(self))]
    pub fn cost_to_sell(&self, target: u64) -> Quote {
        self.walk(self.bids.iter().rev(), target)
    }

    /// Cost on the side a taker of `side` would hit: asks for a buy, bids for a sell.
    pub fn cost_to(&self, side: Side, target: u64) -> Quote {
        match side {
            Side::Buy => self.cost_to_buy(target),
            Side::Sell => self.cost_to_sell(target),
        }
    }

    // Greedy walk: take each level whole until the last, which is only
    // consumed up to the target. Zero target costs nothing.
    fn walk<'a>(&self, levels: impl Iterator<Item = (&'a Price, &'a u64)>, target: u64) -> Quote {
        let mut needed = target;
        let mut notional: u128 = 0;
        if needed == 0 {
            return Quote::Cost(self.normaliser.notional_to_cents(0));
        }
        for (price, &available) in levels {
            let take = available.min(needed);
            notional += price.ticks() as u128 * take as u128;
            needed -= take;
            trace!(price = price.ticks(), take, needed, "Consumed level");
            if needed == 0 {
                return Quote::Cost(self.normaliser.notional_to_cents(notional));
            }
        }
        trace!(needed, "Not enough liquidity");
        Quote::Unavailable
    }

    pub fn best_bid(&self) -> Option<(Price, u64)> {
        self.bids.iter().next_back().map(|(p, s)| (*p, *s))
    }

    pub fn best_ask(&self) -> Option<(Price, u64)> {
        self.asks.iter().next().map(|(p, s)| (*p, *s))
    }

    /// Best ask minus best bid, in ticks.
    pub fn spread(&self) -> Option<i64> {
        let (bid, _) = self.best_bid()?;
        let (ask, _) = self.best_ask()?;
        Some(ask.ticks() - bid.ticks())
    }

    /// Levels of one side, best price first.
    pub fn depth(&self, side: Side) -> Vec<(Price, u64)> {
        match side {
            Side::Buy => self.bids.iter().rev().map(|(p, s)| (*p, *s)).collect(),
            Side::Sell => self.asks.iter().map(|(p, s)| (*p, *s)).collect(),
        }
    }

    pub fn level_count(&self, side: Side) -> usize {
        self.ledger(side).len()
    }

    /// Total resting size on one side, saturating at `u64::MAX`.
    pub fn side_volume(&self, side: Side) -> u64 {
        self.ledger(side).values().fold(0u64, |acc, &size| acc.saturating_add(size))
    }

    pub fn order(&self, order_id: &str) -> Option<&RestingOrder> {
        self.orders.get(order_id)
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Recompute the ledgers from the registry and compare. O(orders), meant
    /// for tests and debugging.
    pub fn invariants_hold(&self) -> bool {
        if self.bids.values().chain(self.asks.values()).any(|&s| s == 0) {
            return false;
        }
        let mut expected: [BTreeMap<Price, u64>; 2] = [BTreeMap::new(), BTreeMap::new()];
        for order in self.orders.values() {
            if order.remaining == 0 {
                return false;
            }
            let idx = match order.side {
                Side::Buy => 0,
                Side::Sell => 1,
            };
            *expected[idx].entry(order.price).or_default() += order.remaining;
        }
        expected[0] == self.bids && expected[1] == self.asks
    }
}

/// Live orders, one per line: `<ts> <order_id> <side> <price>`, oldest first.
impl fmt::Display for OrderBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self
            .orders
            .iter()
            .sorted_by(|(a_id, a), (b_id, b)| a.ts.cmp(&b.ts).then_with(|| a_id.cmp(b_id)))
            .map(|(id, o)| format!("{} {} {} {}", o.ts, id, o.side, self.normaliser.ticks_to_string(o.price)));
        write!(f, "{}", lines.format("\n"))
    }
}
