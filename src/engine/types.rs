use std::fmt;

/// Feed timestamp, carried through to the emitted records untouched.
pub type Timestamp = u64;

/// Opaque, case-sensitive order identifier assigned by the feed.
pub type OrderId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Feed letter: `B` or `S`.
    pub fn from_code(code: &str) -> Option<Side> {
        match code {
            "B" => Some(Side::Buy),
            "S" => Some(Side::Sell),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            Side::Buy => 'B',
            Side::Sell => 'S',
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Limit price in integer ticks. The tick size is set by the `Normaliser`
/// that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(pub i64);

impl Price {
    pub fn ticks(self) -> i64 {
        self.0
    }
}

// Resting order in the registry. Identity fields never change; `remaining`
// shrinks with every reduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestingOrder {
    pub ts: Timestamp,
    pub side: Side,
    pub price: Price,
    pub remaining: u64,
}

/// One parsed feed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEvent {
    Add { ts: Timestamp, order_id: OrderId, side: Side, price: Price, size: u64 },
    Reduce { ts: Timestamp, order_id: OrderId, size: u64 },
}

impl OrderEvent {
    pub fn ts(&self) -> Timestamp {
        match self {
            OrderEvent::Add { ts, .. } | OrderEvent::Reduce { ts, .. } => *ts,
        }
    }

    pub fn order_id(&self) -> &str {
        match self {
            OrderEvent::Add { order_id, .. } | OrderEvent::Reduce { order_id, .. } => order_id,
        }
    }
}

/// Outcome of a successful reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reduction {
    pub side: Side,
    pub price: Price,
    /// Shares actually taken off the level (clamped to what the order had left)
    pub removed: u64,
    /// The order reached zero and left the registry
    pub order_done: bool,
}

/// Monetary amount in whole cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cents(pub u128);

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Result of a cost walk: the cost of filling the target size, or `NA`
/// when the side cannot fill it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Cost(Cents),
    Unavailable,
}

impl Quote {
    pub fn cost(&self) -> Option<Cents> {
        match self {
            Quote::Cost(c) => Some(*c),
            Quote::Unavailable => None,
        }
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quote::Cost(c) => write!(f, "{c}"),
            Quote::Unavailable => f.write_str("NA"),
        }
    }
}
