pub mod book;  // price-level ledgers + order registry + cost walk
pub mod types; // sides, prices, events, quotes
