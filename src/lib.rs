//! Prices a fixed-size market order against a limit order book rebuilt from
//! an add/reduce feed, reporting the buy and sell cost whenever it changes.

pub mod config;    // target size, CLI, file and env settings
pub mod engine;    // order book state and cost walk
pub mod error;     // PricerError
pub mod feed;      // line reader, normaliser, record parser
pub mod report;    // change-driven reporter
pub mod telemetry; // tracing + metrics setup

pub use config::TargetSize;
pub use engine::book::OrderBook;
pub use engine::types::{OrderEvent, Quote, Side};
pub use error::{PricerError, Result};
pub use report::Reporter;
