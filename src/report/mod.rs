pub mod reporter; // change-driven B/S output

pub use reporter::{Emission, Emissions, Reporter, RunSummary};
