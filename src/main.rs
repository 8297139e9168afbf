use std::io::{self, BufWriter};

use anyhow::Context;
use clap::Parser;
use tracing::{debug, warn};

use book_pricer::config::{prompt_target_size, AppConfig, Cli};
use book_pricer::engine::book::OrderBook;
use book_pricer::feed::normaliser::Normaliser;
use book_pricer::feed::FeedReader;
use book_pricer::report::Reporter;
use book_pricer::telemetry;

fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(Cli::parse()).context("loading configuration")?;
    telemetry::init_tracing(&config.log_filter);
    telemetry::init_metrics()?;

    let normaliser = Normaliser::new(config.price_decimals)?;

    // The target size is fixed before any of the feed is read
    let target = match config.target_size {
        Ok(target) => target,
        Err(e) => {
            warn!(error = %e, "No usable target size configured, prompting");
            prompt_target_size(&mut io::stdin().lock(), &mut io::stderr())?
        }
    };

    let mut book = OrderBook::new(normaliser);
    let mut reporter = Reporter::new(target);
    let mut sink = BufWriter::new(io::stdout().lock());

    let summary = match &config.input {
        Some(path) => {
            let feed = FeedReader::open(path)
                .with_context(|| format!("opening feed {}", path.display()))?;
            reporter.run(feed, &mut book, &mut sink)
        }
        None => reporter.run(FeedReader::new(io::stdin().lock()), &mut book, &mut sink),
    }
    .context("reading feed")?;

    debug!(
        ?summary,
        best_bid = ?book.best_bid(),
        best_ask = ?book.best_ask(),
        spread = ?book.spread(),
        "Final book"
    );
    Ok(())
}
