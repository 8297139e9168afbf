use std::fmt;
use std::io::{self, BufRead, Write};

use metrics::counter;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::config::TargetSize;
use crate::engine::book::OrderBook;
use crate::engine::types::{OrderEvent, Quote, Side, Timestamp};
use crate::error::{PricerError, Result};
use crate::feed::parser::parse_event;
use crate::feed::FeedReader;

/// One output record: `<timestamp> <B|S> <cost-or-NA>`. `B` is the cost of
/// buying the target size, `S` the proceeds of selling it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emission {
    pub ts: Timestamp,
    pub side: Side,
    pub quote: Quote,
}

impl fmt::Display for Emission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.ts, self.side, self.quote)
    }
}

/// At most one record per side per event.
pub type Emissions = SmallVec<[Emission; 2]>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub lines: usize,
    pub applied: usize,
    pub rejected: usize,
    pub emitted: usize,
}

/// Drives the book with feed events and reports the buy/sell cost of the
/// target size whenever it differs from the last value reported. Both memos
/// start at `NA`, so nothing is printed until a side can fill the target.
#[derive(Debug)]
pub struct Reporter {
    target: TargetSize,
    last_buy: Quote,
    last_sell: Quote,
    last_ts: Option<Timestamp>,
}

impl Reporter {
    pub fn new(target: TargetSize) -> Self {
        Self { target, last_buy: Quote::Unavailable, last_sell: Quote::Unavailable, last_ts: None }
    }

    pub fn target(&self) -> TargetSize {
        self.target
    }

    pub fn last_buy(&self) -> Quote {
        self.last_buy
    }

    pub fn last_sell(&self) -> Quote {
        self.last_sell
    }

    /// Timestamp of the last event the book accepted.
    pub fn last_ts(&self) -> Option<Timestamp> {
        self.last_ts
    }

    /// Apply one event and return the records it produces. A rejected event
    /// leaves the book as it was, so there is nothing to re-price.
    pub fn process(&mut self, book: &mut OrderBook, event: &OrderEvent) -> Result<Emissions> {
        let ts = event.ts();
        if let Some(prev) = self.last_ts {
            if ts < prev {
                warn!(ts, prev, "Feed timestamp went backwards");
            }
        }

        book.apply(event)?;
        self.last_ts = Some(ts);
        counter!("pricer_events_total").increment(1);

        let mut out = Emissions::new();
        match event {
            // A new ask can only move the cost of buying, a new bid the proceeds of selling
            OrderEvent::Add { side: Side::Sell, .. } => self.reprice(book, Side::Buy, ts, &mut out),
            OrderEvent::Add { side: Side::Buy, .. } => self.reprice(book, Side::Sell, ts, &mut out),
            // The side of a reduction is not known from the record itself
            OrderEvent::Reduce { .. } => {
                self.reprice(book, Side::Buy, ts, &mut out);
                self.reprice(book, Side::Sell, ts, &mut out);
            }
        }
        Ok(out)
    }

    fn reprice(&mut self, book: &OrderBook, side: Side, ts: Timestamp, out: &mut Emissions) {
        let quote = book.cost_to(side, self.target.get());
        let last = match side {
            Side::Buy => &mut self.last_buy,
            Side::Sell => &mut self.last_sell,
        };
        if *last != quote {
            *last = quote;
            debug!(ts, %side, %quote, "Quote changed");
            counter!("pricer_emissions_total", "side" => side.to_string()).increment(1);
            out.push(Emission { ts, side, quote });
        }
    }

    /// Consume a whole feed, writing every emission to `sink`. Malformed
    /// records and rejected events are logged and skipped; only I/O errors
    /// stop the run.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        feed: FeedReader<R>,
        book: &mut OrderBook,
        sink: &mut W,
    ) -> io::Result<RunSummary> {
        let mut summary = RunSummary::default();
        info!(target_size = %self.target, "Pricing feed");

        for line in feed {
            let (line_no, record) = line?;
            summary.lines += 1;

            let outcome = record
                .and_then(|line| parse_event(&line, book.normaliser()))
                .and_then(|event| self.process(book, &event));
            match outcome {
                Ok(emissions) => {
                    summary.applied += 1;
                    for emission in &emissions {
                        writeln!(sink, "{emission}")?;
                    }
                    summary.emitted += emissions.len();
                }
                Err(e) => {
                    summary.rejected += 1;
                    log_rejection(line_no, &e);
                }
            }
        }

        sink.flush()?;
        info!(
            lines = summary.lines,
            applied = summary.applied,
            rejected = summary.rejected,
            emitted = summary.emitted,
            live_orders = book.order_count(),
            "Feed finished"
        );
        Ok(summary)
    }
}

fn log_rejection(line_no: usize, err: &PricerError) {
    counter!("pricer_events_rejected_total", "kind" => err.kind()).increment(1);
    warn!(line = line_no, kind = err.kind(), error = %err, "Skipping feed record");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::Cents;
    use crate::feed::normaliser::Normaliser;

    fn event(line: &str) -> OrderEvent {
        parse_event(line, &Normaliser::default()).unwrap()
    }

    fn target(n: u64) -> TargetSize {
        TargetSize::new(n).unwrap()
    }

    #[test]
    fn test_first_quote_emitted_once() {
        let mut book = OrderBook::default();
        let mut reporter = Reporter::new(target(50));

        let out = reporter.process(&mut book, &event("1 A o1 B 10.00 100")).unwrap();
        assert_eq!(out.as_slice(), &[Emission { ts: 1, side: Side::Sell, quote: Quote::Cost(Cents(50_000)) }]);

        // Same sell proceeds, nothing new to report
        let out = reporter.process(&mut book, &event("2 A o4 B 9.00 10")).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_add_only_reprices_opposite_side() {
        let mut book = OrderBook::default();
        let mut reporter = Reporter::new(target(50));
        let out = reporter.process(&mut book, &event("1 A o2 S 10.50 50")).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to_string(), "1 B 525.00");
        assert_eq!(reporter.last_sell(), Quote::Unavailable);
    }

    #[test]
    fn test_reduce_checks_both_sides() {
        let mut book = OrderBook::default();
        let mut reporter = Reporter::new(target(10));
        reporter.process(&mut book, &event("1 A a B 10.00 10")).unwrap();
        reporter.process(&mut book, &event("2 A b S 11.00 10")).unwrap();

        let out = reporter.process(&mut book, &event("3 R b 5")).unwrap();
        assert_eq!(out.iter().map(|e| e.to_string()).collect::<Vec<_>>(), vec!["3 B NA"]);

        let out = reporter.process(&mut book, &event("4 R a 1")).unwrap();
        assert_eq!(out.iter().map(|e| e.to_string()).collect::<Vec<_>>(), vec!["4 S NA"]);
    }

    #[test]
    fn test_rejected_event_keeps_memo() {
        let mut book = OrderBook::default();
        let mut reporter = Reporter::new(target(1));
        reporter.process(&mut book, &event("1 A a S 10 1")).unwrap();
        let err = reporter.process(&mut book, &event("2 A a S 9 1")).unwrap_err();
        assert_eq!(err, PricerError::DuplicateOrder { order_id: "a".into() });
        assert_eq!(reporter.last_buy(), Quote::Cost(Cents(1_000)));
    }

    #[test]
    fn test_rejected_event_keeps_timestamp_baseline() {
        let mut book = OrderBook::default();
        let mut reporter = Reporter::new(target(1));
        assert_eq!(reporter.target().get(), 1);
        reporter.process(&mut book, &event("5 A a S 10 1")).unwrap();
        assert!(reporter.process(&mut book, &event("9 R zz 1")).is_err());
        assert_eq!(reporter.last_ts(), Some(5));
        reporter.process(&mut book, &event("7 A b S 9 1")).unwrap();
        assert_eq!(reporter.last_ts(), Some(7));
    }

    #[test]
    fn test_sub_cent_changes_are_not_reported() {
        let mut book = OrderBook::default();
        let mut reporter = Reporter::new(target(1));
        reporter.process(&mut book, &event("1 A a S 10.0001 1")).unwrap();
        // 10.0000 rounds to the same cents as 10.0001
        let out = reporter.process(&mut book, &event("2 A b S 10.0000 1")).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_run_writes_changes_and_skips_bad_lines() {
        let feed = "\
28800538 A b S 44.26 100
28800562 A c B 44.10 100
28800744 R b 100
garbage
28800758 A d B 44.18 157
28800773 A e S 44.38 100
28800796 R d 157
28800812 A f B 44.18 157
28800974 A g S 44.27 100
28800975 R zz 1
";
        let mut book = OrderBook::default();
        let mut reporter = Reporter::new(target(200));
        let mut sink = Vec::new();
        let summary = reporter.run(FeedReader::new(io::Cursor::new(feed)), &mut book, &mut sink).unwrap();

        assert_eq!(
            summary,
            RunSummary { lines: 10, applied: 8, rejected: 2, emitted: 4 }
        );
        assert_eq!(
            String::from_utf8(sink).unwrap(),
            "28800758 S 8832.56\n28800796 S NA\n28800812 S 8832.56\n28800974 B 8865.00\n"
        );
    }

    #[test]
    fn test_run_skips_record_with_invalid_utf8() {
        let feed: &[u8] = b"1 A a S 10.00 5\n2 A \xff S 11.00 5\n3 A b S 9.00 5\n";
        let mut book = OrderBook::default();
        let mut reporter = Reporter::new(target(5));
        let mut sink = Vec::new();
        let summary = reporter.run(FeedReader::new(io::Cursor::new(feed)), &mut book, &mut sink).unwrap();

        assert_eq!(summary, RunSummary { lines: 3, applied: 2, rejected: 1, emitted: 2 });
        assert_eq!(String::from_utf8(sink).unwrap(), "1 B 50.00\n3 B 45.00\n");
        assert_eq!(book.order_count(), 2);
    }

    #[test]
    fn test_run_prices_five_decimal_prices() {
        let feed = "1 A a S 10.12345 5\n2 R a 5\n";
        let mut book = OrderBook::default();
        let mut reporter = Reporter::new(target(5));
        let mut sink = Vec::new();
        let summary = reporter.run(FeedReader::new(io::Cursor::new(feed)), &mut book, &mut sink).unwrap();

        assert_eq!(summary.rejected, 0);
        assert_eq!(String::from_utf8(sink).unwrap(), "1 B 50.62\n2 B NA\n");
    }
}
