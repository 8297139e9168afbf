//! End-to-end pricing scenarios: feed text in, priced records out.

use std::io::Cursor;

use book_pricer::config::prompt_target_size;
use book_pricer::engine::types::Cents;
use book_pricer::feed::normaliser::Normaliser;
use book_pricer::feed::parser::parse_event;
use book_pricer::feed::FeedReader;
use book_pricer::{OrderBook, PricerError, Quote, Reporter, Side, TargetSize};

fn apply(book: &mut OrderBook, line: &str) -> Result<Side, PricerError> {
    let event = parse_event(line, &Normaliser::default())?;
    book.apply(&event)
}

fn run_feed(feed: &str, target: u64) -> String {
    let mut book = OrderBook::default();
    let mut reporter = Reporter::new(TargetSize::new(target).unwrap());
    let mut out = Vec::new();
    reporter.run(FeedReader::new(Cursor::new(feed)), &mut book, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

// ============================================================================
// Cost walk scenarios
// ============================================================================

#[test]
fn test_single_ask_level() {
    let mut book = OrderBook::default();
    apply(&mut book, "1 A o1 B 10.00 100").unwrap();
    apply(&mut book, "2 A o2 S 10.50 50").unwrap();
    assert_eq!(book.cost_to_buy(50).to_string(), "525.00");
}

#[test]
fn test_cheaper_level_consumed_first() {
    let mut book = OrderBook::default();
    apply(&mut book, "1 A o1 B 10.00 100").unwrap();
    apply(&mut book, "2 A o2 S 10.50 50").unwrap();
    apply(&mut book, "3 A o3 S 10.25 20").unwrap();
    assert_eq!(book.cost_to_buy(50).to_string(), "520.00");
}

#[test]
fn test_fully_reduced_ask_side_is_unavailable() {
    let mut book = OrderBook::default();
    apply(&mut book, "1 A o1 B 10.00 100").unwrap();
    apply(&mut book, "2 A o2 S 10.50 50").unwrap();
    apply(&mut book, "3 R o2 50").unwrap();
    assert_eq!(book.cost_to_buy(50), Quote::Unavailable);
    assert_eq!(book.cost_to_buy(50).to_string(), "NA");
    assert_eq!(book.level_count(Side::Sell), 0);
    // bids are untouched
    assert_eq!(book.cost_to_sell(50), Quote::Cost(Cents(50_000)));
}

#[test]
fn test_reduce_unknown_order_changes_nothing() {
    let mut book = OrderBook::default();
    apply(&mut book, "1 A o1 B 10.00 100").unwrap();
    apply(&mut book, "2 A o2 S 10.50 50").unwrap();
    let before = book.clone();

    let err = apply(&mut book, "3 R o9 10").unwrap_err();
    assert_eq!(err, PricerError::OrderNotFound { order_id: "o9".into() });
    assert_eq!(book, before);
}

#[test]
fn test_non_positive_target_is_reprompted() {
    assert!("0".parse::<TargetSize>().is_err());
    assert!("-10".parse::<TargetSize>().is_err());

    let mut answers = Cursor::new("0\n-10\n50\n");
    let mut prompt = Vec::new();
    let target = prompt_target_size(&mut answers, &mut prompt).unwrap();
    assert_eq!(target.get(), 50);
}

// ============================================================================
// Reporter output
// ============================================================================

const SAMPLE_FEED: &str = "\
28800538 A b S 44.26 100
28800562 A c B 44.10 100
28800744 R b 100
28800758 A d B 44.18 157
28800773 A e S 44.38 100
28800796 R d 157
28800812 A f B 44.18 157
28800974 A g S 44.27 100
28800975 R e 100
28812071 R f 100
28813129 A h B 43.68 50
28813300 R f 57
28813830 A i S 44.18 100
28814087 A j S 44.18 1000
28814834 R c 100
28814864 A k B 44.09 100
28815774 R k 100
28815804 A l B 44.07 175
28815937 R j 1000
28816245 A m S 44.22 100
";

#[test]
fn test_sample_feed_target_one() {
    let expected = "\
28800538 B 44.26
28800562 S 44.10
28800744 B NA
28800758 S 44.18
28800773 B 44.38
28800796 S 44.10
28800812 S 44.18
28800974 B 44.27
28813300 S 44.10
28813830 B 44.18
28814834 S 43.68
28814864 S 44.09
28815774 S 43.68
28815804 S 44.07
";
    assert_eq!(run_feed(SAMPLE_FEED, 1), expected);
}

#[test]
fn test_sample_feed_target_two_hundred() {
    let expected = "\
28800758 S 8832.56
28800796 S NA
28800812 S 8832.56
28800974 B 8865.00
28800975 B NA
28812071 S NA
28813129 S 8806.50
28813300 S NA
28813830 B 8845.00
28814087 B 8836.00
28815804 S 8804.25
28815937 B 8845.00
28816245 B 8840.00
";
    assert_eq!(run_feed(SAMPLE_FEED, 200), expected);
}

#[test]
fn test_bad_records_do_not_stop_the_feed() {
    let feed = "\
1 A a S 10.00 5
not a record
2 A a S 11.00 5
3 R nobody 5
4 A b S 9.00 5
";
    assert_eq!(run_feed(feed, 5), "1 B 50.00\n4 B 45.00\n");
}
