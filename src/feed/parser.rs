//! Feed record parser.
//!
//! ```text
//! <timestamp> A <order_id> <B|S> <price> <size>
//! <timestamp> R <order_id> <size>
//! ```

use crate::engine::types::{OrderEvent, Side, Timestamp};
use crate::error::{PricerError, Result};
use crate::feed::normaliser::Normaliser;

const ADD_FIELDS: usize = 6;
const REDUCE_FIELDS: usize = 4;

/// Parse one whitespace-delimited feed record.
pub fn parse_event(line: &str, normaliser: &Normaliser) -> Result<OrderEvent> {
    let record = line.trim();
    let parts: Vec<&str> = record.split_whitespace().collect();
    if parts.len() < 2 {
        return Err(PricerError::format(record, "missing timestamp or message type"));
    }

    let ts = parse_timestamp(parts[0]).map_err(|e| in_record(e, record))?;
    match parts[1] {
        "A" => {
            expect_fields(record, &parts, ADD_FIELDS)?;
            let side = Side::from_code(parts[3]).ok_or_else(|| {
                PricerError::format(record, format!("unknown side {:?}", parts[3]))
            })?;
            let price = normaliser.price_to_ticks(parts[4]).map_err(|e| in_record(e, record))?;
            let size = normaliser.size_to_shares(parts[5]).map_err(|e| in_record(e, record))?;
            Ok(OrderEvent::Add { ts, order_id: parts[2].to_string(), side, price, size })
        }
        "R" => {
            expect_fields(record, &parts, REDUCE_FIELDS)?;
            let size = normaliser.size_to_shares(parts[3]).map_err(|e| in_record(e, record))?;
            Ok(OrderEvent::Reduce { ts, order_id: parts[2].to_string(), size })
        }
        other => Err(PricerError::format(record, format!("unknown message type {other:?}"))),
    }
}

fn parse_timestamp(s: &str) -> Result<Timestamp> {
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PricerError::format(s, "timestamp is not a whole number"));
    }
    s.parse().map_err(|_| PricerError::format(s, "timestamp out of range"))
}

fn expect_fields(record: &str, parts: &[&str], expected: usize) -> Result<()> {
    if parts.len() != expected {
        return Err(PricerError::format(
            record,
            format!("expected {expected} fields, found {}", parts.len()),
        ));
    }
    Ok(())
}

// Field-level errors carry the field text; report the whole record instead.
fn in_record(err: PricerError, record: &str) -> PricerError {
    match err {
        PricerError::OrderFormat { record: field, reason } => {
            PricerError::format(record, format!("{reason} ({field:?})"))
        }
        other => other,
    }
}
