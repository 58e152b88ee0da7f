//! Webhook payload parsing.
//!
//! The alert body is plaintext, one field per line. Three fields are
//! `[symbol, direction, broker_code]`:
//!
//! ```text
//! EURUSD
//! buy
//! M
//! ```
//!
//! Four fields insert a fixed order quantity before the broker code
//! (`BTCUSDT` / `sell` / `0.5` / `B`).

use relaybot_core::{Direction, RelayError, Signal};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a raw webhook body into a [`Signal`].
pub fn parse_payload(body: &str) -> Result<Signal, RelayError> {
    let fields: Vec<&str> = body
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let (symbol, raw_direction, quantity, broker_code) = match fields.as_slice() {
        [symbol, direction, broker] => (*symbol, *direction, None, *broker),
        [symbol, direction, quantity, broker] => {
            let qty = Decimal::from_str(quantity).map_err(|_| {
                RelayError::MalformedPayload(format!("unparseable quantity: {:?}", quantity))
            })?;
            if qty <= Decimal::ZERO {
                return Err(RelayError::MalformedPayload(format!(
                    "quantity must be positive, got {}",
                    qty
                )));
            }
            (*symbol, *direction, Some(qty), *broker)
        }
        _ => {
            return Err(RelayError::MalformedPayload(format!(
                "expected 3 or 4 fields, got {}",
                fields.len()
            )));
        }
    };

    Ok(Signal {
        symbol: symbol.to_string(),
        direction: Direction::from_token(raw_direction),
        raw_direction: raw_direction.to_string(),
        quantity,
        broker_code: broker_code.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn three_field_payload() {
        let signal = parse_payload("EURUSD\nbuy\nM").unwrap();
        assert_eq!(signal.symbol, "EURUSD");
        assert_eq!(signal.direction, Some(Direction::Buy));
        assert_eq!(signal.quantity, None);
        assert_eq!(signal.broker_code, "M");
    }

    #[test]
    fn four_field_payload_carries_fixed_quantity() {
        let signal = parse_payload("BTCUSDT\nsell\n0.5\nB").unwrap();
        assert_eq!(signal.direction, Some(Direction::Sell));
        assert_eq!(signal.quantity, Some(dec!(0.5)));
        assert_eq!(signal.broker_code, "B");
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let signal = parse_payload("EURUSD\r\nsell\r\nM\r\n").unwrap();
        assert_eq!(signal.symbol, "EURUSD");
        assert_eq!(signal.direction, Some(Direction::Sell));
    }

    #[test]
    fn single_field_is_malformed() {
        let err = parse_payload("EURUSD").unwrap_err();
        assert!(matches!(err, RelayError::MalformedPayload(_)));
    }

    #[test]
    fn empty_body_is_malformed() {
        let err = parse_payload("").unwrap_err();
        assert!(matches!(err, RelayError::MalformedPayload(_)));
    }

    #[test]
    fn bad_quantity_is_malformed() {
        let err = parse_payload("BTCUSDT\nbuy\nlots\nB").unwrap_err();
        assert!(matches!(err, RelayError::MalformedPayload(_)));
    }

    #[test]
    fn negative_quantity_is_malformed() {
        let err = parse_payload("BTCUSDT\nbuy\n-1\nB").unwrap_err();
        assert!(matches!(err, RelayError::MalformedPayload(_)));
    }

    #[test]
    fn unknown_direction_is_kept_as_no_op_signal() {
        let signal = parse_payload("EURUSD\nclose\nM").unwrap();
        assert_eq!(signal.direction, None);
        assert_eq!(signal.raw_direction, "close");
    }
}
