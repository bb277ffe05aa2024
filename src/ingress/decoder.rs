//! The CSV event grammar: comma-separated tokens, quoted fields with `\`
//! escape, a case-insensitive single-letter tag in the first field.

use std::fmt;

use crate::model::{
    CancelEvent, Event, NewOrderEvent, OrderId, OrderType, PriceSpec, Side, Symbol, Timestamp,
    UserId,
};

/// Why a line failed to decode. All variants are local/absorbed per the
/// error taxonomy: logged and dropped, never propagated past the Exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    Empty,
    UnknownTag(String),
    WrongFieldCount { expected: usize, got: usize },
    BadSide(String),
    BadType(String),
    BadQuantity(String),
    BadOrderId(String),
    MissingPrice,
    BadPrice(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Empty => write!(f, "empty event line"),
            DecodeError::UnknownTag(t) => write!(f, "unknown event tag: {t:?}"),
            DecodeError::WrongFieldCount { expected, got } => {
                write!(f, "expected {expected} fields, got {got}")
            }
            DecodeError::BadSide(s) => write!(f, "invalid side: {s:?}"),
            DecodeError::BadType(s) => write!(f, "invalid order type: {s:?}"),
            DecodeError::BadQuantity(s) => write!(f, "invalid quantity: {s:?}"),
            DecodeError::BadOrderId(s) => write!(f, "invalid order id: {s:?}"),
            DecodeError::MissingPrice => write!(f, "limit order missing price field"),
            DecodeError::BadPrice(s) => write!(f, "invalid price: {s:?}"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Splits a CSV line into trimmed, uppercased-on-demand tokens, honouring
/// `"quoted"` fields with `\` escapes.
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if in_quotes => {
                if let Some(&next) = chars.peek() {
                    current.push(next);
                    chars.next();
                }
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                tokens.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    tokens.push(current.trim().to_string());
    tokens
}

fn parse_side(tok: &str) -> Result<Side, DecodeError> {
    match tok.to_ascii_uppercase().as_str() {
        "BUY" | "1" => Ok(Side::Buy),
        "SELL" | "2" => Ok(Side::Sell),
        _ => Err(DecodeError::BadSide(tok.to_string())),
    }
}

fn parse_order_type(tok: &str) -> Result<OrderType, DecodeError> {
    match tok.to_ascii_uppercase().as_str() {
        "MARKET" | "1" => Ok(OrderType::Market),
        "LIMIT" | "2" => Ok(OrderType::Limit),
        _ => Err(DecodeError::BadType(tok.to_string())),
    }
}

fn parse_order_id(tok: &str) -> Result<OrderId, DecodeError> {
    tok.parse::<OrderId>()
        .map_err(|_| DecodeError::BadOrderId(tok.to_string()))
}

/// Decodes one CSV line into an [`Event`]. `timestamp` is the monotonic
/// clock reading taken at decode time; `price_spec` governs decimal-to-tick
/// conversion for `Limit` orders.
pub fn decode_event(
    line: &str,
    price_spec: PriceSpec,
    timestamp: Timestamp,
) -> Result<Event, DecodeError> {
    let tokens = tokenize(line);
    let tag = tokens.first().ok_or(DecodeError::Empty)?.to_ascii_uppercase();
    if tag.is_empty() {
        return Err(DecodeError::Empty);
    }

    match tag.as_str() {
        "D" => {
            if tokens.len() < 7 || tokens.len() > 8 {
                return Err(DecodeError::WrongFieldCount {
                    expected: 7,
                    got: tokens.len(),
                });
            }
            let user_id = UserId::from_str_truncating(&tokens[1]);
            let client_order_id = parse_order_id(&tokens[2])?;
            let symbol = Symbol::from_str_truncating(&tokens[3]);
            let quantity = tokens[4]
                .parse::<i64>()
                .map_err(|_| DecodeError::BadQuantity(tokens[4].clone()))?;
            let side = parse_side(&tokens[5])?;
            let order_type = parse_order_type(&tokens[6])?;
            let price = match order_type {
                OrderType::Limit => {
                    let raw = tokens.get(7).ok_or(DecodeError::MissingPrice)?;
                    let decimal = raw
                        .parse::<f64>()
                        .map_err(|_| DecodeError::BadPrice(raw.clone()))?;
                    price_spec
                        .to_ticks(decimal)
                        .map_err(|e| DecodeError::BadPrice(e.to_string()))?
                }
                OrderType::Market => crate::model::MARKET_PRICE,
            };
            Ok(Event::NewOrder(NewOrderEvent {
                user_id,
                client_order_id,
                symbol,
                quantity,
                side,
                order_type,
                price,
                timestamp,
            }))
        }
        "F" => {
            if tokens.len() != 5 {
                return Err(DecodeError::WrongFieldCount {
                    expected: 5,
                    got: tokens.len(),
                });
            }
            Ok(Event::Cancel(CancelEvent {
                user_id: UserId::from_str_truncating(&tokens[1]),
                client_order_id: parse_order_id(&tokens[2])?,
                symbol: Symbol::from_str_truncating(&tokens[3]),
                orig_order_id: parse_order_id(&tokens[4])?,
            }))
        }
        "V" => {
            if tokens.len() != 4 {
                return Err(DecodeError::WrongFieldCount {
                    expected: 4,
                    got: tokens.len(),
                });
            }
            Ok(Event::TopOfBook(crate::model::TopOfBookEvent {
                user_id: UserId::from_str_truncating(&tokens[1]),
                client_order_id: parse_order_id(&tokens[2])?,
                symbol: Symbol::from_str_truncating(&tokens[3]),
            }))
        }
        "Q" | "QUIT" => Ok(Event::Quit),
        other => Err(DecodeError::UnknownTag(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TWO_DIGITS_PRICE_SPEC;

    #[test]
    fn decodes_new_limit_order() {
        let event =
            decode_event("D, u1, 1001, AAPL, 100, BUY, LIMIT, 150.00", TWO_DIGITS_PRICE_SPEC, 0)
                .unwrap();
        match event {
            Event::NewOrder(e) => {
                assert_eq!(e.client_order_id, 1001);
                assert_eq!(e.quantity, 100);
                assert_eq!(e.side, Side::Buy);
                assert_eq!(e.order_type, OrderType::Limit);
                assert_eq!(e.price.0, 15000);
            }
            _ => panic!("expected NewOrder"),
        }
    }

    #[test]
    fn decodes_market_order_without_price() {
        let event = decode_event("d,u1,1003,AAPL,100,BUY,MARKET", TWO_DIGITS_PRICE_SPEC, 0).unwrap();
        assert!(matches!(event, Event::NewOrder(_)));
    }

    #[test]
    fn numeric_side_and_type_codes_accepted() {
        let event = decode_event("D,u1,1,AAPL,10,1,2,150.00", TWO_DIGITS_PRICE_SPEC, 0).unwrap();
        match event {
            Event::NewOrder(e) => {
                assert_eq!(e.side, Side::Buy);
                assert_eq!(e.order_type, OrderType::Limit);
            }
            _ => panic!("expected NewOrder"),
        }
    }

    #[test]
    fn limit_without_price_is_rejected() {
        let err = decode_event("D,u1,1,AAPL,10,BUY,LIMIT", TWO_DIGITS_PRICE_SPEC, 0).unwrap_err();
        assert_eq!(err, DecodeError::MissingPrice);
    }

    #[test]
    fn decodes_cancel() {
        let event = decode_event("F, u1, 1001, AAPL, 1001", TWO_DIGITS_PRICE_SPEC, 0).unwrap();
        assert!(matches!(event, Event::Cancel(_)));
    }

    #[test]
    fn decodes_top_of_book() {
        let event = decode_event("V, u1, 1001, AAPL", TWO_DIGITS_PRICE_SPEC, 0).unwrap();
        assert!(matches!(event, Event::TopOfBook(_)));
    }

    #[test]
    fn decodes_quit_case_insensitive() {
        assert!(matches!(
            decode_event("q", TWO_DIGITS_PRICE_SPEC, 0).unwrap(),
            Event::Quit
        ));
        assert!(matches!(
            decode_event("QUIT", TWO_DIGITS_PRICE_SPEC, 0).unwrap(),
            Event::Quit
        ));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = decode_event("X,1,2,3", TWO_DIGITS_PRICE_SPEC, 0).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownTag(_)));
    }
}
