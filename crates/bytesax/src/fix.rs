//! FIX message field scanner.
//!
//! The same class of problem as the JSON side at a much smaller scale: a FIX
//! message is `tag=value\x01` repeated, and the scanner splits a chunk into
//! `(tag, value)` callback invocations with the value delivered as a borrowed
//! slice of the caller's bytes. A trailing partial field is left unconsumed;
//! the caller re-feeds it with the next chunk.

use crate::json::{ErrorKind, HandlerResult, ParseError};
use crate::window::Window;

const FIELD_TERMINATOR: u8 = 0x01;

/// Splits FIX messages into `(tag, value)` fields.
///
/// Tags are non-negative; anything that does not parse as an unsigned
/// decimal integer followed by `=` is malformed. Values end immediately
/// before the `\x01` terminator and are valid only for the duration of the
/// callback.
///
/// ```
/// use bytesax::FixParser;
///
/// let mut tags = Vec::new();
/// let mut parser = FixParser::new(move |tag, _value| {
///     tags.push(tag);
///     Ok(true)
/// });
/// let message = b"8=FIX.4.2\x019=12\x01";
/// let consumed = parser.parse(message).unwrap();
/// assert_eq!(consumed, message.len());
/// ```
pub struct FixParser {
    handler: Box<dyn FnMut(u64, &[u8]) -> HandlerResult>,
}

impl FixParser {
    pub fn new(handler: impl FnMut(u64, &[u8]) -> HandlerResult + 'static) -> Self {
        Self {
            handler: Box::new(handler),
        }
    }

    /// Scans every complete field in `chunk` and returns the number of bytes
    /// consumed. Bytes after the last field terminator belong to a partial
    /// field and are not consumed; prepend them to the next chunk. When the
    /// handler cancels, the count covers the fields delivered so far.
    pub fn parse(&mut self, chunk: &[u8]) -> Result<usize, ParseError> {
        let mut win = Window::new(chunk);

        // Lower the limit to exclude any trailing partial field.
        let mut scan_limit = win.limit();
        while scan_limit > win.position() && win.byte_at(scan_limit - 1) != FIELD_TERMINATOR {
            scan_limit -= 1;
        }
        win.set_limit(scan_limit);

        while win.remaining() > 0 {
            let field_start = win.position();
            let Some(tag) = read_tag(&mut win) else {
                return Err(ParseError {
                    kind: ErrorKind::Grammar("malformed FIX tag"),
                    offset: field_start as u64,
                });
            };

            let value_start = win.position();
            // A terminator is guaranteed before the lowered limit.
            while win.read_byte() != FIELD_TERMINATOR {}
            let value = win.bytes_at(value_start, win.position() - 1 - value_start);

            match (self.handler)(tag, value) {
                Ok(true) => {}
                Ok(false) => return Ok(win.position()),
                Err(cause) => {
                    return Err(ParseError {
                        kind: ErrorKind::Handler(cause),
                        offset: field_start as u64,
                    });
                }
            }
        }
        Ok(scan_limit)
    }
}

/// Parses the unsigned decimal tag and consumes the `=` separator.
fn read_tag(win: &mut Window<'_>) -> Option<u64> {
    let mut tag: u64 = 0;
    let mut digits = 0usize;
    while win.remaining() > 0 {
        let b = win.peek();
        if !b.is_ascii_digit() {
            break;
        }
        win.advance(1);
        tag = tag.checked_mul(10)?.checked_add(u64::from(b - b'0'))?;
        digits += 1;
    }
    if digits == 0 || win.remaining() == 0 || win.read_byte() != b'=' {
        return None;
    }
    Some(tag)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::FixParser;
    use crate::json::ErrorKind;

    const NEW_ORDER: &str = "8=FIX.4.2|9=130|35=D|34=659|49=BROKER04|56=REUTERS|\
                             52=20070123-19:09:43|38=1000|59=1|100=N|40=1|11=ORD10001|\
                             60=20070123-19:01:17|55=HPQ|54=1|21=2|10=004|";

    fn wire(readable: &str) -> Vec<u8> {
        readable.replace('|', "\x01").into_bytes()
    }

    #[test]
    fn single_order_round_trips() {
        let message = wire(NEW_ORDER);
        let rebuilt = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&rebuilt);
        let mut parser = FixParser::new(move |tag, value| {
            let mut out = sink.borrow_mut();
            out.extend_from_slice(tag.to_string().as_bytes());
            out.push(b'=');
            out.extend_from_slice(value);
            out.push(0x01);
            Ok(true)
        });
        let consumed = parser.parse(&message).unwrap();
        assert_eq!(consumed, message.len());
        assert_eq!(*rebuilt.borrow(), message);
    }

    #[test]
    fn tags_arrive_in_wire_order() {
        let message = wire("8=FIX.4.2|9=130|35=D|10=004|");
        let tags = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&tags);
        let mut parser = FixParser::new(move |tag, _| {
            sink.borrow_mut().push(tag);
            Ok(true)
        });
        parser.parse(&message).unwrap();
        assert_eq!(*tags.borrow(), vec![8, 9, 35, 10]);
    }

    #[test]
    fn partial_trailing_field_is_left_for_the_next_chunk() {
        let message = wire("8=FIX.4.2|9=13");
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let mut parser = FixParser::new(move |_, _| {
            *sink.borrow_mut() += 1;
            Ok(true)
        });

        let consumed = parser.parse(&message).unwrap();
        assert_eq!(consumed, wire("8=FIX.4.2|").len());
        assert_eq!(*count.borrow(), 1);

        // Caller stitches the tail onto the next chunk.
        let mut rest = message[consumed..].to_vec();
        rest.extend_from_slice(&wire("0|35=D|"));
        let consumed = parser.parse(&rest).unwrap();
        assert_eq!(consumed, rest.len());
        assert_eq!(*count.borrow(), 3);
    }

    #[test]
    fn empty_value_is_delivered_empty() {
        let message = wire("8=|");
        let mut parser = FixParser::new(|tag, value| {
            assert_eq!(tag, 8);
            assert!(value.is_empty());
            Ok(true)
        });
        assert_eq!(parser.parse(&message).unwrap(), message.len());
    }

    #[test]
    fn chunk_with_no_terminator_consumes_nothing() {
        let mut parser = FixParser::new(|_, _| panic!("no complete field here"));
        assert_eq!(parser.parse(b"8=FIX.4").unwrap(), 0);
    }

    #[test]
    fn malformed_tag_is_an_error() {
        let mut parser = FixParser::new(|_, _| Ok(true));
        let err = parser.parse(&wire("8=FIX.4.2|x=1|")).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Grammar(_)));
        assert_eq!(err.offset, 10);

        // A tag with no separator is malformed too.
        let mut parser = FixParser::new(|_, _| Ok(true));
        assert!(parser.parse(&wire("35|")).is_err());
    }

    #[test]
    fn handler_cancel_stops_after_current_field() {
        let message = wire("8=FIX.4.2|9=130|35=D|");
        let mut parser = FixParser::new(|tag, _| Ok(tag != 9));
        let consumed = parser.parse(&message).unwrap();
        assert_eq!(consumed, wire("8=FIX.4.2|9=130|").len());
    }

    #[test]
    fn handler_error_carries_field_offset() {
        let message = wire("8=FIX.4.2|9=130|");
        let mut parser = FixParser::new(|tag, _| {
            if tag == 9 {
                Err("boom".into())
            } else {
                Ok(true)
            }
        });
        let err = parser.parse(&message).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Handler(_)));
        assert_eq!(err.offset, 10);
    }
}
