//! The event-driven JSON parser.
//!
//! [`JsonParser`] accepts JSON text as one or more arbitrary byte chunks and
//! invokes the handlers registered on its builder as tokens are recognised.
//! The core is a pull loop over the incremental lexer plus an explicit state
//! stack: no recursion, so nesting depth costs stack entries rather than call
//! frames, and a chunk boundary may fall anywhere, including mid-token.
//!
//! The parser is built for reuse: per-document allocation is limited to
//! growth of the carry buffer, the state stack, and the escape-decode buffer,
//! all of which are retained across [`reset`](JsonParser::reset).

mod builder;
mod carry;
pub(crate) mod error;
mod lexer;
mod numbers;
mod state;
mod unescape;

pub use builder::{HandlerResult, JsonParserBuilder, TopLevelStrategy};
pub use error::{BoxError, BuildError, ErrorKind, LexError, ParseError};

use log::debug;

use crate::window::Window;
use builder::{Handlers, Options};
use lexer::{Lexer, Payload, TokenKind};
use state::{State, StateStack};

/// Sticky failure recorded so later `parse` calls re-raise it until `reset`.
#[derive(Debug, Clone, Copy)]
enum Sticky {
    Grammar(&'static str),
    IntegerOverflow,
    FloatingOverflow,
}

fn payload_bytes<'a>(lexer: &'a Lexer, win: &Window<'a>, payload: Payload) -> &'a [u8] {
    match payload {
        Payload::Chunk { start, len } => win.bytes_at(start, len),
        Payload::Carry { start, len } => lexer.carry_bytes(start, len),
        Payload::None => &[],
    }
}

/// Invokes the handler registered in `$field` (if any) and translates its
/// outcome: continue, cancel (sticky `HandlerCancel`, `Ok(false)`), or fail
/// (sticky `HandlerFailed`, error with cause). A missing handler is a
/// configuration error under `each_token_must_be_handled`.
macro_rules! deliver {
    ($self:ident, $win:ident, $field:ident, $label:literal $(, $arg:expr)*) => {
        let outcome = match $self.handlers.$field.as_mut() {
            Some(h) => Some(h($($arg),*)),
            None => None,
        };
        match outcome {
            Some(Ok(true)) => {}
            Some(Ok(false)) => {
                $self.stack.set(State::HandlerCancel);
                return Ok(false);
            }
            Some(Err(cause)) => {
                $self.stack.set(State::HandlerFailed);
                return Err($self.error_here(ErrorKind::Handler(cause), $win));
            }
            None => {
                if $self.options.each_token_must_be_handled {
                    return Err($self.error_here(
                        ErrorKind::Config(concat!("no handler registered for ", $label)),
                        $win,
                    ));
                }
            }
        }
    };
}

/// Converts a payload to `&str`, or records a lexical error and re-enters
/// the dispatch loop. Reachable only when string validation was disabled.
macro_rules! utf8_text {
    ($self:ident, $bytes:expr) => {
        match std::str::from_utf8($bytes) {
            Ok(text) => text,
            Err(_) => {
                $self.lexer.error = Some(LexError::StringInvalidUtf8);
                $self.stack.set(State::LexicalError);
                continue;
            }
        }
    };
}

/// Streaming, callback-driven JSON parser.
///
/// Feed input with [`parse`](Self::parse) as many times as needed, then call
/// [`finish`](Self::finish) once the document is complete (a trailing number
/// is only terminated by end of input, so `finish` is what flushes it).
/// [`reset`](Self::reset) returns the instance to its freshly-built state
/// for the next document.
pub struct JsonParser {
    lexer: Lexer,
    stack: StateStack,
    handlers: Handlers,
    options: Options,
    /// Reused decode target for strings and keys with escapes.
    decode_buf: String,
    /// Bytes consumed by completed `parse` calls, for error offsets.
    consumed: u64,
    sticky: Option<Sticky>,
}

impl JsonParser {
    pub fn builder() -> JsonParserBuilder {
        JsonParserBuilder::new()
    }

    pub(crate) fn with_parts(options: Options, handlers: Handlers) -> Self {
        Self {
            lexer: Lexer::new(options.allow_comments, options.validate_strings),
            stack: StateStack::new(),
            handlers,
            options,
            decode_buf: String::new(),
            consumed: 0,
            sticky: None,
        }
    }

    /// Parses one chunk. Returns `Ok(true)` when the chunk was consumed
    /// (possibly mid-token; feed the next chunk to continue), `Ok(false)`
    /// when a handler cancelled the parse, and `Err` on any lexical,
    /// grammatical, or handler failure. After a failure or a cancellation
    /// the parser refuses further input until [`reset`](Self::reset).
    pub fn parse(&mut self, chunk: &[u8]) -> Result<bool, ParseError> {
        let mut win = Window::new(chunk);
        let result = self.parse_window(&mut win);
        self.consumed += win.position() as u64;
        result
    }

    /// Signals end of input. Internally feeds one synthetic whitespace byte
    /// to terminate a trailing number, then checks that the document is
    /// complete (unless `allow_partial_values` was set).
    pub fn finish(&mut self) -> Result<bool, ParseError> {
        let mut win = Window::new(b" ");
        if !self.parse_window(&mut win)? {
            return Ok(false);
        }
        match self.stack.top() {
            State::ParseComplete | State::GotValue => Ok(true),
            _ if self.options.allow_partial_values => Ok(true),
            _ => {
                self.stack.set(State::ParseError);
                self.sticky = Some(Sticky::Grammar("premature EOF"));
                Err(ParseError {
                    kind: ErrorKind::Grammar("premature EOF"),
                    offset: self.consumed,
                })
            }
        }
    }

    /// Returns the parser to the state of a freshly built instance (buffer
    /// capacities are retained) and invokes the reset hook, if registered.
    pub fn reset(&mut self) {
        self.lexer.reset();
        self.stack.reset();
        self.sticky = None;
        self.consumed = 0;
        self.decode_buf.clear();
        if let Some(hook) = self.handlers.reset_hook.as_mut() {
            hook();
        }
    }

    fn parse_window(&mut self, win: &mut Window<'_>) -> Result<bool, ParseError> {
        loop {
            match self.stack.top() {
                State::ParseComplete => match self.options.top_level {
                    TopLevelStrategy::AllowMultipleValues => {
                        self.stack.set(State::GotValue);
                    }
                    TopLevelStrategy::AllowTrailingGarbage => return Ok(true),
                    TopLevelStrategy::SingleValue => {
                        if win.remaining() == 0 {
                            return Ok(true);
                        }
                        // Only whitespace may trail the single value; the
                        // lexer consumes it and reports Eof.
                        let lexed = self.lexer.lex(win);
                        if lexed.kind != TokenKind::Eof {
                            return Err(self.grammar_error("trailing garbage", win));
                        }
                    }
                },

                State::LexicalError => {
                    let err = self.lexer.error.unwrap_or(LexError::InvalidChar);
                    return Err(self.error_here(ErrorKind::Lexical(err), win));
                }
                State::ParseError => {
                    let kind = match self.sticky {
                        Some(Sticky::Grammar(msg)) => ErrorKind::Grammar(msg),
                        Some(Sticky::IntegerOverflow) => ErrorKind::IntegerOverflow,
                        Some(Sticky::FloatingOverflow) => ErrorKind::FloatingOverflow,
                        None => ErrorKind::Grammar("parse error"),
                    };
                    return Err(self.error_here(kind, win));
                }
                State::HandlerCancel => {
                    return Err(self.error_here(
                        ErrorKind::Config("parse was cancelled by a handler; reset to continue"),
                        win,
                    ));
                }
                State::HandlerFailed => {
                    return Err(self.error_here(
                        ErrorKind::Config("a handler failed earlier; reset to continue"),
                        win,
                    ));
                }

                // Positions where a value may begin. For containers the
                // current depth's tag is advanced first and the fresh
                // container tag pushed on top.
                State::Start
                | State::GotValue
                | State::MapNeedVal
                | State::ArrayNeedVal
                | State::ArrayStart => {
                    let lexed = self.lexer.lex(win);
                    let mut open_state = None;

                    match lexed.kind {
                        TokenKind::Eof => return Ok(true),
                        TokenKind::Error => {
                            self.stack.set(State::LexicalError);
                            continue;
                        }
                        // Payloads are only materialised when someone will
                        // read them; with no string handler the bytes flow
                        // through untouched.
                        TokenKind::String => {
                            if self.handlers.string.is_some() {
                                let bytes = payload_bytes(&self.lexer, win, lexed.payload);
                                let text = utf8_text!(self, bytes);
                                deliver!(self, win, string, "string values", text);
                            } else if self.options.each_token_must_be_handled {
                                return Err(self.error_here(
                                    ErrorKind::Config("no handler registered for string values"),
                                    win,
                                ));
                            }
                        }
                        TokenKind::StringWithEscapes => {
                            if self.handlers.string.is_some() {
                                let bytes = payload_bytes(&self.lexer, win, lexed.payload);
                                self.decode_buf.clear();
                                if unescape::decode(&mut self.decode_buf, bytes).is_err() {
                                    self.lexer.error = Some(LexError::StringInvalidUtf8);
                                    self.stack.set(State::LexicalError);
                                    continue;
                                }
                                deliver!(
                                    self,
                                    win,
                                    string,
                                    "string values",
                                    self.decode_buf.as_str()
                                );
                            } else if self.options.each_token_must_be_handled {
                                return Err(self.error_here(
                                    ErrorKind::Config("no handler registered for string values"),
                                    win,
                                ));
                            }
                        }
                        TokenKind::Bool => {
                            let bytes = payload_bytes(&self.lexer, win, lexed.payload);
                            let value = bytes.first() == Some(&b't');
                            deliver!(self, win, boolean, "boolean values", value);
                        }
                        TokenKind::Null => {
                            deliver!(self, win, null, "null values");
                        }
                        TokenKind::ObjectOpen => {
                            deliver!(self, win, object_start, "object start");
                            open_state = Some(State::MapStart);
                        }
                        TokenKind::ArrayOpen => {
                            deliver!(self, win, array_start, "array start");
                            open_state = Some(State::ArrayStart);
                        }
                        TokenKind::Integer => {
                            if self.handlers.raw_number.is_some() {
                                let bytes = payload_bytes(&self.lexer, win, lexed.payload);
                                let text = utf8_text!(self, bytes);
                                deliver!(self, win, raw_number, "number values", text);
                            } else if self.handlers.integer.is_some() {
                                let bytes = payload_bytes(&self.lexer, win, lexed.payload);
                                match numbers::parse_integer(bytes) {
                                    Some(value) => {
                                        deliver!(self, win, integer, "integer values", value);
                                    }
                                    None => {
                                        self.stack.set(State::ParseError);
                                        self.sticky = Some(Sticky::IntegerOverflow);
                                        return Err(self.error_at_token(
                                            ErrorKind::IntegerOverflow,
                                            win,
                                            lexed.payload.len(),
                                        ));
                                    }
                                }
                            } else if self.options.each_token_must_be_handled {
                                return Err(self.error_here(
                                    ErrorKind::Config("no handler registered for integer values"),
                                    win,
                                ));
                            }
                        }
                        TokenKind::Double => {
                            if self.handlers.raw_number.is_some() {
                                let bytes = payload_bytes(&self.lexer, win, lexed.payload);
                                let text = utf8_text!(self, bytes);
                                deliver!(self, win, raw_number, "number values", text);
                            } else if self.handlers.floating.is_some() {
                                let bytes = payload_bytes(&self.lexer, win, lexed.payload);
                                match numbers::parse_floating(bytes) {
                                    Some(value) => {
                                        deliver!(self, win, floating, "floating values", value);
                                    }
                                    None => {
                                        self.stack.set(State::ParseError);
                                        self.sticky = Some(Sticky::FloatingOverflow);
                                        return Err(self.error_at_token(
                                            ErrorKind::FloatingOverflow,
                                            win,
                                            lexed.payload.len(),
                                        ));
                                    }
                                }
                            } else if self.options.each_token_must_be_handled {
                                return Err(self.error_here(
                                    ErrorKind::Config("no handler registered for floating values"),
                                    win,
                                ));
                            }
                        }
                        TokenKind::ArrayClose => {
                            if self.stack.top() == State::ArrayStart {
                                deliver!(self, win, array_end, "array end");
                                self.stack.pop();
                                continue;
                            }
                            return Err(
                                self.grammar_error("unallowed token at this point in JSON text", win)
                            );
                        }
                        TokenKind::Colon | TokenKind::Comma | TokenKind::ObjectClose => {
                            return Err(
                                self.grammar_error("unallowed token at this point in JSON text", win)
                            );
                        }
                        TokenKind::Comment => {
                            return Err(self.grammar_error("invalid token, internal error", win));
                        }
                    }

                    // A value was accepted; the transition depends on the
                    // state we were in.
                    match self.stack.top() {
                        State::Start | State::GotValue => self.stack.set(State::ParseComplete),
                        State::MapNeedVal => self.stack.set(State::MapGotVal),
                        _ => self.stack.set(State::ArrayGotVal),
                    }
                    if let Some(open) = open_state {
                        self.stack.push(open);
                    }
                }

                // The only difference between these two: in MapStart a `}`
                // closes the (empty) object, whereas in MapNeedKey a comma
                // was consumed and a key must follow.
                State::MapStart | State::MapNeedKey => {
                    let at_map_start = self.stack.top() == State::MapStart;
                    let lexed = self.lexer.lex(win);
                    match lexed.kind {
                        TokenKind::Eof => return Ok(true),
                        TokenKind::Error => {
                            self.stack.set(State::LexicalError);
                        }
                        TokenKind::String => {
                            if self.handlers.object_key.is_some() {
                                let bytes = payload_bytes(&self.lexer, win, lexed.payload);
                                let text = utf8_text!(self, bytes);
                                deliver!(self, win, object_key, "object keys", text);
                            } else if self.options.each_token_must_be_handled {
                                return Err(self.error_here(
                                    ErrorKind::Config("no handler registered for object keys"),
                                    win,
                                ));
                            }
                            self.stack.set(State::MapSep);
                        }
                        TokenKind::StringWithEscapes => {
                            if self.handlers.object_key.is_some() {
                                let bytes = payload_bytes(&self.lexer, win, lexed.payload);
                                self.decode_buf.clear();
                                if unescape::decode(&mut self.decode_buf, bytes).is_err() {
                                    self.lexer.error = Some(LexError::StringInvalidUtf8);
                                    self.stack.set(State::LexicalError);
                                    continue;
                                }
                                deliver!(
                                    self,
                                    win,
                                    object_key,
                                    "object keys",
                                    self.decode_buf.as_str()
                                );
                            } else if self.options.each_token_must_be_handled {
                                return Err(self.error_here(
                                    ErrorKind::Config("no handler registered for object keys"),
                                    win,
                                ));
                            }
                            self.stack.set(State::MapSep);
                        }
                        TokenKind::ObjectClose if at_map_start => {
                            deliver!(self, win, object_end, "object end");
                            self.stack.pop();
                        }
                        _ => {
                            return Err(
                                self.grammar_error("invalid object key (must be a string)", win)
                            );
                        }
                    }
                }

                State::MapSep => {
                    let lexed = self.lexer.lex(win);
                    match lexed.kind {
                        TokenKind::Colon => self.stack.set(State::MapNeedVal),
                        TokenKind::Eof => return Ok(true),
                        TokenKind::Error => self.stack.set(State::LexicalError),
                        _ => {
                            return Err(self.grammar_error(
                                "object key and value must be separated by a colon (':')",
                                win,
                            ));
                        }
                    }
                }

                State::MapGotVal => {
                    let lexed = self.lexer.lex(win);
                    match lexed.kind {
                        TokenKind::ObjectClose => {
                            deliver!(self, win, object_end, "object end");
                            self.stack.pop();
                        }
                        TokenKind::Comma => self.stack.set(State::MapNeedKey),
                        TokenKind::Eof => return Ok(true),
                        TokenKind::Error => self.stack.set(State::LexicalError),
                        _ => {
                            const MSG: &str = "after key and value, inside map, expected ',' or '}'";
                            self.stack.set(State::ParseError);
                            self.sticky = Some(Sticky::Grammar(MSG));
                            return Err(self.error_at_token(
                                ErrorKind::Grammar(MSG),
                                win,
                                lexed.payload.len(),
                            ));
                        }
                    }
                }

                State::ArrayGotVal => {
                    let lexed = self.lexer.lex(win);
                    match lexed.kind {
                        TokenKind::ArrayClose => {
                            deliver!(self, win, array_end, "array end");
                            self.stack.pop();
                        }
                        TokenKind::Comma => self.stack.set(State::ArrayNeedVal),
                        TokenKind::Eof => return Ok(true),
                        TokenKind::Error => self.stack.set(State::LexicalError),
                        _ => {
                            return Err(self.grammar_error(
                                "after array element, expected ',' or ']'",
                                win,
                            ));
                        }
                    }
                }
            }
        }
    }

    fn error_here(&self, kind: ErrorKind, win: &Window<'_>) -> ParseError {
        ParseError {
            kind,
            offset: self.consumed + win.position() as u64,
        }
    }

    /// Error positioned at the start of the offending token (best effort:
    /// when the token began in an earlier chunk the chunk start is used).
    fn error_at_token(&self, kind: ErrorKind, win: &Window<'_>, token_len: usize) -> ParseError {
        let pos = win.position();
        let start = pos.saturating_sub(token_len);
        ParseError {
            kind,
            offset: self.consumed + start as u64,
        }
    }

    fn grammar_error(&mut self, msg: &'static str, win: &Window<'_>) -> ParseError {
        debug!("parse error: {msg}");
        self.stack.set(State::ParseError);
        self.sticky = Some(Sticky::Grammar(msg));
        ParseError {
            kind: ErrorKind::Grammar(msg),
            offset: self.consumed + win.position() as u64,
        }
    }
}
