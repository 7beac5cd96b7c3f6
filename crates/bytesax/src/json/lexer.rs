//! Incremental JSON token scanner.
//!
//! The lexer consumes bytes from the caller's chunk window and emits one
//! token per call, transparently handling chunk boundaries that fall in the
//! middle of a token: when the window runs out mid-token, the consumed prefix
//! is appended to the carry buffer and `Eof` is returned; the next call
//! rescans the token from the carry first, then continues into the new
//! window. Payloads are addressed either inside the caller's window (the
//! zero-copy fast path) or inside the carry when the token straddled chunks.
//!
//! Whitespace and comments are skipped here and never reach the parser.

use log::{debug, trace};

use super::carry::Carry;
use super::error::LexError;
use crate::window::Window;

/// Valid escaped control char. The solidus `/` may be escaped or not.
const VEC: u8 = 0x01;
/// Invalid JSON char.
const IJC: u8 = 0x02;
/// Valid hex char.
const VHC: u8 = 0x04;
/// Needs further processing (from a string scanning perspective).
const NFP: u8 = 0x08;
/// Needs UTF-8 checking when enabled (from a string scanning perspective).
const NUC: u8 = 0x10;

/// Per-byte classification backing the string scan inner loop and escape
/// validation.
static CHAR_CLASS: [u8; 256] = build_char_class();

const fn build_char_class() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 0x20 {
        table[i] = IJC;
        i += 1;
    }
    table[b'"' as usize] = NFP | VEC | IJC;
    table[b'\\' as usize] = NFP | VEC | IJC;
    table[b'/' as usize] = VEC;
    let mut c = b'0';
    while c <= b'9' {
        table[c as usize] = VHC;
        c += 1;
    }
    c = b'A';
    while c <= b'F' {
        table[c as usize] = VHC;
        c += 1;
    }
    c = b'a';
    while c <= b'f' {
        table[c as usize] = VHC;
        c += 1;
    }
    table[b'b' as usize] |= VEC;
    table[b'f' as usize] |= VEC;
    table[b'n' as usize] = VEC;
    table[b'r' as usize] = VEC;
    table[b't' as usize] = VEC;
    let mut b = 0x80;
    while b <= 0xFF {
        table[b] = NUC;
        if b == 0xFF {
            break;
        }
        b += 1;
    }
    table
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    ObjectOpen,
    ObjectClose,
    ArrayOpen,
    ArrayClose,
    Comma,
    Colon,
    Bool,
    Null,
    Integer,
    Double,
    String,
    StringWithEscapes,
    Eof,
    Error,
    /// Consumed internally; never returned to the parser.
    Comment,
}

/// Where a token's payload bytes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Payload {
    None,
    Chunk { start: usize, len: usize },
    Carry { start: usize, len: usize },
}

impl Payload {
    pub(crate) fn len(self) -> usize {
        match self {
            Payload::None => 0,
            Payload::Chunk { len, .. } | Payload::Carry { len, .. } => len,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Lexed {
    pub(crate) kind: TokenKind,
    pub(crate) payload: Payload,
}

enum Utf8Scan {
    Accept,
    Eof,
    Invalid,
}

pub(crate) struct Lexer {
    /// Holds the partial prefix of a token spread over multiple chunks.
    carry: Carry,
    carry_in_use: bool,
    allow_comments: bool,
    validate_utf8: bool,
    pub(crate) error: Option<LexError>,
}

impl Lexer {
    pub(crate) fn new(allow_comments: bool, validate_utf8: bool) -> Self {
        Self {
            carry: Carry::new(),
            carry_in_use: false,
            allow_comments,
            validate_utf8,
            error: None,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.carry.clear();
        self.carry_in_use = false;
        self.error = None;
    }

    #[inline]
    pub(crate) fn carry_bytes(&self, start: usize, len: usize) -> &[u8] {
        self.carry.bytes_at(start, len)
    }

    /// Reads one byte, serving the carry first while a resumed token is being
    /// rescanned, then the window.
    #[inline]
    fn read_byte(&mut self, win: &mut Window<'_>) -> u8 {
        if self.carry_in_use && self.carry.remaining() > 0 {
            self.carry.read_byte()
        } else {
            win.read_byte()
        }
    }

    /// Backs up over the last byte read. Number lexing reads one byte past
    /// the literal; keyword and escape validation back up to the offending
    /// byte.
    #[inline]
    fn unread_byte(&mut self, win: &mut Window<'_>) {
        if win.position() > 0 {
            win.set_position(win.position() - 1);
        } else {
            self.carry.step_back();
        }
    }

    /// Skips the run of string bytes that need no further review, in whatever
    /// source the cursor currently sits in. The class mask folds in the UTF-8
    /// bit only when validation is on, so the common case is one table load
    /// per byte.
    fn string_scan(&mut self, win: &mut Window<'_>) {
        let mask = IJC | NFP | if self.validate_utf8 { NUC } else { 0 };
        if self.carry_in_use && self.carry.remaining() > 0 {
            while self.carry.remaining() > 0 && CHAR_CLASS[self.carry.peek() as usize] & mask == 0
            {
                self.carry.skip(1);
            }
        } else {
            while win.remaining() > 0 && CHAR_CLASS[win.peek() as usize] & mask == 0 {
                win.advance(1);
            }
        }
    }

    /// Validates one variable-length UTF-8 sequence whose first byte has
    /// already been read. Stray continuation bytes and truncated sequences
    /// are rejected.
    fn scan_utf8_tail(&mut self, win: &mut Window<'_>, first: u8) -> Utf8Scan {
        let continuations = if first <= 0x7F {
            return Utf8Scan::Accept;
        } else if first >> 5 == 0b110 {
            1
        } else if first >> 4 == 0b1110 {
            2
        } else if first >> 3 == 0b11110 {
            3
        } else {
            return Utf8Scan::Invalid;
        };
        for _ in 0..continuations {
            if win.remaining() == 0 {
                return Utf8Scan::Eof;
            }
            let c = self.read_byte(win);
            if c >> 6 != 0b10 {
                return Utf8Scan::Invalid;
            }
        }
        Utf8Scan::Accept
    }

    /// Scans a string after the opening quote. Returns `String` with the
    /// cursor past the terminating quote, `Eof` if the window ran out first,
    /// or `Error` with the cursor backed up to the offending byte.
    fn lex_string(&mut self, win: &mut Window<'_>) -> TokenKind {
        let mut tok = TokenKind::Error;
        let mut has_escapes = false;

        'scan: loop {
            self.string_scan(win);

            if win.remaining() == 0 {
                tok = TokenKind::Eof;
                break;
            }
            let c = self.read_byte(win);

            if c == b'"' {
                tok = TokenKind::String;
                break;
            } else if c == b'\\' {
                has_escapes = true;
                if win.remaining() == 0 {
                    tok = TokenKind::Eof;
                    break;
                }
                let c = self.read_byte(win);
                if c == b'u' {
                    for _ in 0..4 {
                        if win.remaining() == 0 {
                            tok = TokenKind::Eof;
                            break 'scan;
                        }
                        let c = self.read_byte(win);
                        if CHAR_CLASS[c as usize] & VHC == 0 {
                            self.unread_byte(win);
                            self.error = Some(LexError::StringInvalidHexChar);
                            break 'scan;
                        }
                    }
                } else if CHAR_CLASS[c as usize] & VEC == 0 {
                    self.unread_byte(win);
                    self.error = Some(LexError::StringInvalidEscapedChar);
                    break;
                }
            } else if CHAR_CLASS[c as usize] & IJC != 0 {
                self.unread_byte(win);
                self.error = Some(LexError::StringInvalidJsonChar);
                break;
            } else if self.validate_utf8 {
                match self.scan_utf8_tail(win, c) {
                    Utf8Scan::Accept => {}
                    Utf8Scan::Eof => {
                        tok = TokenKind::Eof;
                        break;
                    }
                    Utf8Scan::Invalid => {
                        self.error = Some(LexError::StringInvalidUtf8);
                        break;
                    }
                }
            }
        }

        if has_escapes && tok == TokenKind::String {
            tok = TokenKind::StringWithEscapes;
        }
        tok
    }

    /// Scans a number. Numbers are the only tokens that must be read one
    /// byte beyond the literal to know they are complete; the terminator is
    /// pushed back before returning.
    fn lex_number(&mut self, win: &mut Window<'_>) -> TokenKind {
        let mut tok = TokenKind::Integer;

        if win.remaining() == 0 {
            return TokenKind::Eof;
        }
        let mut c = self.read_byte(win);

        if c == b'-' {
            if win.remaining() == 0 {
                return TokenKind::Eof;
            }
            c = self.read_byte(win);
        }

        if c == b'0' {
            if win.remaining() == 0 {
                return TokenKind::Eof;
            }
            c = self.read_byte(win);
        } else if c.is_ascii_digit() {
            loop {
                if win.remaining() == 0 {
                    return TokenKind::Eof;
                }
                c = self.read_byte(win);
                if !c.is_ascii_digit() {
                    break;
                }
            }
        } else {
            self.unread_byte(win);
            self.error = Some(LexError::MissingIntegerAfterMinus);
            return TokenKind::Error;
        }

        if c == b'.' {
            let mut read_some = false;
            if win.remaining() == 0 {
                return TokenKind::Eof;
            }
            c = self.read_byte(win);
            while c.is_ascii_digit() {
                read_some = true;
                if win.remaining() == 0 {
                    return TokenKind::Eof;
                }
                c = self.read_byte(win);
            }
            if !read_some {
                self.unread_byte(win);
                self.error = Some(LexError::MissingIntegerAfterDecimal);
                return TokenKind::Error;
            }
            tok = TokenKind::Double;
        }

        if c == b'e' || c == b'E' {
            if win.remaining() == 0 {
                return TokenKind::Eof;
            }
            c = self.read_byte(win);
            if c == b'+' || c == b'-' {
                if win.remaining() == 0 {
                    return TokenKind::Eof;
                }
                c = self.read_byte(win);
            }
            if c.is_ascii_digit() {
                loop {
                    if win.remaining() == 0 {
                        return TokenKind::Eof;
                    }
                    c = self.read_byte(win);
                    if !c.is_ascii_digit() {
                        break;
                    }
                }
            } else {
                self.unread_byte(win);
                self.error = Some(LexError::MissingIntegerAfterExponent);
                return TokenKind::Error;
            }
            tok = TokenKind::Double;
        }

        // We always read one too far.
        self.unread_byte(win);
        tok
    }

    /// Consumes a `//` line comment or `/* */` block comment after the
    /// opening slash.
    fn lex_comment(&mut self, win: &mut Window<'_>) -> TokenKind {
        if win.remaining() == 0 {
            return TokenKind::Eof;
        }
        let c = self.read_byte(win);

        if c == b'/' {
            loop {
                if win.remaining() == 0 {
                    return TokenKind::Eof;
                }
                if self.read_byte(win) == b'\n' {
                    break;
                }
            }
        } else if c == b'*' {
            loop {
                if win.remaining() == 0 {
                    return TokenKind::Eof;
                }
                if self.read_byte(win) == b'*' {
                    if win.remaining() == 0 {
                        return TokenKind::Eof;
                    }
                    if self.read_byte(win) == b'/' {
                        break;
                    }
                    self.unread_byte(win);
                }
            }
        } else {
            self.error = Some(LexError::InvalidChar);
            return TokenKind::Error;
        }
        TokenKind::Comment
    }

    /// Emits the next token from `carry ++ window`.
    ///
    /// On `Eof` the unfinished token's consumed prefix has been appended to
    /// the carry and the window is exhausted; the next call resumes
    /// transparently. Keywords (`true`/`false`/`null`) are matched
    /// byte-by-byte; on mismatch the cursor backs up one byte and `Error` is
    /// returned with [`LexError::InvalidString`].
    pub(crate) fn lex(&mut self, win: &mut Window<'_>) -> Lexed {
        let mut start_offset = win.position();
        let tok;

        'lexing: loop {
            if win.remaining() == 0 {
                tok = TokenKind::Eof;
                break;
            }
            let c = self.read_byte(win);

            match c {
                b'{' => {
                    tok = TokenKind::ObjectOpen;
                    break 'lexing;
                }
                b'}' => {
                    tok = TokenKind::ObjectClose;
                    break 'lexing;
                }
                b'[' => {
                    tok = TokenKind::ArrayOpen;
                    break 'lexing;
                }
                b']' => {
                    tok = TokenKind::ArrayClose;
                    break 'lexing;
                }
                b',' => {
                    tok = TokenKind::Comma;
                    break 'lexing;
                }
                b':' => {
                    tok = TokenKind::Colon;
                    break 'lexing;
                }
                b'\t' | b'\n' | 0x0B | 0x0C | b'\r' | b' ' => {
                    // Whitespace advances the token start so that on Eof only
                    // unlexed token bytes enter the carry.
                    start_offset += 1;
                }
                b't' | b'f' | b'n' => {
                    let rest: &[u8] = match c {
                        b't' => b"rue",
                        b'f' => b"alse",
                        _ => b"ull",
                    };
                    for &want in rest {
                        if win.remaining() == 0 {
                            tok = TokenKind::Eof;
                            break 'lexing;
                        }
                        let c = self.read_byte(win);
                        if c != want {
                            self.unread_byte(win);
                            self.error = Some(LexError::InvalidString);
                            tok = TokenKind::Error;
                            break 'lexing;
                        }
                    }
                    tok = if c == b'n' {
                        TokenKind::Null
                    } else {
                        TokenKind::Bool
                    };
                    break 'lexing;
                }
                b'"' => {
                    tok = self.lex_string(win);
                    break 'lexing;
                }
                b'-' | b'0'..=b'9' => {
                    // Number scanning wants to start from the first byte.
                    self.unread_byte(win);
                    tok = self.lex_number(win);
                    break 'lexing;
                }
                b'/' => {
                    if !self.allow_comments {
                        self.unread_byte(win);
                        self.error = Some(LexError::UnallowedComment);
                        tok = TokenKind::Error;
                        break 'lexing;
                    }
                    let comment = self.lex_comment(win);
                    if comment == TokenKind::Comment {
                        self.carry.clear();
                        self.carry_in_use = false;
                        start_offset = win.position();
                        continue 'lexing;
                    }
                    tok = comment;
                    break 'lexing;
                }
                _ => {
                    self.error = Some(LexError::InvalidChar);
                    tok = TokenKind::Error;
                    break 'lexing;
                }
            }
        }

        let mut payload = Payload::None;

        // Append to the carry if it is already engaged or the token ran off
        // the end of the window.
        if tok == TokenKind::Eof || self.carry_in_use {
            if !self.carry_in_use {
                self.carry.clear();
                self.carry_in_use = true;
            }
            self.carry
                .append(win.bytes_at(start_offset, win.position() - start_offset));
            self.carry.rewind();

            if tok != TokenKind::Eof {
                payload = Payload::Carry {
                    start: 0,
                    len: self.carry.len(),
                };
                self.carry_in_use = false;
            }
        } else if tok != TokenKind::Error {
            payload = Payload::Chunk {
                start: start_offset,
                len: win.position() - start_offset,
            };
        }

        // Strings: the payload excludes the surrounding quotes.
        if tok == TokenKind::String || tok == TokenKind::StringWithEscapes {
            payload = match payload {
                Payload::Chunk { start, len } => Payload::Chunk {
                    start: start + 1,
                    len: len - 2,
                },
                Payload::Carry { start, len } => Payload::Carry {
                    start: start + 1,
                    len: len - 2,
                },
                Payload::None => Payload::None,
            };
        }

        match tok {
            TokenKind::Error => debug!("lexical error: {:?}", self.error),
            TokenKind::Eof => trace!("end of chunk, {} byte(s) carried", self.carry.len()),
            _ => trace!("lexed {tok:?}"),
        }

        Lexed { kind: tok, payload }
    }
}
