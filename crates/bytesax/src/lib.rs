//! Event-driven (SAX-style) parsing of JSON and FIX over byte chunks.
//!
//! The JSON side turns a stream of arbitrarily-split byte chunks into handler
//! invocations (object/array begin/end, keys, strings, numbers, booleans,
//! nulls) without ever building a value tree. Chunk boundaries may fall
//! anywhere, including in the middle of a token; an internal carry buffer
//! stitches the pieces back together, and tokens that fit entirely inside a
//! chunk are delivered as zero-copy borrowed views. Parsers are built once
//! and reused across documents via [`JsonParser::reset`], with negligible
//! per-document allocation.
//!
//! ```
//! use bytesax::JsonParser;
//!
//! let mut parser = JsonParser::builder()
//!     .each_token_must_be_handled(false)
//!     .on_object_key(|key| {
//!         println!("key: {key}");
//!         Ok(true)
//!     })
//!     .on_integer(|n| Ok(n >= 0))
//!     .build()
//!     .unwrap();
//!
//! // The same document, fed in two pieces split mid-token.
//! parser.parse(br#"{"answ"#).unwrap();
//! parser.parse(br#"er": 42}"#).unwrap();
//! parser.finish().unwrap();
//! ```
//!
//! The FIX side ([`FixParser`]) applies the same delivery contract to
//! `tag=value\x01` field framing: zero-copy value slices, partial trailing
//! fields left for the next chunk.

mod fix;
mod json;
mod window;

pub use fix::FixParser;
pub use json::{
    BoxError, BuildError, ErrorKind, HandlerResult, JsonParser, JsonParserBuilder, LexError,
    ParseError, TopLevelStrategy,
};
