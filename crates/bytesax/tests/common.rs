//! Shared test support: a writer adapter that re-serialises the callback
//! stream back into JSON text, so tests can compare documents semantically
//! with a reference parser.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use bytesax::JsonParser;

#[derive(Default)]
pub struct JsonWriter {
    out: String,
}

impl JsonWriter {
    fn before_value(&mut self) {
        match self.out.as_bytes().last() {
            None | Some(b'[' | b'{' | b':') => {}
            Some(_) => self.out.push(','),
        }
    }

    fn value(&mut self, text: &str) {
        self.before_value();
        self.out.push_str(text);
    }

    fn key(&mut self, key: &str) {
        if !matches!(self.out.as_bytes().last(), None | Some(b'{')) {
            self.out.push(',');
        }
        self.out
            .push_str(&serde_json::to_string(key).expect("keys are valid"));
        self.out.push(':');
    }

    fn open(&mut self, bracket: char) {
        self.before_value();
        self.out.push(bracket);
    }

    fn close(&mut self, bracket: char) {
        self.out.push(bracket);
    }

    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.out)
    }
}

/// A parser wired to re-serialise everything it sees. Numbers go through the
/// raw handler so their text survives exactly.
pub fn reserializing_parser() -> (JsonParser, Rc<RefCell<JsonWriter>>) {
    let writer = Rc::new(RefCell::new(JsonWriter::default()));

    macro_rules! wired {
        (|$w:ident $(, $arg:ident)*| $body:expr) => {{
            let writer = Rc::clone(&writer);
            move |$($arg),*| {
                let $w = &mut *writer.borrow_mut();
                $body;
                Ok(true)
            }
        }};
    }

    let parser = JsonParser::builder()
        .on_object_start(wired!(|w| w.open('{')))
        .on_object_end(wired!(|w| w.close('}')))
        .on_array_start(wired!(|w| w.open('[')))
        .on_array_end(wired!(|w| w.close(']')))
        .on_object_key(wired!(|w, key| w.key(key)))
        .on_string(wired!(|w, s| {
            let quoted = serde_json::to_string(s).expect("strings are valid");
            w.value(&quoted)
        }))
        .on_boolean(wired!(|w, b| w.value(if b { "true" } else { "false" })))
        .on_null(wired!(|w| w.value("null")))
        .on_raw_number(wired!(|w, text| w.value(text)))
        .build()
        .expect("writer adapter registers handlers");

    (parser, writer)
}

/// Feeds `chunks` through a fresh re-serialising parser and returns the
/// reconstructed document text.
pub fn reserialize(chunks: &[&[u8]]) -> String {
    let (mut parser, writer) = reserializing_parser();
    for chunk in chunks {
        assert!(parser.parse(chunk).unwrap());
    }
    assert!(parser.finish().unwrap());
    let text = writer.borrow_mut().take();
    text
}
