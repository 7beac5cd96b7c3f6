//! Round-trip tests: parse a document, re-serialise the callback stream, and
//! compare the result semantically against a reference parser.

mod common;

use common::reserialize;

const CORPUS: &[&str] = &[
    "true",
    "false",
    "null",
    "0",
    "-0",
    "42",
    "\"v1\"",
    "\"\"",
    "{\"k1\": 1, \"k2\": 2}",
    "{\"k1\": \"v1\", \"\": \"v2\"}",
    "[-1, 1, 0, -0]",
    "[9223372036854775807, -9223372036854775808]",
    "{\"k1\": -1.0, \"k2\": 1.0}",
    "[9.223372e+18, 9.223372e-18, 9.223372E+18, 9.223372E-18]",
    "{\"k1\": true, \"k2\": false}",
    "{\"k1\": null}",
    "{\"k1\": {\"k2\": {}}}",
    "[[], [[]]]",
    r#"" \n \t \" \f \r \/ \\ \b ""#,
    r#"{"outer": {"list": [1, 2.5, "three", {"four": [null, true]}], "tail": "s\n"}}"#,
];

fn reference(doc: &str) -> serde_json::Value {
    serde_json::from_str(doc).expect("corpus documents are valid JSON")
}

#[test]
fn whole_document_round_trips() {
    for doc in CORPUS {
        let rebuilt = reserialize(&[doc.as_bytes()]);
        assert_eq!(
            reference(doc),
            reference(&rebuilt),
            "document {doc:?} rebuilt as {rebuilt:?}"
        );
    }
}

#[test]
fn byte_at_a_time_round_trips_identically() {
    for doc in CORPUS {
        let whole = reserialize(&[doc.as_bytes()]);
        let bytes: Vec<&[u8]> = doc.as_bytes().chunks(1).collect();
        let dribbled = reserialize(&bytes);
        assert_eq!(whole, dribbled, "document {doc:?}");
    }
}

#[test]
fn every_split_point_of_a_nested_document() {
    let doc = r#"{"a":[1,2.5,true,null,"sx",{"b":[]}],"c":{}}"#;
    let whole = reserialize(&[doc.as_bytes()]);
    for at in 1..doc.len() {
        let (head, tail) = doc.as_bytes().split_at(at);
        let split = reserialize(&[head, tail]);
        assert_eq!(whole, split, "split at byte {at}");
    }
    assert_eq!(reference(doc), reference(&whole));
}
