//! Black-box checks of the tape contract: scope cross-references, string
//! buffer framing, serialization round-trips and streaming behavior.

use tape_json::{Document, ErrorType, Parser, TapeType, tape};

fn parse(input: &[u8]) -> Document {
    Parser::default().parse(input).expect("parse failed")
}

fn scope_end(word: u64) -> usize {
    (tape::payload(word) & 0xFFFF_FFFF) as usize
}

/// Every scope opener must point at its closer and the closer back at the
/// opener; two-word numbers are skipped over like a traversal would.
fn check_scope_cross_refs(doc: &Document) {
    assert_eq!(
        TapeType::from_word(doc.tape[0]),
        Some(TapeType::Root),
        "tape must open with a root word"
    );
    let mut i = 0;
    while i < doc.tape.len() {
        let word = doc.tape[i];
        match TapeType::from_word(word).expect("every tape word carries a valid tag") {
            TapeType::Root => {
                if i == 0 {
                    let end = scope_end(word);
                    assert_eq!(end, doc.tape.len() - 1);
                    assert_eq!(TapeType::from_word(doc.tape[end]), Some(TapeType::Root));
                    assert_eq!(tape::payload(doc.tape[end]), 0);
                } else {
                    assert_eq!(i, doc.tape.len() - 1, "root closer must be last");
                }
                i += 1;
            }
            t @ (TapeType::StartObject | TapeType::StartArray) => {
                let end = scope_end(word);
                let closer = doc.tape[end];
                let expected = if t == TapeType::StartObject {
                    TapeType::EndObject
                } else {
                    TapeType::EndArray
                };
                assert_eq!(TapeType::from_word(closer), Some(expected));
                assert_eq!(tape::payload(closer) as usize, i, "closer points back");
                i += 1;
            }
            TapeType::I64 | TapeType::U64 | TapeType::Double => i += 2,
            _ => i += 1,
        }
    }
}

/// Every string payload must point at a length prefix followed by that many
/// body bytes and a NUL.
fn check_string_framing(doc: &Document) {
    let mut i = 0;
    while i < doc.tape.len() {
        let word = doc.tape[i];
        match TapeType::from_word(word).expect("valid tag") {
            TapeType::String => {
                let offset = tape::payload(word) as usize;
                let prefix: [u8; 4] = doc.string_buf[offset..offset + 4]
                    .try_into()
                    .expect("length prefix in bounds");
                let len = u32::from_le_bytes(prefix) as usize;
                assert!(offset + 4 + len < doc.string_buf.len());
                assert_eq!(doc.string_buf[offset + 4 + len], 0, "NUL terminator");
                i += 1;
            }
            TapeType::I64 | TapeType::U64 | TapeType::Double => i += 2,
            _ => i += 1,
        }
    }
}

const CORPUS: &[&str] = &[
    "{}",
    "[]",
    "[1,2,3]",
    r#"{"a":true,"b":null}"#,
    r#"{"a":{"b":[1,"x",{}],"c":-3.5,"d":[[],[null]]}}"#,
    "9",
    "-12.75",
    "18446744073709551615",
    r#""hé\nA""#,
    "[[[[1]]]]",
    r#"[{"id":1,"tags":["a","b"],"ok":true},{"id":2,"tags":[],"ok":false}]"#,
    "true",
    "null",
];

#[test]
fn scope_cross_references_hold() {
    for doc in CORPUS {
        check_scope_cross_refs(&parse(doc.as_bytes()));
    }
}

#[test]
fn string_framing_holds() {
    for doc in CORPUS {
        check_string_framing(&parse(doc.as_bytes()));
    }
}

#[test]
fn serialization_round_trips() {
    for input in CORPUS {
        let first = parse(input.as_bytes());
        let json = first.to_json();
        let second = parse(json.as_bytes());
        assert_eq!(first.tape, second.tape, "tape changed for {input}");
        assert_eq!(
            first.string_buf, second.string_buf,
            "string buffer changed for {input}"
        );
    }
}

#[test]
fn boundary_behaviors() {
    let cases: &[(&[u8], ErrorType)] = &[
        (b"", ErrorType::Empty),
        (b" \t\n", ErrorType::Empty),
        (b"[1,", ErrorType::TapeError),
        (br#"{"a":1"#, ErrorType::TapeError),
        (br#""a\x""#, ErrorType::StringError),
        (b"truez", ErrorType::TrueAtomError),
        (br#"{"a": fals}"#, ErrorType::FalseAtomError),
        // root array whose last structural byte is not `]` fails before
        // any content is parsed
        (b"[1,2}", ErrorType::TapeError),
    ];
    for (input, expected) in cases {
        let got = Parser::default()
            .parse(input)
            .expect_err("must fail")
            .error_type();
        assert_eq!(got, *expected, "input {:?}", String::from_utf8_lossy(input));
    }
}

#[test]
fn depth_limit_is_exact() {
    // the root counts as one scope, so 1022 nested arrays fit in 1024
    let deep_ok = "[".repeat(1022) + &"]".repeat(1022);
    let deep_err = "[".repeat(1023) + &"]".repeat(1023);
    let mut parser = Parser::default();
    assert!(parser.parse(deep_ok.as_bytes()).is_ok());
    assert_eq!(
        parser
            .parse(deep_err.as_bytes())
            .expect_err("too deep")
            .error_type(),
        ErrorType::DepthError
    );
}

#[test]
fn streaming_skips_the_root_array_tail_check() {
    // non-streaming: the buffer's last structural is `}`, not `]`
    assert_eq!(
        Parser::default()
            .parse(b"[1] {}")
            .expect_err("tail check")
            .error_type(),
        ErrorType::TapeError
    );
    // streaming: two well-formed documents
    let mut parser = Parser::default();
    let docs: Vec<_> = parser
        .parse_many(b"[1] {}")
        .expect("stage 1 passes")
        .collect::<Result<_, _>>()
        .expect("both documents parse");
    assert_eq!(docs.len(), 2);
    check_scope_cross_refs(&docs[0]);
    check_scope_cross_refs(&docs[1]);
}

#[test]
fn streaming_advances_the_structural_cursor() {
    let mut parser = Parser::default();
    {
        let mut stream = parser.parse_many(b"{} [1,2] 9").expect("stage 1 passes");
        assert!(stream.next().expect("object").is_ok());
        assert!(stream.next().expect("array").is_ok());
        assert!(stream.next().expect("number").is_ok());
        assert!(stream.next().is_none());
    }
    assert_eq!(parser.error(), ErrorType::Success);
}

#[test]
fn child_counts_match_a_linear_traversal() {
    let doc = parse(br#"{"a":[1,2,3,4],"b":{"x":1},"c":[]}"#);
    let mut i = 0;
    while i < doc.tape.len() {
        let word = doc.tape[i];
        match TapeType::from_word(word).expect("valid tag") {
            t @ (TapeType::StartObject | TapeType::StartArray) => {
                let end = scope_end(word);
                let stored = ((tape::payload(word) >> 32) & 0xFF_FFFF) as usize;
                // count children by hopping over nested scopes
                let mut children = 0;
                let mut j = i + 1;
                while j < end {
                    children += 1;
                    j = match TapeType::from_word(doc.tape[j]).expect("valid tag") {
                        TapeType::StartObject | TapeType::StartArray => {
                            scope_end(doc.tape[j]) + 1
                        }
                        TapeType::I64 | TapeType::U64 | TapeType::Double => j + 2,
                        _ => j + 1,
                    };
                }
                if t == TapeType::StartObject {
                    // pairs are counted once, on the key
                    children /= 2;
                }
                assert_eq!(stored, children, "scope at {i}");
                i += 1;
            }
            TapeType::I64 | TapeType::U64 | TapeType::Double => i += 2,
            _ => i += 1,
        }
    }
}
