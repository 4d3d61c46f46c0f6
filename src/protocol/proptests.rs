//! Property-based tests for the frame scanner
//!
//! However the body is cut into chunks, the records must route the same
//! bytes to the same payloads.

use super::frame::SEPARATOR;
use super::*;
use proptest::prelude::*;

/// Route records into segments: index 0 is the base channel, every payload
/// record starts a new segment and continuations extend the last one.
fn route(chunks: &[&[u8]]) -> Vec<(Option<char>, String)> {
    let mut decoder = Utf8Decoder::new();
    let mut scanner = FrameScanner::new();
    let mut segments: Vec<(Option<char>, String)> = vec![(None, String::new())];

    let mut feed = |text: &str, segments: &mut Vec<(Option<char>, String)>| {
        for record in scanner.scan(text) {
            match record {
                Record::Continuation(data) => {
                    if let Some(last) = segments.last_mut() {
                        last.1.push_str(data);
                    }
                }
                Record::Payload { tag, data } => segments.push((Some(tag.tag()), data.to_string())),
            }
        }
    };

    for chunk in chunks {
        let text = decoder.decode(chunk);
        feed(&text, &mut segments);
    }
    let rest = decoder.finish();
    feed(&rest, &mut segments);
    segments
}

fn arb_tag() -> impl Strategy<Value = char> {
    prop_oneof![
        Just('R'),
        Just('V'),
        Just('S'),
        Just('B'),
        Just('P'),
        Just('E'),
        Just('C'),
        Just('r'),
        Just('x'),
        Just('Y'),
        Just('é'),
    ]
}

fn arb_body() -> impl Strategy<Value = String> {
    (
        "[a-zé ]{0,6}",
        prop::collection::vec((arb_tag(), "[a-zA-Zé€ ]{0,8}"), 0..8),
    )
        .prop_map(|(prefix, records)| {
            let mut body = prefix;
            for (tag, data) in records {
                body.push(SEPARATOR);
                body.push(tag);
                body.push_str(&data);
            }
            body
        })
}

proptest! {
    #[test]
    fn prop_two_chunks_match_one(body in arb_body(), cut in any::<prop::sample::Index>()) {
        let bytes = body.as_bytes();
        let at = cut.index(bytes.len() + 1);
        let (a, b) = bytes.split_at(at);
        prop_assert_eq!(route(&[a, b]), route(&[bytes]));
    }

    #[test]
    fn prop_byte_at_a_time_matches_one(body in arb_body()) {
        let bytes = body.as_bytes();
        let singles: Vec<&[u8]> = bytes.chunks(1).collect();
        prop_assert_eq!(route(&singles), route(&[bytes]));
    }

    #[test]
    fn prop_payload_count_matches_separators(body in arb_body()) {
        let separators = body.matches(SEPARATOR).count();
        let segments = route(&[body.as_bytes()]);
        prop_assert_eq!(segments.len(), separators + 1);
    }
}
