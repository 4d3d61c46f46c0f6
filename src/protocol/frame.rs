//! Incremental scanning of the response body into records

use super::PayloadType;

/// Record separator. Payload content is never escaped, so the server must
/// never emit this character inside a payload.
pub const SEPARATOR: char = '\0';

/// One record of a scanned chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record<'a> {
    /// Data for whatever channel is currently on top of the stack
    Continuation(&'a str),
    /// Start of a new payload
    Payload { tag: PayloadType, data: &'a str },
}

/// Splits text chunks of the response body into records.
///
/// Chunks may end anywhere. The only state carried between chunks is a
/// separator that ended the previous chunk: its tag is the first character
/// of the next non-empty chunk.
#[derive(Debug, Default)]
pub struct FrameScanner {
    pending_tag: bool,
}

impl FrameScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan one chunk. The returned iterator is lazy and borrows the chunk.
    pub fn scan<'a>(&mut self, chunk: &'a str) -> Records<'a> {
        if chunk.is_empty() {
            return Records {
                pieces: None,
                first: true,
                leading_tag: self.pending_tag,
            };
        }

        let leading_tag = self.pending_tag;
        let body = match chunk.strip_suffix(SEPARATOR) {
            Some(body) => {
                self.pending_tag = true;
                body
            }
            None => {
                self.pending_tag = false;
                chunk
            }
        };

        Records {
            pieces: Some(body.split(SEPARATOR)),
            first: true,
            leading_tag,
        }
    }

    /// Call once at end of body. Returns true if the body ended with a
    /// separator whose tag never arrived.
    pub fn finish(&mut self) -> bool {
        std::mem::take(&mut self.pending_tag)
    }
}

/// Records of a single chunk, in stream order
#[derive(Debug)]
pub struct Records<'a> {
    pieces: Option<std::str::Split<'a, char>>,
    first: bool,
    leading_tag: bool,
}

impl<'a> Iterator for Records<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Record<'a>> {
        let piece = self.pieces.as_mut()?.next()?;
        let first = std::mem::replace(&mut self.first, false);

        if first && !self.leading_tag {
            return Some(Record::Continuation(piece));
        }

        let mut chars = piece.chars();
        let tag = match chars.next() {
            Some(tag) => PayloadType::from_tag(tag),
            // Two separators in a row still close the top channel
            None => {
                tracing::debug!("Empty record, popping top channel");
                PayloadType::Pop
            }
        };
        Some(Record::Payload {
            tag,
            data: chars.as_str(),
        })
    }
}

/// Decodes a byte stream as UTF-8, carrying incomplete sequences over to
/// the next chunk. Invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    carry: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.carry.extend_from_slice(bytes);
        let mut out = String::with_capacity(self.carry.len());

        loop {
            match std::str::from_utf8(&self.carry) {
                Ok(text) => {
                    out.push_str(text);
                    self.carry.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.carry[..valid]));
                    match e.error_len() {
                        // Incomplete sequence at the end: wait for more bytes
                        None => {
                            self.carry.drain(..valid);
                            return out;
                        }
                        Some(len) => {
                            tracing::warn!(bytes = len, "Replacing invalid UTF-8 in response body");
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.carry.drain(..valid + len);
                        }
                    }
                }
            }
        }
    }

    /// Flush whatever is left at end of body.
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.carry).into_owned();
        self.carry.clear();
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(scanner: &mut FrameScanner, chunk: &'static str) -> Vec<Record<'static>> {
        scanner.scan(chunk).collect()
    }

    #[test]
    fn test_single_chunk() {
        let mut scanner = FrameScanner::new();
        let records = scan_all(&mut scanner, "hello\0Sworld");
        assert_eq!(
            records,
            vec![
                Record::Continuation("hello"),
                Record::Payload {
                    tag: PayloadType::Search,
                    data: "world"
                },
            ]
        );
        assert!(!scanner.finish());
    }

    #[test]
    fn test_leading_separator_yields_empty_continuation() {
        let mut scanner = FrameScanner::new();
        let records = scan_all(&mut scanner, "\0x");
        assert_eq!(
            records,
            vec![
                Record::Continuation(""),
                Record::Payload {
                    tag: PayloadType::FollowUp,
                    data: ""
                },
            ]
        );
    }

    #[test]
    fn test_separator_at_chunk_end_carries_tag() {
        let mut scanner = FrameScanner::new();
        assert_eq!(
            scan_all(&mut scanner, "hello\0"),
            vec![Record::Continuation("hello")]
        );
        // Empty chunks keep the pending tag
        assert!(scan_all(&mut scanner, "").is_empty());
        assert_eq!(
            scan_all(&mut scanner, "Bhttps://example.com"),
            vec![Record::Payload {
                tag: PayloadType::Browse,
                data: "https://example.com"
            }]
        );
    }

    #[test]
    fn test_empty_record_is_a_pop() {
        let mut scanner = FrameScanner::new();
        let records = scan_all(&mut scanner, "a\0\0Vxyz");
        assert_eq!(
            records,
            vec![
                Record::Continuation("a"),
                Record::Payload {
                    tag: PayloadType::Pop,
                    data: ""
                },
                Record::Payload {
                    tag: PayloadType::Voice,
                    data: "xyz"
                },
            ]
        );
    }

    #[test]
    fn test_dangling_separator_reported_on_finish() {
        let mut scanner = FrameScanner::new();
        let _ = scan_all(&mut scanner, "done\0");
        assert!(scanner.finish());
        assert!(!scanner.finish());
    }

    #[test]
    fn test_decoder_carries_split_code_point() {
        let bytes = "héllo".as_bytes();
        let mut decoder = Utf8Decoder::new();
        let first = decoder.decode(&bytes[..2]);
        let second = decoder.decode(&bytes[2..]);
        assert_eq!(first, "h");
        assert_eq!(second, "éllo");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
    }

    #[test]
    fn test_decoder_flushes_truncated_tail() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[b'a', 0xE2, 0x82]), "a");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }
}
