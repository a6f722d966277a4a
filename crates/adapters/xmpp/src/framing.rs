//! Splits the inbound byte stream into top-level stanzas.
//!
//! The stream is one long document rooted at `<stream:stream>`. Each direct
//! child of the root is a stanza. [`StanzaFramer`] is a [`Decoder`]: it scans
//! markup lexically, remembers how far it got, and resumes there when more
//! bytes arrive. Parsing a stanza into an element tree happens later, in
//! [`crate::xml`].

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::error::XmppError;

/// Default cap on buffered input without a complete stanza.
pub const DEFAULT_MAX_STANZA_BYTES: usize = 1024 * 1024;

const STREAM_ROOT: &[u8] = b"stream:stream";
const COMMENT: &[u8] = b"<!--";
const CDATA: &[u8] = b"<![CDATA[";

/// A unit cut from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Framed {
    /// The peer opened (or re-opened) the stream.
    Opened,
    /// A complete top-level element.
    Stanza(String),
    /// The peer closed the stream.
    Closed,
}

/// Incremental stanza splitter.
#[derive(Debug)]
pub struct StanzaFramer {
    max: usize,
    /// Offset in the buffer where scanning resumes.
    cursor: usize,
    /// Open elements below the stream root.
    depth: usize,
}

impl Default for StanzaFramer {
    fn default() -> Self {
        Self::with_max(DEFAULT_MAX_STANZA_BYTES)
    }
}

/// One piece of markup starting at a `<`.
enum Markup<'a> {
    /// More bytes are needed to see where it ends.
    Incomplete,
    /// Declaration, processing instruction, comment or CDATA ending at the offset.
    Skip(usize),
    Start {
        name: &'a [u8],
        end: usize,
        empty: bool,
    },
    End {
        name: &'a [u8],
        end: usize,
    },
}

impl StanzaFramer {
    /// Create a framer with the default size cap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a framer that gives up once `max` bytes are pending.
    #[must_use]
    pub fn with_max(max: usize) -> Self {
        Self {
            max,
            cursor: 0,
            depth: 0,
        }
    }

    fn pending(&self, src: &BytesMut) -> Result<Option<Framed>, XmppError> {
        if src.len() > self.max {
            return Err(XmppError::Protocol(format!(
                "{} bytes buffered without a complete stanza",
                src.len()
            )));
        }
        Ok(None)
    }

    fn take_stanza(&mut self, src: &mut BytesMut, end: usize) -> Result<Option<Framed>, XmppError> {
        let bytes = src.split_to(end);
        self.cursor = 0;
        String::from_utf8(bytes.to_vec())
            .map(|stanza| Some(Framed::Stanza(stanza)))
            .map_err(|_| XmppError::Protocol("stanza is not valid UTF-8".to_string()))
    }
}

impl Decoder for StanzaFramer {
    type Item = Framed;
    type Error = XmppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Framed>, XmppError> {
        loop {
            let Some(lt) = find(src, self.cursor, b"<") else {
                if self.depth == 0 {
                    // text between stanzas carries nothing
                    src.clear();
                    self.cursor = 0;
                } else {
                    self.cursor = src.len();
                }
                return self.pending(src);
            };
            if self.depth == 0 && lt > 0 {
                src.advance(lt);
                self.cursor = 0;
                continue;
            }

            match markup(src, lt)? {
                Markup::Incomplete => {
                    self.cursor = lt;
                    return self.pending(src);
                }
                Markup::Skip(end) if self.depth == 0 => {
                    src.advance(end);
                    self.cursor = 0;
                }
                Markup::Skip(end) => self.cursor = end,
                Markup::End { name, end } if self.depth == 0 => {
                    if name != STREAM_ROOT {
                        return Err(XmppError::Protocol(format!(
                            "unexpected </{}> outside a stanza",
                            String::from_utf8_lossy(name)
                        )));
                    }
                    src.advance(end);
                    self.cursor = 0;
                    return Ok(Some(Framed::Closed));
                }
                Markup::End { end, .. } => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        return self.take_stanza(src, end);
                    }
                    self.cursor = end;
                }
                Markup::Start { name, end, empty } if self.depth == 0 => {
                    if name == STREAM_ROOT && !empty {
                        src.advance(end);
                        self.cursor = 0;
                        return Ok(Some(Framed::Opened));
                    }
                    if empty {
                        return self.take_stanza(src, end);
                    }
                    self.depth = 1;
                    self.cursor = end;
                }
                Markup::Start { end, empty, .. } => {
                    if !empty {
                        self.depth += 1;
                    }
                    self.cursor = end;
                }
            }
        }
    }
}

/// Classify the markup starting at `src[lt]`, which is a `<`.
fn markup(src: &[u8], lt: usize) -> Result<Markup<'_>, XmppError> {
    let rest = &src[lt..];
    let Some(&second) = rest.get(1) else {
        return Ok(Markup::Incomplete);
    };
    let skip_until = |from: usize, terminator: &[u8]| {
        find(src, from, terminator).map_or(Markup::Incomplete, |at| Markup::Skip(at + terminator.len()))
    };

    match second {
        b'?' => Ok(skip_until(lt + 2, b"?>")),
        b'!' if rest.starts_with(COMMENT) => Ok(skip_until(lt + COMMENT.len(), b"-->")),
        b'!' if rest.starts_with(CDATA) => Ok(skip_until(lt + CDATA.len(), b"]]>")),
        b'!' if COMMENT.starts_with(rest) || CDATA.starts_with(rest) => Ok(Markup::Incomplete),
        b'!' => Err(XmppError::Protocol(
            "document type declarations are not allowed".to_string(),
        )),
        b'/' => Ok(tag_end(src, lt).map_or(Markup::Incomplete, |end| Markup::End {
            name: tag_name(&src[lt + 2..end - 1]),
            end,
        })),
        _ => Ok(tag_end(src, lt).map_or(Markup::Incomplete, |end| Markup::Start {
            name: tag_name(&src[lt + 1..end - 1]),
            end,
            empty: src[end - 2] == b'/',
        })),
    }
}

/// Offset just past the `>` closing the tag at `lt`, skipping quoted values.
fn tag_end(src: &[u8], lt: usize) -> Option<usize> {
    let mut quote = None;
    for (offset, &byte) in src.get(lt + 1..)?.iter().enumerate() {
        match (quote, byte) {
            (None, b'"' | b'\'') => quote = Some(byte),
            (Some(open), _) if open == byte => quote = None,
            (None, b'>') => return Some(lt + 1 + offset + 1),
            _ => {}
        }
    }
    None
}

fn tag_name(inner: &[u8]) -> &[u8] {
    let end = inner
        .iter()
        .position(|byte| byte.is_ascii_whitespace() || *byte == b'/')
        .unwrap_or(inner.len());
    &inner[..end]
}

fn find(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|at| from + at)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "<?xml version='1.0'?><stream:stream xmlns='jabber:client' xmlns:stream='http://etherx.jabber.org/streams' from='busch-jaeger.de' id='1' version='1.0'>";

    fn decode_all(framer: &mut StanzaFramer, buf: &mut BytesMut) -> Vec<Framed> {
        std::iter::from_fn(|| framer.decode(buf).unwrap()).collect()
    }

    fn stanzas(frames: Vec<Framed>) -> Vec<String> {
        frames
            .into_iter()
            .filter_map(|frame| match frame {
                Framed::Stanza(stanza) => Some(stanza),
                Framed::Opened | Framed::Closed => None,
            })
            .collect()
    }

    fn opened() -> (StanzaFramer, BytesMut) {
        let mut framer = StanzaFramer::new();
        let mut buf = BytesMut::from(HEADER);
        assert_eq!(framer.decode(&mut buf).unwrap(), Some(Framed::Opened));
        (framer, buf)
    }

    #[test]
    fn should_report_stream_open() {
        let mut framer = StanzaFramer::new();
        let mut buf = BytesMut::from(HEADER);
        assert_eq!(decode_all(&mut framer, &mut buf), vec![Framed::Opened]);
        assert!(buf.is_empty());
    }

    #[test]
    fn should_split_consecutive_stanzas() {
        let (mut framer, mut buf) = opened();
        buf.extend_from_slice(
            b"<presence from='mrha@busch-jaeger.de/rpc'/>\n<iq type='result' id='1'><query/></iq>",
        );
        assert_eq!(
            stanzas(decode_all(&mut framer, &mut buf)),
            vec![
                "<presence from='mrha@busch-jaeger.de/rpc'/>".to_string(),
                "<iq type='result' id='1'><query/></iq>".to_string(),
            ]
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn should_wait_for_rest_of_split_stanza() {
        let (mut framer, mut buf) = opened();

        buf.extend_from_slice(b"<iq type='res");
        assert_eq!(framer.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"ult' id='7'><query>");
        assert_eq!(framer.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"</query></iq>");

        assert_eq!(
            framer.decode(&mut buf).unwrap(),
            Some(Framed::Stanza(
                "<iq type='result' id='7'><query></query></iq>".to_string()
            ))
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn should_report_stream_close() {
        let mut framer = StanzaFramer::new();
        let mut buf = BytesMut::from(format!("{HEADER}</stream:stream>").as_str());
        assert_eq!(
            decode_all(&mut framer, &mut buf),
            vec![Framed::Opened, Framed::Closed]
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn should_reject_end_tag_outside_a_stanza() {
        let (mut framer, mut buf) = opened();
        buf.extend_from_slice(b"</message><presence/>");
        assert!(matches!(
            framer.decode(&mut buf),
            Err(XmppError::Protocol(message)) if message.contains("</message>")
        ));
    }

    #[test]
    fn should_skip_comments_and_keep_cdata_inside_stanza() {
        let (mut framer, mut buf) = opened();
        buf.extend_from_slice(
            b"<!-- <ignored> --><message><body><![CDATA[</body> <x>]]></body></message>",
        );
        assert_eq!(
            stanzas(decode_all(&mut framer, &mut buf)),
            vec!["<message><body><![CDATA[</body> <x>]]></body></message>".to_string()]
        );
    }

    #[test]
    fn should_ignore_angle_bracket_in_attribute_value() {
        let (mut framer, mut buf) = opened();
        buf.extend_from_slice(br#"<iq id="a>b" type='get'/>"#);
        assert_eq!(
            framer.decode(&mut buf).unwrap(),
            Some(Framed::Stanza(r#"<iq id="a>b" type='get'/>"#.to_string()))
        );
    }

    #[test]
    fn should_resume_scanning_where_previous_chunk_stopped() {
        let (mut framer, mut buf) = opened();
        buf.extend_from_slice(b"<message><body>");
        buf.extend_from_slice(&[b'a'; 4096]);
        assert_eq!(framer.decode(&mut buf).unwrap(), None);
        assert_eq!(framer.cursor, buf.len());
        assert_eq!(framer.depth, 2);

        buf.extend_from_slice(&[b'a'; 4096]);
        assert_eq!(framer.decode(&mut buf).unwrap(), None);
        assert_eq!(framer.cursor, buf.len());

        buf.extend_from_slice(b"</body></message><presence/>");
        let frames = decode_all(&mut framer, &mut buf);
        assert_eq!(frames.len(), 2);
        assert!(matches!(&frames[0], Framed::Stanza(stanza) if stanza.len() == 8192 + 32));
        assert_eq!(framer.cursor, 0);
        assert_eq!(framer.depth, 0);
    }

    #[test]
    fn should_reject_document_type_declaration() {
        let mut framer = StanzaFramer::new();
        let mut buf = BytesMut::from("<!DOCTYPE stream>");
        assert!(matches!(
            framer.decode(&mut buf),
            Err(XmppError::Protocol(_))
        ));
    }

    #[test]
    fn should_reject_oversized_pending_input() {
        let mut framer = StanzaFramer::with_max(64);
        let mut buf = BytesMut::from(HEADER);
        framer.decode(&mut buf).unwrap();
        buf.extend_from_slice(b"<message><body>");
        assert_eq!(framer.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(&[b'a'; 64]);
        assert!(matches!(
            framer.decode(&mut buf),
            Err(XmppError::Protocol(_))
        ));
    }
}
