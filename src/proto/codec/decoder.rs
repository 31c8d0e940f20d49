use bytes::{Buf, BytesMut};

use crate::proto::error::{Error, Result};
use crate::proto::frame::Frame;

const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024; // 512 MB default

/// Deepest array nesting accepted in a reply.
pub const MAX_NESTING_DEPTH: usize = 512;

/// An array whose elements are still arriving.
#[derive(Debug)]
struct PartialArray {
    remaining: usize,
    items: Vec<Frame>,
}

/// One decoded token: a complete scalar frame or the header of an array.
enum Element {
    Frame(Frame),
    ArrayStart(usize),
}

/// A RESP decoder that converts bytes to [`Frame`] values.
///
/// The decoder handles streaming input. Call [`append`](Decoder::append) to
/// add data, then [`decode`](Decoder::decode) to parse frames. Returns
/// `Ok(None)` when more data is needed.
///
/// Array elements are taken off the buffer as soon as each one is complete
/// and parked on an explicit stack, so a large reply arriving in many reads
/// is parsed once, and deep nesting cannot exhaust the call stack.
///
/// # Example
///
/// ```
/// use muxpipe::proto::codec::Decoder;
/// use muxpipe::proto::frame::Frame;
///
/// let mut decoder = Decoder::new();
/// decoder.append(b"+OK\r\n");
/// let frame = decoder.decode().unwrap().unwrap();
/// assert_eq!(frame, Frame::SimpleString(b"OK".to_vec()));
/// ```
#[derive(Debug)]
pub struct Decoder {
    buf: BytesMut,
    max_frame_size: usize,
    stack: Vec<PartialArray>,
    // bytes of the current reply already moved onto `stack`
    consumed: usize,
}

impl Decoder {
    /// Creates a new decoder with an empty buffer.
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Creates a new decoder with a custom maximum frame size.
    ///
    /// # Arguments
    ///
    /// * `max_frame_size` - Maximum size in bytes for a single frame
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_frame_size,
            stack: Vec::new(),
            consumed: 0,
        }
    }

    /// Appends raw bytes to the internal buffer.
    ///
    /// Buffer size limits are checked during decode, not append.
    pub fn append(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Returns the number of received bytes not yet returned as a frame,
    /// including the already parsed part of an incomplete array.
    pub fn buffered(&self) -> usize {
        self.buf.len() + self.consumed
    }

    /// Attempts to decode one frame from the buffer.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(frame))` - a complete frame was decoded
    /// * `Ok(None)` - more data is needed
    /// * `Err(_)` - the data is malformed, too large or nested too deeply
    ///
    /// After an error the stream is out of sync and the connection must be
    /// discarded.
    pub fn decode(&mut self) -> Result<Option<Frame>> {
        loop {
            if self.buffered() > self.max_frame_size {
                return Err(Error::protocol("buffer size exceeded maximum frame size"));
            }

            let mut frame = match self.next_element()? {
                None => return Ok(None),
                Some(Element::Frame(frame)) => frame,
                Some(Element::ArrayStart(0)) => Frame::Array(Vec::new()),
                Some(Element::ArrayStart(len)) => {
                    if self.stack.len() >= MAX_NESTING_DEPTH {
                        return Err(Error::protocol(format!(
                            "array nesting deeper than {} levels",
                            MAX_NESTING_DEPTH
                        )));
                    }
                    self.stack.push(PartialArray {
                        remaining: len,
                        items: Vec::with_capacity(len.min(1024)),
                    });
                    continue;
                }
            };

            // fold the finished element into its parents
            loop {
                let Some(top) = self.stack.last_mut() else {
                    self.consumed = 0;
                    return Ok(Some(frame));
                };
                top.items.push(frame);
                top.remaining -= 1;
                if top.remaining > 0 {
                    break;
                }
                let items = self.stack.pop().map(|a| a.items).unwrap_or_default();
                frame = Frame::Array(items);
            }
        }
    }

    /// Takes one scalar frame or array header off the front of the buffer.
    /// Nothing is consumed when it is incomplete.
    fn next_element(&mut self) -> Result<Option<Element>> {
        let Some(&tag) = self.buf.first() else {
            return Ok(None);
        };
        let Some(line_len) = find_crlf(&self.buf[1..]) else {
            return Ok(None);
        };
        let header = line_len + 3;
        let line = &self.buf[1..1 + line_len];

        let element = match tag {
            b'+' => Element::Frame(Frame::SimpleString(line.to_vec())),
            b'-' => Element::Frame(Frame::Error(line.to_vec())),
            b':' => Element::Frame(Frame::Integer(parse_int(line)?)),
            b'$' => {
                let len = parse_int(line)?;
                if len == -1 {
                    Element::Frame(Frame::Null)
                } else {
                    let len = self.checked_len(len, "bulk string")?;
                    if self.buf.len() < header + len + 2 {
                        return Ok(None);
                    }
                    if &self.buf[header + len..header + len + 2] != b"\r\n" {
                        return Err(Error::protocol("bulk string not terminated by CRLF"));
                    }
                    self.consume(header);
                    let data = self.buf.split_to(len).freeze();
                    self.consumed += len;
                    self.consume(2);
                    return Ok(Some(Element::Frame(Frame::BulkString(data))));
                }
            }
            b'*' => {
                let len = parse_int(line)?;
                if len == -1 {
                    Element::Frame(Frame::Null)
                } else {
                    // every element takes at least four bytes (":0\r\n")
                    let len = self.checked_len(len, "array")?;
                    if len > self.max_frame_size / 4 {
                        return Err(Error::protocol("array length exceeds reasonable maximum"));
                    }
                    Element::ArrayStart(len)
                }
            }
            other => {
                return Err(Error::protocol(format!(
                    "unknown frame type: {:?}",
                    other as char
                )))
            }
        };
        self.consume(header);
        Ok(Some(element))
    }

    fn consume(&mut self, n: usize) {
        self.buf.advance(n);
        self.consumed += n;
    }

    fn checked_len(&self, len: i64, what: &str) -> Result<usize> {
        if len < 0 {
            return Err(Error::protocol(format!("negative {} length {}", what, len)));
        }
        let len = len as usize;
        if len > self.max_frame_size {
            return Err(Error::protocol(format!(
                "{} length exceeds maximum frame size",
                what
            )));
        }
        Ok(len)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}

fn parse_int(line: &[u8]) -> Result<i64> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            Error::protocol(format!(
                "invalid integer: {:?}",
                String::from_utf8_lossy(line)
            ))
        })
}
