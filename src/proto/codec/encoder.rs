use bytes::{BufMut, Bytes, BytesMut};

use crate::proto::frame::Frame;

/// A RESP encoder that converts [`Frame`] values and commands to bytes.
///
/// The encoder accumulates data in an internal buffer, so a whole batch of
/// commands can be encoded back to back and written with a single call.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use muxpipe::proto::codec::Encoder;
///
/// let mut encoder = Encoder::new();
/// encoder.encode_command(&[Bytes::from("GET"), Bytes::from("key")]);
/// encoder.encode_command(&[Bytes::from("GET"), Bytes::from("other")]);
/// let data = encoder.take();
/// assert!(data.starts_with(b"*2\r\n$3\r\nGET\r\n"));
/// ```
#[derive(Debug)]
pub struct Encoder {
    buf: BytesMut,
}

impl Encoder {
    /// Creates a new encoder with an empty buffer.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    /// Encodes a frame into the internal buffer using RESP protocol.
    pub fn encode(&mut self, frame: &Frame) {
        match frame {
            Frame::SimpleString(s) => {
                self.buf.put_u8(b'+');
                self.buf.extend_from_slice(s);
                self.buf.extend_from_slice(b"\r\n");
            }
            Frame::Error(e) => {
                self.buf.put_u8(b'-');
                self.buf.extend_from_slice(e);
                self.buf.extend_from_slice(b"\r\n");
            }
            Frame::Integer(n) => {
                self.buf.put_u8(b':');
                self.buf.extend_from_slice(n.to_string().as_bytes());
                self.buf.extend_from_slice(b"\r\n");
            }
            Frame::BulkString(data) => self.put_bulk(data),
            Frame::Array(a) => {
                self.put_header(b'*', a.len());
                for item in a {
                    self.encode(item);
                }
            }
            Frame::Null => {
                self.buf.extend_from_slice(b"$-1\r\n");
            }
        }
    }

    /// Encodes a request: an array of bulk strings, the command name first.
    ///
    /// Arguments are written byte for byte, so keys and values may hold any
    /// binary content including `\0` and `\r\n`.
    pub fn encode_command(&mut self, args: &[Bytes]) {
        self.put_header(b'*', args.len());
        for arg in args {
            self.put_bulk(arg);
        }
    }

    /// Takes the encoded data from the buffer, leaving it empty.
    pub fn take(&mut self) -> BytesMut {
        self.buf.split()
    }

    /// Returns the number of bytes currently buffered.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if nothing has been encoded since the last take.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn put_header(&mut self, tag: u8, len: usize) {
        self.buf.put_u8(tag);
        self.buf.extend_from_slice(len.to_string().as_bytes());
        self.buf.extend_from_slice(b"\r\n");
    }

    fn put_bulk(&mut self, data: &[u8]) {
        self.put_header(b'$', data.len());
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\r\n");
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encodes a single frame into a fresh buffer.
pub fn encode_frame(frame: &Frame) -> BytesMut {
    let mut encoder = Encoder::new();
    encoder.encode(frame);
    encoder.take()
}
