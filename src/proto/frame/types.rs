use bytes::Bytes;

/// A RESP (Redis Serialization Protocol) frame.
///
/// Every reply decodes into one of these variants; arrays nest to any depth.
/// Both the nil bulk string (`$-1`) and the nil array (`*-1`) decode to
/// [`Frame::Null`].
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Simple string (+OK).
    SimpleString(Vec<u8>),
    /// Error (-ERR).
    Error(Vec<u8>),
    /// Integer (:1000).
    Integer(i64),
    /// Binary-safe bulk string ($6\r\nfoobar).
    BulkString(Bytes),
    /// Array (*2\r\n...).
    Array(Vec<Frame>),
    /// Null ($-1 or *-1).
    Null,
}

impl Frame {
    /// Creates a bulk string frame.
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Frame::BulkString(data.into())
    }

    /// Returns true if this frame is an error reply.
    pub fn is_error(&self) -> bool {
        matches!(self, Frame::Error(_))
    }

    /// Returns true if this frame is Null.
    pub fn is_null(&self) -> bool {
        matches!(self, Frame::Null)
    }

    /// Returns the payload of a bulk string, if this is one.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Frame::BulkString(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an integer frame.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Frame::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the elements of an array frame.
    pub fn as_array(&self) -> Option<&[Frame]> {
        match self {
            Frame::Array(a) => Some(a),
            _ => None,
        }
    }
}
