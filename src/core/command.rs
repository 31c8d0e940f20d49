use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;

use crate::cluster::errors::parse_redis_error;
use crate::proto::error::{Error, Result};
use crate::proto::frame::Frame;

/// A command ready to be sent to Redis.
///
/// Arguments added with [`key`](Cmd::key) are sent like any other argument
/// but also decide which cluster node the command is routed to.
///
/// # Example
///
/// ```
/// use muxpipe::command::{get, Cmd};
///
/// let cmd = Cmd::new("SET").key("key").arg("value");
/// assert_eq!(cmd.keys().len(), 1);
/// let get_cmd = get("key");
/// assert_eq!(get_cmd.args().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Cmd {
    args: Vec<Bytes>,
    keys: Vec<Bytes>,
}

impl Cmd {
    /// Creates a new command with the given name.
    #[inline]
    pub fn new(name: impl Into<Bytes>) -> Self {
        Self {
            args: vec![name.into()],
            keys: Vec::new(),
        }
    }

    /// Appends an argument to the command.
    #[inline]
    pub fn arg<T: Into<Bytes>>(mut self, arg: T) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends a key argument, which also takes part in slot routing.
    #[inline]
    pub fn key<T: Into<Bytes>>(mut self, key: T) -> Self {
        let key = key.into();
        self.keys.push(key.clone());
        self.args.push(key);
        self
    }

    /// Returns the command name.
    pub fn name(&self) -> &Bytes {
        &self.args[0]
    }

    /// Returns all arguments, command name first.
    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    /// Returns the keys this command is routed by.
    pub fn keys(&self) -> &[Bytes] {
        &self.keys
    }

    /// Converts the command to a RESP Array frame.
    pub fn into_frame(self) -> Frame {
        Frame::Array(self.args.into_iter().map(Frame::BulkString).collect())
    }
}

/// Creates a PING command.
#[inline]
pub fn ping() -> Cmd {
    Cmd::new("PING")
}

/// Creates an AUTH command with password only.
#[inline]
pub fn auth(password: impl Into<Bytes>) -> Cmd {
    Cmd::new("AUTH").arg(password)
}

/// Creates an AUTH command with username and password (ACL style).
#[inline]
pub fn auth_with_username(username: impl Into<Bytes>, password: impl Into<Bytes>) -> Cmd {
    Cmd::new("AUTH").arg(username).arg(password)
}

/// Creates a CLIENT SETNAME command.
#[inline]
pub fn client_setname(name: impl Into<Bytes>) -> Cmd {
    Cmd::new("CLIENT").arg("SETNAME").arg(name)
}

// Strings

/// Creates a GET command.
#[inline]
pub fn get(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("GET").key(key)
}

/// Creates a SET command.
#[inline]
pub fn set(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Cmd {
    Cmd::new("SET").key(key).arg(value)
}

/// Creates a SET command with an EX expiration.
#[inline]
pub fn set_with_expiry(key: impl Into<Bytes>, value: impl Into<Bytes>, expiry: Duration) -> Cmd {
    Cmd::new("SET")
        .key(key)
        .arg(value)
        .arg("EX")
        .arg(expiry.as_secs().to_string())
}

/// Creates a SETNX command.
#[inline]
pub fn setnx(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Cmd {
    Cmd::new("SETNX").key(key).arg(value)
}

/// Creates a DEL command over one or more keys.
pub fn del<I, K>(keys: I) -> Cmd
where
    I: IntoIterator<Item = K>,
    K: Into<Bytes>,
{
    keys.into_iter().fold(Cmd::new("DEL"), Cmd::key)
}

/// Creates an EXISTS command over one or more keys.
pub fn exists<I, K>(keys: I) -> Cmd
where
    I: IntoIterator<Item = K>,
    K: Into<Bytes>,
{
    keys.into_iter().fold(Cmd::new("EXISTS"), Cmd::key)
}

/// Creates an INCR command.
#[inline]
pub fn incr(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("INCR").key(key)
}

/// Creates an INCRBY command.
#[inline]
pub fn incr_by(key: impl Into<Bytes>, amount: i64) -> Cmd {
    Cmd::new("INCRBY").key(key).arg(amount.to_string())
}

/// Creates a DECR command.
#[inline]
pub fn decr(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("DECR").key(key)
}

/// Creates a DECRBY command.
#[inline]
pub fn decr_by(key: impl Into<Bytes>, amount: i64) -> Cmd {
    Cmd::new("DECRBY").key(key).arg(amount.to_string())
}

/// Creates an APPEND command.
#[inline]
pub fn append(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Cmd {
    Cmd::new("APPEND").key(key).arg(value)
}

/// Creates a STRLEN command.
#[inline]
pub fn strlen(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("STRLEN").key(key)
}

/// Creates a GETRANGE command.
#[inline]
pub fn getrange(key: impl Into<Bytes>, start: i64, end: i64) -> Cmd {
    Cmd::new("GETRANGE")
        .key(key)
        .arg(start.to_string())
        .arg(end.to_string())
}

/// Creates a SETRANGE command.
#[inline]
pub fn setrange(key: impl Into<Bytes>, offset: u64, value: impl Into<Bytes>) -> Cmd {
    Cmd::new("SETRANGE")
        .key(key)
        .arg(offset.to_string())
        .arg(value)
}

// Lists

fn push_values<I, V>(cmd: Cmd, values: I) -> Cmd
where
    I: IntoIterator<Item = V>,
    V: Into<Bytes>,
{
    values.into_iter().fold(cmd, Cmd::arg)
}

/// Creates an LPUSH command.
pub fn lpush<I, V>(key: impl Into<Bytes>, values: I) -> Cmd
where
    I: IntoIterator<Item = V>,
    V: Into<Bytes>,
{
    push_values(Cmd::new("LPUSH").key(key), values)
}

/// Creates an RPUSH command.
pub fn rpush<I, V>(key: impl Into<Bytes>, values: I) -> Cmd
where
    I: IntoIterator<Item = V>,
    V: Into<Bytes>,
{
    push_values(Cmd::new("RPUSH").key(key), values)
}

/// Creates an LPUSHX command.
pub fn lpushx<I, V>(key: impl Into<Bytes>, values: I) -> Cmd
where
    I: IntoIterator<Item = V>,
    V: Into<Bytes>,
{
    push_values(Cmd::new("LPUSHX").key(key), values)
}

/// Creates an RPUSHX command.
pub fn rpushx<I, V>(key: impl Into<Bytes>, values: I) -> Cmd
where
    I: IntoIterator<Item = V>,
    V: Into<Bytes>,
{
    push_values(Cmd::new("RPUSHX").key(key), values)
}

/// Creates an LPOP command, optionally popping `count` elements.
#[inline]
pub fn lpop(key: impl Into<Bytes>, count: Option<usize>) -> Cmd {
    let cmd = Cmd::new("LPOP").key(key);
    match count {
        Some(n) => cmd.arg(n.to_string()),
        None => cmd,
    }
}

/// Creates an RPOP command, optionally popping `count` elements.
#[inline]
pub fn rpop(key: impl Into<Bytes>, count: Option<usize>) -> Cmd {
    let cmd = Cmd::new("RPOP").key(key);
    match count {
        Some(n) => cmd.arg(n.to_string()),
        None => cmd,
    }
}

/// Creates an LRANGE command.
#[inline]
pub fn lrange(key: impl Into<Bytes>, start: i64, stop: i64) -> Cmd {
    Cmd::new("LRANGE")
        .key(key)
        .arg(start.to_string())
        .arg(stop.to_string())
}

/// Creates an LLEN command.
#[inline]
pub fn llen(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("LLEN").key(key)
}

/// Creates an LINDEX command.
#[inline]
pub fn lindex(key: impl Into<Bytes>, index: i64) -> Cmd {
    Cmd::new("LINDEX").key(key).arg(index.to_string())
}

/// Creates an LSET command.
#[inline]
pub fn lset(key: impl Into<Bytes>, index: i64, value: impl Into<Bytes>) -> Cmd {
    Cmd::new("LSET").key(key).arg(index.to_string()).arg(value)
}

/// Creates an LREM command.
#[inline]
pub fn lrem(key: impl Into<Bytes>, count: i64, value: impl Into<Bytes>) -> Cmd {
    Cmd::new("LREM").key(key).arg(count.to_string()).arg(value)
}

/// Creates an LTRIM command.
#[inline]
pub fn ltrim(key: impl Into<Bytes>, start: i64, stop: i64) -> Cmd {
    Cmd::new("LTRIM")
        .key(key)
        .arg(start.to_string())
        .arg(stop.to_string())
}

/// Options for [`lpos`] and [`lpos_count`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LposOptions {
    rank: Option<i64>,
    maxlen: Option<usize>,
}

impl LposOptions {
    /// Creates options with neither RANK nor MAXLEN.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips to the `rank`-th match. Negative ranks search from the tail.
    #[inline]
    pub fn rank(mut self, rank: i64) -> Self {
        self.rank = Some(rank);
        self
    }

    /// Compares at most `maxlen` elements.
    #[inline]
    pub fn maxlen(mut self, maxlen: usize) -> Self {
        self.maxlen = Some(maxlen);
        self
    }

    fn apply(self, mut cmd: Cmd) -> Cmd {
        if let Some(rank) = self.rank {
            cmd = cmd.arg("RANK").arg(rank.to_string());
        }
        if let Some(maxlen) = self.maxlen {
            cmd = cmd.arg("MAXLEN").arg(maxlen.to_string());
        }
        cmd
    }
}

/// Creates an LPOS command returning the index of the first match.
///
/// # Arguments
///
/// * `key` - The list to search
/// * `element` - The value to look for
/// * `options` - RANK and MAXLEN, see [`LposOptions`]
///
/// # Returns
///
/// The reply is an integer index, or nil when nothing matched.
#[inline]
pub fn lpos(key: impl Into<Bytes>, element: impl Into<Bytes>, options: LposOptions) -> Cmd {
    options.apply(Cmd::new("LPOS").key(key).arg(element))
}

/// Creates an LPOS command returning up to `count` matching indexes.
///
/// A `count` of 0 asks for every match. The reply is always an array.
#[inline]
pub fn lpos_count(
    key: impl Into<Bytes>,
    element: impl Into<Bytes>,
    count: usize,
    options: LposOptions,
) -> Cmd {
    options
        .apply(Cmd::new("LPOS").key(key).arg(element))
        .arg("COUNT")
        .arg(count.to_string())
}

/// Where [`linsert`] places the new element relative to the pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPosition {
    Before,
    After,
}

impl ListPosition {
    fn as_str(self) -> &'static str {
        match self {
            ListPosition::Before => "BEFORE",
            ListPosition::After => "AFTER",
        }
    }
}

/// Creates an LINSERT command.
///
/// The reply is the new list length, `-1` when the pivot was not found and
/// `0` when the key does not exist.
#[inline]
pub fn linsert(
    key: impl Into<Bytes>,
    position: ListPosition,
    pivot: impl Into<Bytes>,
    element: impl Into<Bytes>,
) -> Cmd {
    Cmd::new("LINSERT")
        .key(key)
        .arg(position.as_str())
        .arg(pivot)
        .arg(element)
}

// Sets

/// Creates an SADD command.
pub fn sadd<I, V>(key: impl Into<Bytes>, members: I) -> Cmd
where
    I: IntoIterator<Item = V>,
    V: Into<Bytes>,
{
    push_values(Cmd::new("SADD").key(key), members)
}

/// Creates an SREM command.
pub fn srem<I, V>(key: impl Into<Bytes>, members: I) -> Cmd
where
    I: IntoIterator<Item = V>,
    V: Into<Bytes>,
{
    push_values(Cmd::new("SREM").key(key), members)
}

/// Creates an SMEMBERS command.
#[inline]
pub fn smembers(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("SMEMBERS").key(key)
}

/// Creates an SPOP command.
#[inline]
pub fn spop(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("SPOP").key(key)
}

/// Creates an SCARD command.
#[inline]
pub fn scard(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("SCARD").key(key)
}

/// Creates an SISMEMBER command.
#[inline]
pub fn sismember(key: impl Into<Bytes>, member: impl Into<Bytes>) -> Cmd {
    Cmd::new("SISMEMBER").key(key).arg(member)
}

// Hashes

/// Creates an HSET command for a single field.
#[inline]
pub fn hset(key: impl Into<Bytes>, field: impl Into<Bytes>, value: impl Into<Bytes>) -> Cmd {
    Cmd::new("HSET").key(key).arg(field).arg(value)
}

/// Creates an HSET command for several field/value pairs.
pub fn hset_multiple<I, F, V>(key: impl Into<Bytes>, pairs: I) -> Cmd
where
    I: IntoIterator<Item = (F, V)>,
    F: Into<Bytes>,
    V: Into<Bytes>,
{
    pairs
        .into_iter()
        .fold(Cmd::new("HSET").key(key), |cmd, (f, v)| cmd.arg(f).arg(v))
}

/// Creates an HSETNX command.
#[inline]
pub fn hsetnx(key: impl Into<Bytes>, field: impl Into<Bytes>, value: impl Into<Bytes>) -> Cmd {
    Cmd::new("HSETNX").key(key).arg(field).arg(value)
}

/// Creates an HGET command.
#[inline]
pub fn hget(key: impl Into<Bytes>, field: impl Into<Bytes>) -> Cmd {
    Cmd::new("HGET").key(key).arg(field)
}

/// Creates an HMGET command.
pub fn hmget<I, F>(key: impl Into<Bytes>, fields: I) -> Cmd
where
    I: IntoIterator<Item = F>,
    F: Into<Bytes>,
{
    push_values(Cmd::new("HMGET").key(key), fields)
}

/// Creates an HGETALL command.
#[inline]
pub fn hgetall(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("HGETALL").key(key)
}

/// Creates an HKEYS command.
#[inline]
pub fn hkeys(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("HKEYS").key(key)
}

/// Creates an HVALS command.
#[inline]
pub fn hvals(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("HVALS").key(key)
}

/// Creates an HDEL command.
pub fn hdel<I, F>(key: impl Into<Bytes>, fields: I) -> Cmd
where
    I: IntoIterator<Item = F>,
    F: Into<Bytes>,
{
    push_values(Cmd::new("HDEL").key(key), fields)
}

/// Creates an HEXISTS command.
#[inline]
pub fn hexists(key: impl Into<Bytes>, field: impl Into<Bytes>) -> Cmd {
    Cmd::new("HEXISTS").key(key).arg(field)
}

/// Creates an HLEN command.
#[inline]
pub fn hlen(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("HLEN").key(key)
}

/// Creates an HINCRBY command.
#[inline]
pub fn hincrby(key: impl Into<Bytes>, field: impl Into<Bytes>, increment: i64) -> Cmd {
    Cmd::new("HINCRBY")
        .key(key)
        .arg(field)
        .arg(increment.to_string())
}

/// Creates an HINCRBYFLOAT command.
#[inline]
pub fn hincrbyfloat(key: impl Into<Bytes>, field: impl Into<Bytes>, increment: f64) -> Cmd {
    Cmd::new("HINCRBYFLOAT")
        .key(key)
        .arg(field)
        .arg(increment.to_string())
}

/// Creates an HSTRLEN command.
#[inline]
pub fn hstrlen(key: impl Into<Bytes>, field: impl Into<Bytes>) -> Cmd {
    Cmd::new("HSTRLEN").key(key).arg(field)
}

/// Creates an HRANDFIELD command returning one random field.
#[inline]
pub fn hrandfield(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("HRANDFIELD").key(key)
}

/// Creates an HRANDFIELD command returning up to `count` fields.
///
/// A negative `count` allows the same field to be returned more than once.
#[inline]
pub fn hrandfield_count(key: impl Into<Bytes>, count: i64) -> Cmd {
    Cmd::new("HRANDFIELD").key(key).arg(count.to_string())
}

/// Creates an HRANDFIELD ... WITHVALUES command.
///
/// The reply is a flat field/value array, see [`frame_to_map`].
#[inline]
pub fn hrandfield_withvalues(key: impl Into<Bytes>, count: i64) -> Cmd {
    hrandfield_count(key, count).arg("WITHVALUES")
}

// Sorted sets

/// Creates a ZADD command for one member.
#[inline]
pub fn zadd(key: impl Into<Bytes>, score: f64, member: impl Into<Bytes>) -> Cmd {
    Cmd::new("ZADD").key(key).arg(score.to_string()).arg(member)
}

/// Creates a ZINCRBY command.
#[inline]
pub fn zincrby(key: impl Into<Bytes>, increment: f64, member: impl Into<Bytes>) -> Cmd {
    Cmd::new("ZINCRBY")
        .key(key)
        .arg(increment.to_string())
        .arg(member)
}

/// Creates a ZCARD command.
#[inline]
pub fn zcard(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("ZCARD").key(key)
}

/// Creates a ZRANGE command.
#[inline]
pub fn zrange(key: impl Into<Bytes>, start: i64, stop: i64) -> Cmd {
    Cmd::new("ZRANGE")
        .key(key)
        .arg(start.to_string())
        .arg(stop.to_string())
}

/// Creates a ZRANGE ... WITHSCORES command.
#[inline]
pub fn zrange_withscores(key: impl Into<Bytes>, start: i64, stop: i64) -> Cmd {
    zrange(key, start, stop).arg("WITHSCORES")
}

// Generic

/// Creates a SORT command.
#[inline]
pub fn sort(key: impl Into<Bytes>) -> Cmd {
    Cmd::new("SORT").key(key)
}

/// Creates a SORT ... STORE command. Both keys must share a slot.
#[inline]
pub fn sort_store(key: impl Into<Bytes>, destination: impl Into<Bytes>) -> Cmd {
    Cmd::new("SORT").key(key).arg("STORE").key(destination)
}

/// Creates a PUBLISH command. Channels are not keys and route anywhere.
#[inline]
pub fn publish(channel: impl Into<Bytes>, message: impl Into<Bytes>) -> Cmd {
    Cmd::new("PUBLISH").arg(channel).arg(message)
}

// Scripting

fn script_call<K, A>(name: &'static str, body: Bytes, keys: K, args: A) -> Cmd
where
    K: IntoIterator,
    K::Item: Into<Bytes>,
    A: IntoIterator,
    A::Item: Into<Bytes>,
{
    let keys: Vec<Bytes> = keys.into_iter().map(Into::into).collect();
    let cmd = Cmd::new(name).arg(body).arg(keys.len().to_string());
    let cmd = keys.into_iter().fold(cmd, Cmd::key);
    args.into_iter().fold(cmd, Cmd::arg)
}

/// Creates an EVAL command. `keys` become KEYS[..], `args` ARGV[..].
pub fn eval<K, A>(script: impl Into<Bytes>, keys: K, args: A) -> Cmd
where
    K: IntoIterator,
    K::Item: Into<Bytes>,
    A: IntoIterator,
    A::Item: Into<Bytes>,
{
    script_call("EVAL", script.into(), keys, args)
}

/// Creates an EVALSHA command for a previously loaded script.
pub fn evalsha<K, A>(sha1: impl Into<Bytes>, keys: K, args: A) -> Cmd
where
    K: IntoIterator,
    K::Item: Into<Bytes>,
    A: IntoIterator,
    A::Item: Into<Bytes>,
{
    script_call("EVALSHA", sha1.into(), keys, args)
}

/// Creates a SCRIPT LOAD command.
#[inline]
pub fn script_load(script: impl Into<Bytes>) -> Cmd {
    Cmd::new("SCRIPT").arg("LOAD").arg(script)
}

// Reply transforms

fn unexpected(frame: Frame, expected: &str) -> Error {
    match frame {
        Frame::Error(e) => parse_redis_error(&e),
        other => Error::protocol(format!("expected {}, got {:?}", expected, other)),
    }
}

fn parse_text<T: std::str::FromStr>(data: &[u8], what: &str) -> Result<T> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .ok_or_else(|| Error::protocol(format!("invalid {} value", what)))
}

/// Converts a status or bulk reply to a string (e.g. `"OK"`).
pub fn frame_to_status(frame: Frame) -> Result<String> {
    match frame {
        Frame::SimpleString(s) => Ok(String::from_utf8_lossy(&s).into_owned()),
        Frame::BulkString(b) => Ok(String::from_utf8_lossy(&b).into_owned()),
        other => Err(unexpected(other, "status reply")),
    }
}

/// Converts a bulk reply to bytes, nil becoming `None`.
pub fn frame_to_bytes(frame: Frame) -> Result<Option<Bytes>> {
    match frame {
        Frame::BulkString(b) => Ok(Some(b)),
        Frame::SimpleString(s) => Ok(Some(Bytes::from(s))),
        Frame::Null => Ok(None),
        other => Err(unexpected(other, "bulk string")),
    }
}

/// Converts an integer reply.
pub fn frame_to_int(frame: Frame) -> Result<i64> {
    match frame {
        Frame::Integer(i) => Ok(i),
        Frame::BulkString(b) => parse_text(&b, "integer"),
        other => Err(unexpected(other, "integer")),
    }
}

/// Converts an integer reply that may be nil (LPOS without COUNT).
pub fn frame_to_opt_int(frame: Frame) -> Result<Option<i64>> {
    match frame {
        Frame::Null => Ok(None),
        other => frame_to_int(other).map(Some),
    }
}

/// Converts an array of integers.
pub fn frame_to_vec_int(frame: Frame) -> Result<Vec<i64>> {
    match frame {
        Frame::Array(items) => items.into_iter().map(frame_to_int).collect(),
        Frame::Null => Ok(Vec::new()),
        other => Err(unexpected(other, "array")),
    }
}

/// Converts an integer reply to a boolean (`0` is false).
pub fn frame_to_bool(frame: Frame) -> Result<bool> {
    frame_to_int(frame).map(|i| i != 0)
}

/// Converts a bulk reply holding a decimal number.
pub fn frame_to_float(frame: Frame) -> Result<f64> {
    match frame {
        Frame::BulkString(b) => parse_text(&b, "float"),
        Frame::Integer(i) => Ok(i as f64),
        other => Err(unexpected(other, "float")),
    }
}

/// Converts an array of bulk strings. A nil reply becomes an empty list.
pub fn frame_to_vec_bytes(frame: Frame) -> Result<Vec<Bytes>> {
    match frame {
        Frame::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Frame::BulkString(b) => Ok(b),
                other => Err(unexpected(other, "bulk string element")),
            })
            .collect(),
        Frame::Null => Ok(Vec::new()),
        other => Err(unexpected(other, "array")),
    }
}

/// Converts an array whose elements may be nil (HMGET).
pub fn frame_to_vec_opt_bytes(frame: Frame) -> Result<Vec<Option<Bytes>>> {
    match frame {
        Frame::Array(items) => items.into_iter().map(frame_to_bytes).collect(),
        other => Err(unexpected(other, "array")),
    }
}

/// Converts a flat field/value array (HGETALL) into a map.
pub fn frame_to_map(frame: Frame) -> Result<HashMap<Bytes, Bytes>> {
    let items = frame_to_vec_bytes(frame)?;
    if items.len() % 2 != 0 {
        return Err(Error::protocol(
            "field/value reply must have an even number of elements",
        ));
    }
    let mut map = HashMap::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
        map.insert(field, value);
    }
    Ok(map)
}

/// Converts a flat member/score array (ZRANGE WITHSCORES).
pub fn frame_to_scored(frame: Frame) -> Result<Vec<(Bytes, f64)>> {
    let items = frame_to_vec_bytes(frame)?;
    if items.len() % 2 != 0 {
        return Err(Error::protocol(
            "member/score reply must have an even number of elements",
        ));
    }
    items
        .chunks(2)
        .map(|pair| Ok((pair[0].clone(), parse_text(&pair[1], "score")?)))
        .collect()
}

/// Passes the reply through unchanged, for script results of any shape.
pub fn frame_to_value(frame: Frame) -> Result<Frame> {
    match frame {
        Frame::Error(e) => Err(parse_redis_error(&e)),
        other => Ok(other),
    }
}
