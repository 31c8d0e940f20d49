//! In-process mock Redis Cluster for integration tests.
//!
//! Every node is a real TCP listener speaking RESP through the crate's own
//! codec. Nodes share one keyspace but only serve the slots they own; keys of
//! other nodes get a `MOVED` reply, exactly like a real cluster. Slots can be
//! moved or put in migration, and nodes killed, stalled or told to hang up
//! mid-batch while a test runs.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use muxpipe::key_slot;
use muxpipe::proto::codec::{encode_frame, Decoder};
use muxpipe::proto::frame::Frame;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const SCRIPT_SUCCESS: &str = "return 'success!'";
pub const SCRIPT_INCR_TWICE: &str =
    "redis.call('INCRBY', KEYS[1], ARGV[1]); redis.call('INCRBY', KEYS[1], ARGV[1]);";
pub const SCRIPT_NESTED: &str = "return { {KEYS[1]} , {2} }";

const SLOTS: usize = 16384;

#[derive(Debug, Clone)]
enum Value {
    Str(Vec<u8>),
    List(VecDeque<Vec<u8>>),
    Set(BTreeSet<Vec<u8>>),
    Hash(BTreeMap<Vec<u8>, Vec<u8>>),
}

struct State {
    ports: Vec<u16>,
    owners: Vec<usize>,
    alive: Vec<bool>,
    stalled: Vec<bool>,
    hang_up_after: Vec<Option<usize>>,
    migrating: HashMap<u16, usize>,
    topology_broken: bool,
    commands: Vec<usize>,
    password: Option<String>,
    data: HashMap<Vec<u8>, Value>,
    scripts: HashMap<String, String>,
}

pub struct MockCluster {
    state: Arc<Mutex<State>>,
    accept_loops: Vec<JoinHandle<()>>,
}

impl MockCluster {
    /// Starts `nodes` nodes with the slot space split evenly between them.
    pub async fn start(nodes: usize) -> Self {
        Self::start_with_password(nodes, None).await
    }

    pub async fn start_with_password(nodes: usize, password: Option<&str>) -> Self {
        let mut listeners = Vec::new();
        let mut ports = Vec::new();
        for _ in 0..nodes {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            ports.push(listener.local_addr().unwrap().port());
            listeners.push(listener);
        }

        let owners = (0..SLOTS).map(|slot| slot * nodes / SLOTS).collect();
        let state = Arc::new(Mutex::new(State {
            ports,
            owners,
            alive: vec![true; nodes],
            stalled: vec![false; nodes],
            hang_up_after: vec![None; nodes],
            migrating: HashMap::new(),
            topology_broken: false,
            commands: vec![0; nodes],
            password: password.map(str::to_string),
            data: HashMap::new(),
            scripts: HashMap::new(),
        }));

        let accept_loops = listeners
            .into_iter()
            .enumerate()
            .map(|(node, listener)| tokio::spawn(accept_loop(node, listener, Arc::clone(&state))))
            .collect();

        Self {
            state,
            accept_loops,
        }
    }

    /// Seed address of one node.
    pub fn addr(&self, node: usize) -> String {
        format!("127.0.0.1:{}", self.port(node))
    }

    /// Comma-separated addresses of every node.
    pub fn seeds(&self) -> String {
        let count = self.state.lock().unwrap().ports.len();
        (0..count).map(|n| self.addr(n)).collect::<Vec<_>>().join(",")
    }

    pub fn port(&self, node: usize) -> u16 {
        self.state.lock().unwrap().ports[node]
    }

    /// Node currently owning `key`.
    pub fn owner_of(&self, key: &str) -> usize {
        self.state.lock().unwrap().owners[key_slot(key) as usize]
    }

    /// First key `"{prefix}{n}"` owned by `node`.
    pub fn key_on(&self, node: usize, prefix: &str) -> String {
        (0..)
            .map(|i| format!("{}{}", prefix, i))
            .find(|k| self.owner_of(k) == node)
            .unwrap()
    }

    /// Reassigns one slot, as a resharding would.
    pub fn move_slot(&self, slot: u16, to: usize) {
        self.state.lock().unwrap().owners[slot as usize] = to;
    }

    /// Marks a slot as migrating to `to`. Its owner keeps it but answers
    /// `ASK` for every command on it.
    pub fn migrate_slot(&self, slot: u16, to: usize) {
        self.state.lock().unwrap().migrating.insert(slot, to);
    }

    /// Makes a node drop every connection, current and future.
    pub fn kill(&self, node: usize) {
        self.state.lock().unwrap().alive[node] = false;
    }

    /// Makes a node read commands without ever answering them.
    pub fn stall(&self, node: usize) {
        self.state.lock().unwrap().stalled[node] = true;
    }

    /// Makes a node close the connection right after executing its next
    /// `commands` commands. Fires once.
    pub fn hang_up_after(&self, node: usize, commands: usize) {
        self.state.lock().unwrap().hang_up_after[node] = Some(commands);
    }

    /// Makes every node answer CLUSTER SLOTS with an error.
    pub fn break_topology(&self) {
        self.state.lock().unwrap().topology_broken = true;
    }

    /// Number of commands a node has executed.
    pub fn commands_on(&self, node: usize) -> usize {
        self.state.lock().unwrap().commands[node]
    }
}

impl Drop for MockCluster {
    fn drop(&mut self) {
        for handle in &self.accept_loops {
            handle.abort();
        }
    }
}

async fn accept_loop(node: usize, listener: TcpListener, state: Arc<Mutex<State>>) {
    while let Ok((stream, _)) = listener.accept().await {
        if !state.lock().unwrap().alive[node] {
            drop(stream);
            continue;
        }
        tokio::spawn(serve(node, stream, Arc::clone(&state)));
    }
}

async fn serve(node: usize, mut stream: TcpStream, state: Arc<Mutex<State>>) {
    let mut decoder = Decoder::new();
    let mut buf = [0u8; 4096];
    let mut authed = false;

    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        if state.lock().unwrap().stalled[node] {
            continue;
        }
        decoder.append(&buf[..n]);

        let mut out = Vec::new();
        let mut hang_up = false;
        while !hang_up {
            let frame = match decoder.decode() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(_) => return,
            };
            let reply = {
                let mut state = state.lock().unwrap();
                if !state.alive[node] {
                    return;
                }
                let reply = state.handle(node, &mut authed, frame);
                hang_up = state.hang_up_due(node);
                reply
            };
            out.extend_from_slice(&encode_frame(&reply));
        }

        if !out.is_empty() && stream.write_all(&out).await.is_err() {
            return;
        }
        if hang_up {
            close_gracefully(stream).await;
            return;
        }
    }
}

/// Sends FIN after the replies already written and drains the peer, so the
/// client reads every reply before it sees the connection end.
async fn close_gracefully(mut stream: TcpStream) {
    if stream.shutdown().await.is_err() {
        return;
    }
    let mut sink = [0u8; 4096];
    while let Ok(n) = stream.read(&mut sink).await {
        if n == 0 {
            break;
        }
    }
}

fn ok() -> Frame {
    Frame::SimpleString(b"OK".to_vec())
}

fn err(msg: &str) -> Frame {
    Frame::Error(msg.as_bytes().to_vec())
}

fn wrong_type() -> Frame {
    err("WRONGTYPE Operation against a key holding the wrong kind of value")
}

fn bulk(data: &[u8]) -> Frame {
    Frame::BulkString(Bytes::copy_from_slice(data))
}

fn bulk_array<'a>(items: impl IntoIterator<Item = &'a Vec<u8>>) -> Frame {
    Frame::Array(items.into_iter().map(|i| bulk(i)).collect())
}

fn parse_i64(data: &[u8]) -> Option<i64> {
    std::str::from_utf8(data).ok()?.parse().ok()
}

/// LPOS with RANK, COUNT and MAXLEN in any order.
fn lpos(list: Option<&VecDeque<Vec<u8>>>, args: &[Bytes]) -> Frame {
    let (mut rank, mut count, mut maxlen) = (1i64, None, 0usize);
    for pair in args[3..].chunks(2) {
        let [option, value] = pair else {
            return err("ERR syntax error");
        };
        let Some(n) = parse_i64(value) else {
            return err("ERR value is not an integer or out of range");
        };
        match String::from_utf8_lossy(option).to_ascii_uppercase().as_str() {
            "RANK" if n != 0 => rank = n,
            "COUNT" if n >= 0 => count = Some(n as usize),
            "MAXLEN" if n >= 0 => maxlen = n as usize,
            _ => return err("ERR syntax error"),
        }
    }

    let items: Vec<&Vec<u8>> = match list {
        Some(list) if rank > 0 => list.iter().collect(),
        Some(list) => list.iter().rev().collect(),
        None => Vec::new(),
    };
    let len = items.len();
    let scanned = if maxlen == 0 { len } else { maxlen.min(len) };
    let matches: Vec<i64> = items[..scanned]
        .iter()
        .enumerate()
        .filter(|(_, item)| item[..] == args[2][..])
        .skip((rank.unsigned_abs() - 1) as usize)
        .map(|(i, _)| if rank > 0 { i as i64 } else { (len - 1 - i) as i64 })
        .collect();

    match count {
        Some(0) => Frame::Array(matches.into_iter().map(Frame::Integer).collect()),
        Some(c) => Frame::Array(matches.into_iter().take(c).map(Frame::Integer).collect()),
        None => matches.first().map_or(Frame::Null, |&i| Frame::Integer(i)),
    }
}

impl State {
    fn handle(&mut self, node: usize, authed: &mut bool, frame: Frame) -> Frame {
        let args: Vec<Bytes> = match frame {
            Frame::Array(items) => match items
                .into_iter()
                .map(|f| match f {
                    Frame::BulkString(b) => Some(b),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
            {
                Some(args) if !args.is_empty() => args,
                _ => return err("ERR protocol error"),
            },
            _ => return err("ERR protocol error"),
        };
        let name = String::from_utf8_lossy(&args[0]).to_ascii_uppercase();

        if name == "AUTH" {
            let given = String::from_utf8_lossy(&args[args.len() - 1]).into_owned();
            return match &self.password {
                Some(p) if *p == given => {
                    *authed = true;
                    ok()
                }
                Some(_) => err("WRONGPASS invalid username-password pair or user is disabled."),
                None => err("ERR AUTH called without any password configured for the default user"),
            };
        }
        if self.password.is_some() && !*authed {
            return err("NOAUTH Authentication required.");
        }

        if let Some(redirect) = self.check_keys(node, &name, &args) {
            return redirect;
        }
        self.commands[node] += 1;
        if let Some(left) = self.hang_up_after[node].as_mut() {
            *left = left.saturating_sub(1);
        }

        match name.as_str() {
            "PING" => Frame::SimpleString(b"PONG".to_vec()),
            "CLIENT" => ok(),
            "CLUSTER" if self.topology_broken => err("ERR This instance has cluster support disabled"),
            "CLUSTER" => self.cluster_slots(),
            "PUBLISH" => Frame::Integer(0),
            "SCRIPT" => {
                let script = String::from_utf8_lossy(&args[2]).into_owned();
                let sha = format!("{:040x}", self.scripts.len() + 1);
                self.scripts.insert(sha.clone(), script);
                bulk(sha.as_bytes())
            }
            "EVAL" | "EVALSHA" => {
                let body = String::from_utf8_lossy(&args[1]).into_owned();
                let script = if name == "EVAL" {
                    body
                } else {
                    match self.scripts.get(&body) {
                        Some(s) => s.clone(),
                        None => return err("NOSCRIPT No matching script. Please use EVAL."),
                    }
                };
                let numkeys = parse_i64(&args[2]).unwrap_or(0) as usize;
                let keys = args[3..3 + numkeys].to_vec();
                let argv = args[3 + numkeys..].to_vec();
                self.run_script(&script, &keys, &argv)
            }
            _ => self.data_command(&name, &args),
        }
    }

    /// True once the hang-up countdown of `node` reaches zero.
    fn hang_up_due(&mut self, node: usize) -> bool {
        if self.hang_up_after[node] == Some(0) {
            self.hang_up_after[node] = None;
            return true;
        }
        false
    }

    /// Returns a MOVED/ASK/CROSSSLOT reply if this node must not run the
    /// command.
    fn check_keys(&self, node: usize, name: &str, args: &[Bytes]) -> Option<Frame> {
        let keys: Vec<&Bytes> = match name {
            "PING" | "CLIENT" | "CLUSTER" | "PUBLISH" | "SCRIPT" => Vec::new(),
            "DEL" | "EXISTS" => args[1..].iter().collect(),
            "EVAL" | "EVALSHA" => {
                let numkeys = parse_i64(args.get(2)?).unwrap_or(0) as usize;
                args.iter().skip(3).take(numkeys).collect()
            }
            "SORT" => {
                let mut keys = vec![&args[1]];
                if let Some(pos) = args.iter().position(|a| a.eq_ignore_ascii_case(b"STORE")) {
                    keys.extend(args.get(pos + 1));
                }
                keys
            }
            _ => args.get(1).into_iter().collect(),
        };

        let first = key_slot(&keys.first()?[..]);
        if keys.iter().any(|k| key_slot(&k[..]) != first) {
            return Some(err("CROSSSLOT Keys in request don't hash to the same slot"));
        }
        let owner = self.owners[first as usize];
        if owner != node {
            return Some(err(&format!(
                "MOVED {} 127.0.0.1:{}",
                first, self.ports[owner]
            )));
        }
        if let Some(&target) = self.migrating.get(&first) {
            return Some(err(&format!(
                "ASK {} 127.0.0.1:{}",
                first, self.ports[target]
            )));
        }
        None
    }

    fn cluster_slots(&self) -> Frame {
        let mut ranges = Vec::new();
        let mut start = 0;
        for slot in 1..=SLOTS {
            if slot == SLOTS || self.owners[slot] != self.owners[start] {
                let owner = self.owners[start];
                ranges.push(Frame::Array(vec![
                    Frame::Integer(start as i64),
                    Frame::Integer(slot as i64 - 1),
                    Frame::Array(vec![
                        bulk(b"127.0.0.1"),
                        Frame::Integer(self.ports[owner] as i64),
                        bulk(format!("node{}", owner).as_bytes()),
                    ]),
                ]));
                start = slot;
            }
        }
        Frame::Array(ranges)
    }

    fn run_script(&mut self, script: &str, keys: &[Bytes], argv: &[Bytes]) -> Frame {
        match script {
            SCRIPT_SUCCESS => bulk(b"success!"),
            SCRIPT_INCR_TWICE => {
                let (Some(key), Some(by)) = (keys.first(), argv.first().and_then(|a| parse_i64(a)))
                else {
                    return err("ERR wrong number of arguments for script");
                };
                for _ in 0..2 {
                    if let Frame::Error(e) = self.incr_by(key, by) {
                        return Frame::Error(e);
                    }
                }
                Frame::Null
            }
            SCRIPT_NESTED => match keys.first() {
                Some(key) => Frame::Array(vec![
                    Frame::Array(vec![bulk(key)]),
                    Frame::Array(vec![Frame::Integer(2)]),
                ]),
                None => err("ERR script needs one key"),
            },
            _ => err("ERR unknown script"),
        }
    }

    fn incr_by(&mut self, key: &[u8], by: i64) -> Frame {
        let current = match self.data.get(key) {
            None => 0,
            Some(Value::Str(s)) => match parse_i64(s) {
                Some(n) => n,
                None => return err("ERR value is not an integer or out of range"),
            },
            Some(_) => return wrong_type(),
        };
        let next = current + by;
        self.data
            .insert(key.to_vec(), Value::Str(next.to_string().into_bytes()));
        Frame::Integer(next)
    }

    fn data_command(&mut self, name: &str, args: &[Bytes]) -> Frame {
        let key = match args.get(1) {
            Some(k) => k.to_vec(),
            None => return err("ERR wrong number of arguments"),
        };

        match name {
            "GET" => match self.data.get(&key) {
                None => Frame::Null,
                Some(Value::Str(s)) => bulk(s),
                Some(_) => wrong_type(),
            },
            "SET" => {
                self.data.insert(key, Value::Str(args[2].to_vec()));
                ok()
            }
            "DEL" => Frame::Integer(
                args[1..]
                    .iter()
                    .filter(|k| self.data.remove(&k[..]).is_some())
                    .count() as i64,
            ),
            "EXISTS" => Frame::Integer(
                args[1..]
                    .iter()
                    .filter(|k| self.data.contains_key(&k[..]))
                    .count() as i64,
            ),
            "INCR" => self.incr_by(&key, 1),
            "INCRBY" => match parse_i64(&args[2]) {
                Some(by) => self.incr_by(&key, by),
                None => err("ERR value is not an integer or out of range"),
            },
            "APPEND" => {
                let entry = self
                    .data
                    .entry(key)
                    .or_insert_with(|| Value::Str(Vec::new()));
                match entry {
                    Value::Str(s) => {
                        s.extend_from_slice(&args[2]);
                        Frame::Integer(s.len() as i64)
                    }
                    _ => wrong_type(),
                }
            }
            "STRLEN" => match self.data.get(&key) {
                None => Frame::Integer(0),
                Some(Value::Str(s)) => Frame::Integer(s.len() as i64),
                Some(_) => wrong_type(),
            },
            "LPUSH" | "RPUSH" => {
                let entry = self
                    .data
                    .entry(key)
                    .or_insert_with(|| Value::List(VecDeque::new()));
                match entry {
                    Value::List(list) => {
                        for v in &args[2..] {
                            if name == "LPUSH" {
                                list.push_front(v.to_vec());
                            } else {
                                list.push_back(v.to_vec());
                            }
                        }
                        Frame::Integer(list.len() as i64)
                    }
                    _ => wrong_type(),
                }
            }
            "LRANGE" => match self.data.get(&key) {
                None => Frame::Array(Vec::new()),
                Some(Value::List(list)) => {
                    let len = list.len() as i64;
                    let norm = |i: i64| if i < 0 { (len + i).max(0) } else { i };
                    let start = norm(parse_i64(&args[2]).unwrap_or(0));
                    let stop = norm(parse_i64(&args[3]).unwrap_or(-1)).min(len - 1);
                    if start > stop {
                        return Frame::Array(Vec::new());
                    }
                    bulk_array(list.iter().skip(start as usize).take((stop - start + 1) as usize))
                }
                Some(_) => wrong_type(),
            },
            "LLEN" => match self.data.get(&key) {
                None => Frame::Integer(0),
                Some(Value::List(list)) => Frame::Integer(list.len() as i64),
                Some(_) => wrong_type(),
            },
            "LPOS" => match self.data.get(&key) {
                None => lpos(None, args),
                Some(Value::List(list)) => lpos(Some(list), args),
                Some(_) => wrong_type(),
            },
            "LINSERT" => match self.data.get_mut(&key) {
                None => Frame::Integer(0),
                Some(Value::List(list)) => {
                    let after = args[2].eq_ignore_ascii_case(b"AFTER");
                    match list.iter().position(|v| v[..] == args[3][..]) {
                        Some(pos) => {
                            list.insert(if after { pos + 1 } else { pos }, args[4].to_vec());
                            Frame::Integer(list.len() as i64)
                        }
                        None => Frame::Integer(-1),
                    }
                }
                Some(_) => wrong_type(),
            },
            "SADD" => {
                let entry = self
                    .data
                    .entry(key)
                    .or_insert_with(|| Value::Set(BTreeSet::new()));
                match entry {
                    Value::Set(set) => Frame::Integer(
                        args[2..].iter().filter(|m| set.insert(m.to_vec())).count() as i64,
                    ),
                    _ => wrong_type(),
                }
            }
            "SMEMBERS" => match self.data.get(&key) {
                None => Frame::Array(Vec::new()),
                Some(Value::Set(set)) => bulk_array(set.iter()),
                Some(_) => wrong_type(),
            },
            "SCARD" => match self.data.get(&key) {
                None => Frame::Integer(0),
                Some(Value::Set(set)) => Frame::Integer(set.len() as i64),
                Some(_) => wrong_type(),
            },
            "HSET" => {
                let entry = self
                    .data
                    .entry(key)
                    .or_insert_with(|| Value::Hash(BTreeMap::new()));
                match entry {
                    Value::Hash(hash) => {
                        let added = args[2..]
                            .chunks(2)
                            .filter(|pair| pair.len() == 2)
                            .filter(|pair| hash.insert(pair[0].to_vec(), pair[1].to_vec()).is_none())
                            .count();
                        Frame::Integer(added as i64)
                    }
                    _ => wrong_type(),
                }
            }
            "HGET" => match self.data.get(&key) {
                None => Frame::Null,
                Some(Value::Hash(hash)) => hash.get(&args[2][..]).map_or(Frame::Null, |v| bulk(v)),
                Some(_) => wrong_type(),
            },
            "HMGET" => match self.data.get(&key) {
                None => Frame::Array(args[2..].iter().map(|_| Frame::Null).collect()),
                Some(Value::Hash(hash)) => Frame::Array(
                    args[2..]
                        .iter()
                        .map(|f| hash.get(&f[..]).map_or(Frame::Null, |v| bulk(v)))
                        .collect(),
                ),
                Some(_) => wrong_type(),
            },
            "HGETALL" => match self.data.get(&key) {
                None => Frame::Array(Vec::new()),
                Some(Value::Hash(hash)) => Frame::Array(
                    hash.iter()
                        .flat_map(|(f, v)| [bulk(f), bulk(v)])
                        .collect(),
                ),
                Some(_) => wrong_type(),
            },
            "HRANDFIELD" => {
                // deterministic: fields in key order, cycling for negative counts
                let fields: Vec<(&Vec<u8>, &Vec<u8>)> = match self.data.get(&key) {
                    None => Vec::new(),
                    Some(Value::Hash(hash)) => hash.iter().collect(),
                    Some(_) => return wrong_type(),
                };
                let Some(count) = args.get(2) else {
                    return fields.first().map_or(Frame::Null, |(f, _)| bulk(f));
                };
                let Some(count) = parse_i64(count) else {
                    return err("ERR value is not an integer or out of range");
                };
                let picked: Vec<_> = if count >= 0 {
                    fields.iter().take(count as usize).collect()
                } else {
                    fields.iter().cycle().take(count.unsigned_abs() as usize).collect()
                };
                let with_values = args
                    .get(3)
                    .is_some_and(|a| a.eq_ignore_ascii_case(b"WITHVALUES"));
                Frame::Array(
                    picked
                        .into_iter()
                        .flat_map(|(f, v)| {
                            if with_values {
                                vec![bulk(f), bulk(v)]
                            } else {
                                vec![bulk(f)]
                            }
                        })
                        .collect(),
                )
            }
            "SORT" => self.sort(&key, args),
            _ => err(&format!("ERR unknown command '{}'", name)),
        }
    }

    fn sort(&mut self, key: &[u8], args: &[Bytes]) -> Frame {
        let items: Vec<Vec<u8>> = match self.data.get(key) {
            None => Vec::new(),
            Some(Value::List(list)) => list.iter().cloned().collect(),
            Some(Value::Set(set)) => set.iter().cloned().collect(),
            Some(_) => return wrong_type(),
        };
        let mut scored = Vec::with_capacity(items.len());
        for item in items {
            match std::str::from_utf8(&item).ok().and_then(|s| s.parse::<f64>().ok()) {
                Some(score) => scored.push((score, item)),
                None => return err("ERR One or more scores can't be converted into double"),
            }
        }
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        let sorted: Vec<Vec<u8>> = scored.into_iter().map(|(_, item)| item).collect();

        let store = args
            .iter()
            .position(|a| a.eq_ignore_ascii_case(b"STORE"))
            .and_then(|pos| args.get(pos + 1));
        match store {
            Some(dest) => {
                let len = sorted.len() as i64;
                self.data
                    .insert(dest.to_vec(), Value::List(sorted.into_iter().collect()));
                Frame::Integer(len)
            }
            None => bulk_array(sorted.iter()),
        }
    }
}
