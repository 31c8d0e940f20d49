use std::fmt;
use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, instrument};

use crate::core::command::{self, Cmd};
use crate::proto::codec::{Decoder, Encoder};
use crate::proto::error::{Error, Result};
use crate::proto::frame::Frame;

const READ_CHUNK: usize = 8 * 1024;

/// Settings applied to every node connection.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ConnectionConfig {
    /// ACL username sent with AUTH.
    pub username: Option<String>,
    /// Password sent with AUTH.
    pub password: Option<String>,
    /// Name registered with CLIENT SETNAME.
    pub client_name: Option<String>,
    /// Timeout for establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Timeout for each read from the socket.
    pub read_timeout: Option<Duration>,
    /// Timeout for each batched write.
    pub write_timeout: Option<Duration>,
    /// Upper bound for a single reply.
    pub max_frame_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            client_name: None,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Some(Duration::from_secs(30)),
            write_timeout: Some(Duration::from_secs(30)),
            max_frame_size: 512 * 1024 * 1024,
        }
    }
}

/// A connection to a single Redis node.
///
/// Wraps an async stream and handles RESP encoding and decoding. Requests
/// are written in batches: every command passed to
/// [`write_commands`](Connection::write_commands) goes out in one write, and
/// replies are then read back one [`read_frame`](Connection::read_frame) at
/// a time in the same order.
pub struct Connection<S> {
    stream: S,
    decoder: Decoder,
    encoder: Encoder,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection with no timeouts configured.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            decoder: Decoder::new(),
            encoder: Encoder::new(),
            read_timeout: None,
            write_timeout: None,
        }
    }

    /// Configures read and write timeouts for this connection.
    pub fn with_timeouts(
        mut self,
        read_timeout: Option<Duration>,
        write_timeout: Option<Duration>,
    ) -> Self {
        self.read_timeout = read_timeout;
        self.write_timeout = write_timeout;
        self
    }

    /// Limits the size of a single reply.
    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.decoder = Decoder::with_max_frame_size(max_frame_size);
        self
    }

    /// Encodes all commands and sends them with a single write.
    pub async fn write_commands<'a, I>(&mut self, cmds: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Cmd>,
    {
        for cmd in cmds {
            self.encoder.encode_command(cmd.args());
        }
        let data = self.encoder.take();
        let stream = &mut self.stream;
        with_timeout(self.write_timeout, async move {
            stream.write_all(&data).await?;
            stream.flush().await
        })
        .await?;
        Ok(())
    }

    /// Writes a single command.
    pub async fn write_command(&mut self, cmd: &Cmd) -> Result<()> {
        self.write_commands(std::iter::once(cmd)).await
    }

    /// Reads the next complete reply frame.
    ///
    /// A closed socket is reported as [`Error::Io`] with
    /// [`io::ErrorKind::UnexpectedEof`].
    pub async fn read_frame(&mut self) -> Result<Frame> {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            if let Some(frame) = self.decoder.decode()? {
                return Ok(frame);
            }
            let stream = &mut self.stream;
            let n = with_timeout(self.read_timeout, stream.read(&mut buf)).await?;
            if n == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed").into());
            }
            self.decoder.append(&buf[..n]);
        }
    }

    /// Sends one command and waits for its reply.
    pub async fn request(&mut self, cmd: &Cmd) -> Result<Frame> {
        self.write_command(cmd).await?;
        self.read_frame().await
    }
}

impl<S> fmt::Debug for Connection<S>
where
    S: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("stream", &self.stream)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .finish()
    }
}

async fn with_timeout<T, F>(limit: Option<Duration>, fut: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "operation timed out"))?,
        None => fut.await,
    }
}

/// Opens a TCP connection to `address` (`host:port`) and runs the
/// AUTH / CLIENT SETNAME handshake from `config`.
#[instrument(skip(config))]
pub async fn connect(address: &str, config: &ConnectionConfig) -> Result<Connection<TcpStream>> {
    let stream = with_timeout(Some(config.connect_timeout), TcpStream::connect(address)).await?;
    stream.set_nodelay(true)?;

    let mut connection = Connection::new(stream)
        .with_timeouts(config.read_timeout, config.write_timeout)
        .with_max_frame_size(config.max_frame_size);

    if let Some(password) = &config.password {
        let auth_cmd = match &config.username {
            Some(user) => command::auth_with_username(user.clone(), password.clone()),
            None => command::auth(password.clone()),
        };
        if let Frame::Error(_) = connection.request(&auth_cmd).await? {
            return Err(Error::Auth);
        }
    }

    if let Some(name) = &config.client_name {
        let resp = connection.request(&command::client_setname(name.clone())).await?;
        if let Frame::Error(e) = resp {
            return Err(Error::Server {
                message: String::from_utf8_lossy(&e).into_owned(),
            });
        }
    }

    debug!(address, "connected to node");
    Ok(connection)
}
