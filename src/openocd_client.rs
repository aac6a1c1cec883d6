//! OpenOCD TCL socket client
//!
//! Talks to the TCL server of an already running OpenOCD daemon.
//! Protocol: send command as UTF-8, terminated by 0x1a (SUB character).
//! Response: UTF-8 text terminated by 0x1a.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info};
use std::future::Future;
use std::time::Duration;

use crate::registers::RegisterSnapshot;

/// TCL protocol terminator byte (ASCII SUB / Ctrl-Z)
const TCL_TERMINATOR: u8 = 0x1a;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, OpenocdError>;

/// Connection to an OpenOCD TCL server.
///
/// The underlying stream is closed when the client is dropped, so holding an
/// `OpenOcd` in a local binding scopes the connection to that block.
///
/// A failed or timed out exchange leaves the stream out of step with the
/// daemon; every later command then fails with `ConnectionClosed`.
pub struct OpenOcd<S = TcpStream> {
    stream: BufReader<S>,
    /// Deadline applied to each response
    timeout: Duration,
    /// Set once a reply may still be in flight or the stream is dead
    broken: bool,
}

impl OpenOcd<TcpStream> {
    /// Connect to the TCL server at `host:port`.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        info!("Connecting to OpenOCD TCL at {}:{}", host, port);

        let stream = connect_within(timeout, TcpStream::connect((host, port)), host, port).await?;

        info!("Connected to OpenOCD TCL on port {}", port);
        Ok(Self::from_stream(stream, timeout))
    }
}

/// Bound a connect attempt by `timeout`
async fn connect_within<T, F>(timeout: Duration, connect: F, host: &str, port: u16) -> Result<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    match tokio::time::timeout(timeout, connect).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(OpenocdError::ConnectionFailed(format!(
            "Failed to connect to OpenOCD TCL at {}:{}: {}",
            host, port, e
        ))),
        Err(_) => Err(OpenocdError::Timeout),
    }
}

impl<S> OpenOcd<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already connected stream.
    pub fn from_stream(stream: S, timeout: Duration) -> Self {
        Self {
            stream: BufReader::new(stream),
            timeout,
            broken: false,
        }
    }

    /// Send a TCL command to OpenOCD and read the response.
    pub async fn execute(&mut self, command: &str) -> Result<String> {
        if self.broken {
            return Err(OpenocdError::ConnectionClosed);
        }

        debug!("OpenOCD TCL command: {}", command);

        let mut payload = command.as_bytes().to_vec();
        payload.push(TCL_TERMINATOR);

        // Cleared again only once a full reply has been read
        self.broken = true;

        let stream = self.stream.get_mut();
        stream.write_all(&payload).await.map_err(|e| {
            OpenocdError::CommandFailed(format!("Write failed: {}", e))
        })?;
        stream.flush().await.map_err(|e| {
            OpenocdError::CommandFailed(format!("Flush failed: {}", e))
        })?;

        let frame = self.read_frame().await?;
        self.broken = false;

        let response = String::from_utf8(frame).map_err(|e| {
            OpenocdError::CommandFailed(format!("Invalid UTF-8 in response: {}", e))
        })?;

        debug!("OpenOCD TCL response: {}", response);
        Ok(response)
    }

    /// Read response bytes until 0x1a terminator
    async fn read_frame(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(256);

        let read = self.stream.read_until(TCL_TERMINATOR, &mut buf);
        match tokio::time::timeout(self.timeout, read).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(OpenocdError::CommandFailed(format!("Read failed: {}", e)));
            }
            Err(_) => return Err(OpenocdError::Timeout),
        }

        // EOF before the terminator
        if buf.pop() != Some(TCL_TERMINATOR) {
            return Err(OpenocdError::ConnectionClosed);
        }
        Ok(buf)
    }

    /// Halt target CPU execution
    pub async fn halt(&mut self) -> Result<String> {
        let output = self.execute("halt").await?;
        info!("Target halted");
        Ok(output)
    }

    /// Resume target CPU execution, optionally from `address`
    pub async fn resume(&mut self, address: Option<u64>) -> Result<String> {
        let cmd = match address {
            Some(addr) => format!("resume 0x{:x}", addr),
            None => "resume".to_string(),
        };
        let output = self.execute(&cmd).await?;
        info!("Target resumed");
        Ok(output)
    }

    /// Read a batch of registers with a single `get_reg` request.
    ///
    /// The snapshot holds exactly the requested names, in request order.
    /// With `force` set OpenOCD bypasses its register cache.
    pub async fn read_registers<N: AsRef<str>>(
        &mut self,
        names: &[N],
        force: bool,
    ) -> Result<RegisterSnapshot> {
        let mut requested: Vec<&str> = Vec::with_capacity(names.len());
        for name in names.iter().map(AsRef::as_ref) {
            validate_register_name(name)?;
            if !requested.contains(&name) {
                requested.push(name);
            }
        }
        if requested.is_empty() {
            return Err(OpenocdError::InvalidArgument("No registers requested".to_string()));
        }

        let cmd = format!(
            "get_reg {}{{{}}}",
            if force { "-force " } else { "" },
            requested.join(" ")
        );
        let reply = self.execute(&cmd).await?;
        let values = parse_register_reply(&reply)?;

        let mut snapshot = RegisterSnapshot::with_capacity(requested.len());
        for name in requested {
            let value = values
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| *v)
                .ok_or_else(|| OpenocdError::MissingRegister(name.to_string()))?;
            snapshot.insert(name, value);
        }
        Ok(snapshot)
    }

    /// Read one register
    pub async fn read_register(&mut self, name: &str, force: bool) -> Result<u64> {
        let snapshot = self.read_registers(&[name], force).await?;
        snapshot
            .get(name)
            .ok_or_else(|| OpenocdError::MissingRegister(name.to_string()))
    }

    /// Shut the connection down explicitly instead of waiting for drop
    pub async fn close(mut self) -> Result<()> {
        self.stream.get_mut().shutdown().await?;
        Ok(())
    }
}

/// Register names travel inside a TCL list, so they must be plain words
fn validate_register_name(name: &str) -> Result<()> {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if plain {
        Ok(())
    } else {
        Err(OpenocdError::InvalidArgument(format!("Invalid register name '{}'", name)))
    }
}

/// Parse a register value from OpenOCD output (e.g., "0x08000100" or plain number)
pub fn parse_value(s: &str) -> Result<u64> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
            .map_err(|e| OpenocdError::ParseError(format!("Invalid hex value '{}': {}", s, e)))
    } else {
        s.parse::<u64>()
            .map_err(|e| OpenocdError::ParseError(format!("Invalid value '{}': {}", s, e)))
    }
}

/// Parse a `get_reg` reply
/// Format: "pc 0x08000100 sp 0x20001000"
///
/// OpenOCD reports failures (unknown register, target not halted) as plain
/// reply text, which ends up here as a parse error carrying that text.
pub fn parse_register_reply(reply: &str) -> Result<Vec<(String, u64)>> {
    let tokens: Vec<&str> = reply.split_whitespace().collect();
    let unexpected = || OpenocdError::ParseError(format!("Unexpected get_reg reply: '{}'", reply.trim()));

    if tokens.is_empty() || tokens.len() % 2 != 0 {
        return Err(unexpected());
    }

    tokens
        .chunks(2)
        .map(|pair| {
            let value = parse_value(pair[1]).map_err(|_| unexpected())?;
            Ok::<_, OpenocdError>((pair[0].to_string(), value))
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum OpenocdError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed by OpenOCD")]
    ConnectionClosed,

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Command timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Register missing from reply: {0}")]
    MissingRegister(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
