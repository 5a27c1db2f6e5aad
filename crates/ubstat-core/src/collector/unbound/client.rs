//! Remote-control transport.
//!
//! Speaks the line-oriented unbound-control protocol over either a local
//! domain socket or TCP (optionally wrapped in mutual TLS). A fresh
//! connection is opened for every command and closed once the response has
//! been read. The configured timeout is a single deadline covering connect,
//! handshake, request and response; every socket call gets only what is left
//! of it.

use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use native_tls::{Certificate, HandshakeError, Identity, TlsConnector, TlsStream};
use tracing::{debug, warn};

use super::conf::is_unix_socket;
use super::pem;
use crate::config::ConnectionConfig;

/// Protocol version header prepended to every command.
pub const PROTOCOL_PREFIX: &str = "UBCT1 ";

/// Upper bound on lines accepted from a single response.
const MAX_RESPONSE_LINES: usize = 100_000;

/// Upper bound on the length of one response line.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Error type for remote-control exchanges.
#[derive(Debug)]
pub enum TransportError {
    /// Client cannot be built from the given settings.
    Config(String),
    /// Connection could not be established.
    Connect(String, io::Error),
    /// TLS setup or handshake failed.
    Tls(String),
    /// I/O failure during the exchange.
    Io(io::Error),
    /// The exchange did not finish within the timeout.
    Timeout,
    /// The server answered with an error line.
    Server(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Config(msg) => write!(f, "client config: {}", msg),
            TransportError::Connect(addr, e) => write!(f, "connecting to '{}': {}", addr, e),
            TransportError::Tls(msg) => write!(f, "tls: {}", msg),
            TransportError::Io(e) => write!(f, "i/o: {}", e),
            TransportError::Timeout => write!(f, "timeout elapsed"),
            TransportError::Server(msg) => write!(f, "server responded: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Connect(_, e) | TransportError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Sends one command and returns the response lines.
///
/// Implementations must not retry; a failed exchange is reported as is and
/// the caller decides what to do on the next cycle.
pub trait ControlClient: Send {
    fn send(&mut self, command: &str) -> Result<Vec<String>, TransportError>;
}

/// TLS material for the TCP transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TlsSettings {
    pub cert: PathBuf,
    pub key: PathBuf,
    pub ca: Option<PathBuf>,
    pub insecure_skip_verify: bool,
}

/// Resolved transport parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub address: String,
    pub timeout: Duration,
    /// `None` for domain sockets and plain TCP.
    pub tls: Option<TlsSettings>,
    /// Line that terminates a response. The resolver closes the stream
    /// instead, so this is unset by default.
    pub end_marker: Option<String>,
}

impl ClientConfig {
    /// Derives transport parameters from the connection settings.
    ///
    /// TLS is dropped for domain-socket addresses. Requesting TLS on TCP
    /// without both certificate and key paths is a configuration error.
    pub fn new(conn: &ConnectionConfig) -> Result<Self, TransportError> {
        let use_tls = conn.use_tls && !is_unix_socket(&conn.address);

        if use_tls && (conn.tls_cert.as_os_str().is_empty() || conn.tls_key.as_os_str().is_empty())
        {
            return Err(TransportError::Config(
                "'tls_cert' or 'tls_key' is missing".to_string(),
            ));
        }

        let tls = use_tls.then(|| TlsSettings {
            cert: conn.tls_cert.clone(),
            key: conn.tls_key.clone(),
            ca: conn.tls_ca.clone(),
            insecure_skip_verify: conn.tls_skip_verify,
        });

        Ok(Self {
            address: conn.address.clone(),
            timeout: conn.timeout,
            tls,
            end_marker: None,
        })
    }

    /// Sets the response terminator line.
    pub fn with_end_marker(mut self, marker: impl Into<String>) -> Self {
        self.end_marker = Some(marker.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Endpoint {
    Unix(PathBuf),
    Tcp(String),
}

/// Production [`ControlClient`] backed by real sockets.
pub struct RemoteControlClient {
    endpoint: Endpoint,
    timeout: Duration,
    tls: Option<TlsConnector>,
    end_marker: Option<String>,
}

impl RemoteControlClient {
    /// Builds the client, loading TLS material up front.
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        if config.timeout.is_zero() {
            return Err(TransportError::Config("timeout must be positive".to_string()));
        }

        let endpoint = if is_unix_socket(&config.address) {
            Endpoint::Unix(PathBuf::from(&config.address))
        } else {
            Endpoint::Tcp(config.address.clone())
        };

        let tls = match (&endpoint, &config.tls) {
            (Endpoint::Tcp(_), Some(settings)) => Some(build_connector(settings)?),
            _ => None,
        };

        Ok(Self {
            endpoint,
            timeout: config.timeout,
            tls,
            end_marker: config.end_marker,
        })
    }

    /// Returns true if exchanges go over a domain socket.
    pub fn is_unix(&self) -> bool {
        matches!(self.endpoint, Endpoint::Unix(_))
    }

    /// Returns true if exchanges are TLS protected.
    pub fn uses_tls(&self) -> bool {
        self.tls.is_some()
    }

    fn connect(&self, deadline: Instant) -> Result<Connection, TransportError> {
        match &self.endpoint {
            Endpoint::Unix(path) => connect_unix(path, deadline),
            Endpoint::Tcp(address) => {
                let stream = Timed::new(connect_tcp(address, deadline)?, deadline);
                let Some(connector) = &self.tls else {
                    return Ok(Connection::Tcp(stream));
                };

                match connector.connect(host_of(address), stream) {
                    Ok(tls) => Ok(Connection::Tls(Box::new(tls))),
                    Err(HandshakeError::WouldBlock(_)) => Err(TransportError::Timeout),
                    Err(HandshakeError::Failure(e)) => {
                        Err(TransportError::Tls(format!("handshake with '{}': {}", address, e)))
                    }
                }
            }
        }
    }

    fn exchange(&self, conn: Connection, command: &str) -> Result<Vec<String>, TransportError> {
        let mut reader = BufReader::new(conn);

        let request = format!("{}{}\n", PROTOCOL_PREFIX, command);
        reader
            .get_mut()
            .write_all(request.as_bytes())
            .map_err(io_error)?;
        reader.get_mut().flush().map_err(io_error)?;

        let mut lines = Vec::new();
        let mut buf = String::new();
        loop {
            buf.clear();
            match (&mut reader).take(MAX_LINE_BYTES as u64 + 1).read_line(&mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                // TLS peers often drop the socket without close_notify.
                Err(e) if is_abrupt_close(&e) && !lines.is_empty() => break,
                Err(e) => return Err(io_error(e)),
            }
            if buf.len() > MAX_LINE_BYTES && !buf.ends_with('\n') {
                return Err(TransportError::Io(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("response line exceeds {} bytes", MAX_LINE_BYTES),
                )));
            }

            let line = buf.trim_end_matches(['\r', '\n']);
            if self.end_marker.as_deref() == Some(line) {
                break;
            }
            lines.push(line.to_string());

            if lines.len() >= MAX_RESPONSE_LINES {
                warn!(lines = lines.len(), "response too long, truncating");
                break;
            }
        }

        Ok(lines)
    }
}

impl ControlClient for RemoteControlClient {
    fn send(&mut self, command: &str) -> Result<Vec<String>, TransportError> {
        let deadline = Instant::now() + self.timeout;
        let conn = self.connect(deadline)?;
        let lines = self.exchange(conn, command)?;

        if let Some(first) = lines.first()
            && first.starts_with("error")
        {
            return Err(TransportError::Server(first.clone()));
        }

        debug!(command, lines = lines.len(), "remote-control exchange complete");
        Ok(lines)
    }
}

enum Connection {
    #[cfg(unix)]
    Unix(Timed<UnixStream>),
    Tcp(Timed<TcpStream>),
    Tls(Box<TlsStream<Timed<TcpStream>>>),
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            #[cfg(unix)]
            Connection::Unix(s) => s.read(buf),
            Connection::Tcp(s) => s.read(buf),
            Connection::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            #[cfg(unix)]
            Connection::Unix(s) => s.write(buf),
            Connection::Tcp(s) => s.write(buf),
            Connection::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            #[cfg(unix)]
            Connection::Unix(s) => s.flush(),
            Connection::Tcp(s) => s.flush(),
            Connection::Tls(s) => s.flush(),
        }
    }
}

/// Socket whose blocking calls can be bounded by a remaining budget.
trait Deadline {
    fn set_timeout(&self, timeout: Duration) -> io::Result<()>;
}

impl Deadline for TcpStream {
    fn set_timeout(&self, timeout: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(timeout))?;
        self.set_write_timeout(Some(timeout))
    }
}

#[cfg(unix)]
impl Deadline for UnixStream {
    fn set_timeout(&self, timeout: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(timeout))?;
        self.set_write_timeout(Some(timeout))
    }
}

/// Stream that re-arms the socket timeout with what is left of a fixed
/// deadline before every read and write.
///
/// Once the deadline has passed every call fails with `WouldBlock`, which
/// the TLS handshake and [`io_error`] both report as a timeout.
struct Timed<S> {
    inner: S,
    deadline: Instant,
}

impl<S: Deadline> Timed<S> {
    fn new(inner: S, deadline: Instant) -> Self {
        Self { inner, deadline }
    }

    fn arm(&self) -> io::Result<()> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "deadline elapsed"));
        }
        self.inner.set_timeout(remaining)
    }
}

impl<S: Read + Deadline> Read for Timed<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.arm()?;
        self.inner.read(buf)
    }
}

impl<S: Write + Deadline> Write for Timed<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.arm()?;
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.arm()?;
        self.inner.flush()
    }
}

/// Runs a blocking call on a helper thread and stops waiting for it once
/// `deadline` passes. An abandoned call finishes in the background and its
/// result is dropped.
fn run_until<T, F>(deadline: Instant, f: F) -> io::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> io::Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("ubstat-connect".to_string())
        .spawn(move || {
            let _ = tx.send(f());
        })?;

    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            Err(io::Error::new(io::ErrorKind::TimedOut, "deadline elapsed"))
        }
        Err(RecvTimeoutError::Disconnected) => Err(io::Error::other("connect thread panicked")),
    }
}

#[cfg(unix)]
fn connect_unix(path: &Path, deadline: Instant) -> Result<Connection, TransportError> {
    let target = path.to_path_buf();
    match run_until(deadline, move || UnixStream::connect(target)) {
        Ok(stream) => Ok(Connection::Unix(Timed::new(stream, deadline))),
        Err(e) if e.kind() == io::ErrorKind::TimedOut => Err(TransportError::Timeout),
        Err(e) => Err(TransportError::Connect(path.display().to_string(), e)),
    }
}

#[cfg(not(unix))]
fn connect_unix(path: &Path, _deadline: Instant) -> Result<Connection, TransportError> {
    Err(TransportError::Connect(
        path.display().to_string(),
        io::Error::new(
            io::ErrorKind::Unsupported,
            "domain sockets are not supported on this platform",
        ),
    ))
}

fn connect_tcp(address: &str, deadline: Instant) -> Result<TcpStream, TransportError> {
    let addrs = address
        .to_socket_addrs()
        .map_err(|e| TransportError::Connect(address.to_string(), e))?;

    let mut last_err =
        io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing");
    for addr in addrs {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(TransportError::Timeout);
        }
        match TcpStream::connect_timeout(&addr, remaining) {
            Ok(stream) => return Ok(stream),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => return Err(TransportError::Timeout),
            Err(e) => last_err = e,
        }
    }

    Err(TransportError::Connect(address.to_string(), last_err))
}

fn build_connector(settings: &TlsSettings) -> Result<TlsConnector, TransportError> {
    let cert = read_pem(&settings.cert)?;
    let key = pem::to_pkcs8(&read_pem(&settings.key)?).map_err(|e| {
        TransportError::Tls(format!("loading '{}': {}", settings.key.display(), e))
    })?;
    let identity = Identity::from_pkcs8(&cert, &key)
        .map_err(|e| TransportError::Tls(format!("loading client certificate: {}", e)))?;

    let mut builder = TlsConnector::builder();
    builder.identity(identity);

    if let Some(ca) = &settings.ca {
        let pem = read_pem(ca)?;
        let root = Certificate::from_pem(&pem)
            .map_err(|e| TransportError::Tls(format!("loading '{}': {}", ca.display(), e)))?;
        builder.add_root_certificate(root);
    }

    if settings.insecure_skip_verify {
        builder
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true);
    }

    builder
        .build()
        .map_err(|e| TransportError::Tls(format!("building connector: {}", e)))
}

fn read_pem(path: &Path) -> Result<Vec<u8>, TransportError> {
    std::fs::read(path)
        .map_err(|e| TransportError::Config(format!("reading '{}': {}", path.display(), e)))
}

/// Host part of `host:port`, without IPv6 brackets.
fn host_of(address: &str) -> &str {
    let host = address
        .rsplit_once(':')
        .map(|(host, _)| host)
        .unwrap_or(address);
    host.trim_start_matches('[').trim_end_matches(']')
}

fn is_abrupt_close(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
    )
}

fn io_error(e: io::Error) -> TransportError {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransportError::Timeout,
        _ => TransportError::Io(e),
    }
}
