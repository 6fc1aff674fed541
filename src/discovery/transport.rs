//! Byte transports for interactive sessions.
//!
//! SSH ([`super::ssh`]) is the default line; the telnet-style TCP transport
//! here is opt-in through `cli.protocol: telnet`.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use super::credentials::CliCredentials;

/// A bidirectional text channel to one device
pub trait Transport: Send {
    /// Open the line. Transports that authenticate during the handshake use
    /// `credentials` and report a rejection as `PermissionDenied`; the others
    /// ignore them and leave the login dialogue to the session.
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        credentials: Option<&CliCredentials>,
        timeout: Duration,
    ) -> io::Result<()>;

    fn send(&mut self, data: &str) -> io::Result<()>;

    /// Whatever arrives within `wait`; an empty string means the line was quiet.
    fn receive(&mut self, wait: Duration) -> io::Result<String>;

    fn close(&mut self);
}

/// Creates one fresh transport per session attempt
pub trait TransportFactory: Send + Sync {
    fn create(&self) -> Box<dyn Transport>;

    /// Whether `connect` itself needs credentials
    fn authenticates_on_connect(&self) -> bool {
        false
    }
}

/// Owns a transport for the duration of one attempt and closes it on every exit path
pub struct TransportGuard {
    inner: Box<dyn Transport>,
}

impl TransportGuard {
    pub fn new(inner: Box<dyn Transport>) -> Self {
        Self { inner }
    }
}

impl Deref for TransportGuard {
    type Target = dyn Transport;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DerefMut for TransportGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut()
    }
}

impl Drop for TransportGuard {
    fn drop(&mut self) {
        self.inner.close();
    }
}

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

/// Plain TCP line, telnet-style. Option negotiation is refused and stripped.
#[derive(Default)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn stream(&mut self) -> io::Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "transport not connected"))
    }
}

/// Split telnet commands out of `data`; returns the payload and the replies to send
fn filter_telnet(data: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut payload = Vec::with_capacity(data.len());
    let mut replies = Vec::new();
    let mut i = 0;
    while i < data.len() {
        if data[i] != IAC {
            payload.push(data[i]);
            i += 1;
            continue;
        }
        match data.get(i + 1).copied() {
            Some(IAC) => {
                payload.push(IAC);
                i += 2;
            }
            Some(verb @ (DO | DONT | WILL | WONT)) => {
                if let Some(&option) = data.get(i + 2) {
                    match verb {
                        DO => replies.extend_from_slice(&[IAC, WONT, option]),
                        WILL => replies.extend_from_slice(&[IAC, DONT, option]),
                        _ => {}
                    }
                }
                i += 3;
            }
            Some(SB) => {
                // skip to IAC SE
                let mut j = i + 2;
                while j + 1 < data.len() && !(data[j] == IAC && data[j + 1] == SE) {
                    j += 1;
                }
                i = j + 2;
            }
            Some(_) => i += 2,
            None => i += 1,
        }
    }
    (payload, replies)
}

impl Transport for TcpTransport {
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        _credentials: Option<&CliCredentials>,
        timeout: Duration,
    ) -> io::Result<()> {
        let mut last_error = None;
        for addr in (host, port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("cannot resolve {}", host))
        }))
    }

    fn send(&mut self, data: &str) -> io::Result<()> {
        let stream = self.stream()?;
        stream.write_all(data.as_bytes())?;
        stream.flush()
    }

    fn receive(&mut self, wait: Duration) -> io::Result<String> {
        let stream = self.stream()?;
        stream.set_read_timeout(Some(wait.max(Duration::from_millis(1))))?;
        let mut buf = [0u8; 4096];
        let n = match stream.read(&mut buf) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionAborted,
                    "connection closed by device",
                ))
            }
            Ok(n) => n,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return Ok(String::new())
            }
            Err(e) => return Err(e),
        };
        let (payload, replies) = filter_telnet(&buf[..n]);
        if !replies.is_empty() {
            stream.write_all(&replies)?;
        }
        Ok(String::from_utf8_lossy(&payload).into_owned())
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

/// Factory for [`TcpTransport`] (telnet)
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpTransportFactory;

impl TransportFactory for TcpTransportFactory {
    fn create(&self) -> Box<dyn Transport> {
        Box::new(TcpTransport::new())
    }
}
