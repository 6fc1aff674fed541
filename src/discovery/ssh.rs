//! SSH line for interactive sessions, built on `russh`.
//!
//! russh is async. Each [`SshTransport`] owns a current-thread tokio runtime
//! and blocks on it, so the session state machine and the rayon workers that
//! drive it stay synchronous. Password authentication happens during
//! `connect`; the session then only sees the device's shell.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use russh::client::{self, Handle, Msg};
use russh::{Channel, ChannelMsg, Disconnect};
use tokio::runtime::{Builder, Runtime};

use super::credentials::CliCredentials;
use super::transport::{Transport, TransportFactory};

/// Host keys are not pinned
struct AcceptHostKey;

impl client::Handler for AcceptHostKey {
    type Error = russh::Error;

    async fn check_server_key(&mut self, _key: &russh::keys::PublicKey) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Reassembles UTF-8 text whose characters straddle channel messages
#[derive(Debug, Default)]
pub(crate) struct Utf8Buffer {
    pending: Vec<u8>,
}

impl Utf8Buffer {
    /// Decode everything complete so far; an unfinished trailing sequence is
    /// held back for the next push and invalid bytes become U+FFFD.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut text = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(rest) => {
                    text.push_str(rest);
                    self.pending.clear();
                    return text;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    text.push_str(std::str::from_utf8(&self.pending[..valid]).unwrap_or_default());
                    match e.error_len() {
                        None => {
                            self.pending.drain(..valid);
                            return text;
                        }
                        Some(bad) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                    }
                }
            }
        }
    }
}

fn ssh_error(e: russh::Error) -> io::Error {
    io::Error::other(e.to_string())
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "transport not connected")
}

/// Interactive shell over SSH with password authentication
#[derive(Default)]
pub struct SshTransport {
    runtime: Option<Runtime>,
    session: Option<Handle<AcceptHostKey>>,
    channel: Option<Channel<Msg>>,
    output: Utf8Buffer,
}

impl SshTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for SshTransport {
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        credentials: Option<&CliCredentials>,
        timeout: Duration,
    ) -> io::Result<()> {
        let credentials = credentials
            .ok_or_else(|| io::Error::new(io::ErrorKind::PermissionDenied, "no SSH credentials"))?;
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let config = Arc::new(client::Config::default());

        let (session, channel) = runtime.block_on(async {
            let mut session = tokio::time::timeout(timeout, client::connect(config, (host, port), AcceptHostKey))
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "SSH handshake timed out"))?
                .map_err(ssh_error)?;

            let auth = session
                .authenticate_password(credentials.username.clone(), credentials.password.clone())
                .await
                .map_err(ssh_error)?;
            if !auth.success() {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "password authentication rejected",
                ));
            }

            let mut channel = session.channel_open_session().await.map_err(ssh_error)?;
            channel
                .request_pty(false, "vt100", 200, 24, 0, 0, &[])
                .await
                .map_err(ssh_error)?;
            channel.request_shell(false).await.map_err(ssh_error)?;
            Ok::<_, io::Error>((session, channel))
        })?;

        log::debug!("{}: SSH shell open as {}", host, credentials.username);
        self.runtime = Some(runtime);
        self.session = Some(session);
        self.channel = Some(channel);
        Ok(())
    }

    fn send(&mut self, data: &str) -> io::Result<()> {
        let (Some(runtime), Some(channel)) = (self.runtime.as_ref(), self.channel.as_mut()) else {
            return Err(not_connected());
        };
        runtime.block_on(channel.data(data.as_bytes())).map_err(ssh_error)
    }

    fn receive(&mut self, wait: Duration) -> io::Result<String> {
        let Self {
            runtime: Some(runtime),
            channel: Some(channel),
            output,
            ..
        } = self
        else {
            return Err(not_connected());
        };

        let message = runtime.block_on(async { tokio::time::timeout(wait, channel.wait()).await });
        match message {
            // quiet line
            Err(_) => Ok(String::new()),
            Ok(Some(ChannelMsg::Data { data })) | Ok(Some(ChannelMsg::ExtendedData { data, .. })) => {
                Ok(output.push(&data))
            }
            Ok(Some(ChannelMsg::Eof)) | Ok(Some(ChannelMsg::Close)) | Ok(None) => Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "channel closed by device",
            )),
            Ok(Some(_)) => Ok(String::new()),
        }
    }

    fn close(&mut self) {
        self.channel = None;
        if let (Some(runtime), Some(session)) = (self.runtime.take(), self.session.take()) {
            let result = runtime.block_on(session.disconnect(Disconnect::ByApplication, "", "en"));
            if let Err(e) = result {
                log::debug!("SSH disconnect failed: {}", e);
            }
        }
    }
}

/// Factory for [`SshTransport`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SshTransportFactory;

impl TransportFactory for SshTransportFactory {
    fn create(&self) -> Box<dyn Transport> {
        Box::new(SshTransport::new())
    }

    fn authenticates_on_connect(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PatternConfig;
    use crate::discovery::platform::{PlatformFamily, PromptSet};
    use crate::discovery::session::tests::fast_cli;
    use crate::discovery::session::{Session, SessionError, SessionState};
    use crate::parser::NeighborProtocol;
    use std::collections::VecDeque;
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// An SSH-style shell: credentials are checked at connect, output arrives
    /// as raw byte messages cut at arbitrary points
    struct ShellLine {
        password: String,
        messages: VecDeque<Vec<u8>>,
        replies: Vec<(String, Vec<Vec<u8>>)>,
        output: Utf8Buffer,
    }

    impl Transport for ShellLine {
        fn connect(
            &mut self,
            _host: &str,
            _port: u16,
            credentials: Option<&CliCredentials>,
            _timeout: Duration,
        ) -> io::Result<()> {
            match credentials {
                Some(c) if c.password == self.password => Ok(()),
                _ => Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
            }
        }

        fn send(&mut self, data: &str) -> io::Result<()> {
            let line = data.trim_end_matches('\n');
            if let Some(pos) = self.replies.iter().position(|(input, _)| line.starts_with(input.as_str())) {
                let (_, chunks) = self.replies.remove(pos);
                self.messages.extend(chunks);
            }
            Ok(())
        }

        fn receive(&mut self, _wait: Duration) -> io::Result<String> {
            match self.messages.pop_front() {
                Some(bytes) => Ok(self.output.push(&bytes)),
                None => Ok(String::new()),
            }
        }

        fn close(&mut self) {}
    }

    struct ShellFactory {
        line: Mutex<Option<ShellLine>>,
        created: AtomicUsize,
    }

    impl TransportFactory for ShellFactory {
        fn create(&self) -> Box<dyn Transport> {
            self.created.fetch_add(1, Ordering::SeqCst);
            let line = self.line.lock().unwrap().take();
            Box::new(line.unwrap_or_else(|| ShellLine {
                password: String::new(),
                messages: VecDeque::new(),
                replies: Vec::new(),
                output: Utf8Buffer::default(),
            }))
        }

        fn authenticates_on_connect(&self) -> bool {
            true
        }
    }

    /// Split `text` into byte messages of at most `size` bytes
    fn cut(text: &str, size: usize) -> Vec<Vec<u8>> {
        text.as_bytes().chunks(size).map(<[u8]>::to_vec).collect()
    }

    fn shell() -> ShellLine {
        let lldp = "show lldp neighbors detail\r\nChassis id: 0011.2233.4455\r\nLocal Port id: Gi1/0/1\r\nSystem Name: küche-sw\r\nPort id: Gi0/2\r\naccess-1#";
        ShellLine {
            password: "pw".to_string(),
            // no login dialogue, the prompt arrives in two pieces
            messages: VecDeque::from(vec![b"\r\nacc".to_vec(), b"ess-1#".to_vec()]),
            replies: vec![
                ("terminal length 0".to_string(), cut("terminal length 0\r\naccess-1#", 5)),
                ("show lldp".to_string(), cut(lldp, 3)),
                ("show cdp".to_string(), cut("show cdp neighbors detail\r\naccess-1#", 4)),
            ],
            output: Utf8Buffer::default(),
        }
    }

    fn creds(password: &str) -> CliCredentials {
        CliCredentials {
            username: "admin".to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_utf8_split_across_messages() {
        let mut buffer = Utf8Buffer::default();
        let bytes = "kü".as_bytes();
        assert_eq!(buffer.push(&bytes[..2]), "k");
        assert_eq!(buffer.push(&bytes[2..]), "ü");
        assert_eq!(buffer.push(b"a\xffb"), "a\u{fffd}b");
        assert_eq!(buffer.push(b""), "");
    }

    #[test]
    fn test_session_over_shell_line() {
        let cli = fast_cli();
        let prompts = PromptSet::compile(&PatternConfig::default()).unwrap();
        let factory = ShellFactory {
            line: Mutex::new(Some(shell())),
            created: AtomicUsize::new(0),
        };

        let mut session = Session::new(&cli, &prompts);
        let transcript = session.run(&factory, "10.0.0.9", Some(&creds("pw")), None).unwrap();

        assert_eq!(transcript.hostname, "access-1");
        assert_eq!(transcript.platform, PlatformFamily::CiscoIos);
        let (protocol, lldp) = transcript.neighbor_outputs().next().unwrap();
        assert_eq!(protocol, NeighborProtocol::Lldp);
        assert!(lldp.contains("System Name: küche-sw"));
        assert!(!lldp.contains("access-1#"));
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_missing_credentials_skip_connecting() {
        let cli = fast_cli();
        let prompts = PromptSet::compile(&PatternConfig::default()).unwrap();
        let factory = ShellFactory {
            line: Mutex::new(Some(shell())),
            created: AtomicUsize::new(0),
        };
        let mut session = Session::new(&cli, &prompts);
        let err = session.run(&factory, "10.0.0.9", None, None).unwrap_err();
        assert!(matches!(err, SessionError::NoCredentials));
        assert_eq!(factory.created.load(Ordering::SeqCst), 0);
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_rejected_password() {
        let cli = fast_cli();
        let prompts = PromptSet::compile(&PatternConfig::default()).unwrap();
        let factory = ShellFactory {
            line: Mutex::new(Some(shell())),
            created: AtomicUsize::new(0),
        };
        let mut session = Session::new(&cli, &prompts);
        let err = session.run(&factory, "10.0.0.9", Some(&creds("wrong")), None).unwrap_err();
        assert!(matches!(err, SessionError::AuthRejected));
    }

    #[test]
    fn test_ssh_transport_unconnected_and_refused() {
        let mut transport = SshTransport::new();
        assert_eq!(
            transport.receive(Duration::from_millis(1)).unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
        assert!(transport.send("exit\n").is_err());

        // a port nobody listens on any more
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let result = transport.connect("127.0.0.1", port, Some(&creds("pw")), Duration::from_secs(2));
        assert!(result.is_err());
        assert!(SshTransportFactory.authenticates_on_connect());
        transport.close();
    }
}
