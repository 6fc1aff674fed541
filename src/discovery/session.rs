//! Interactive session state machine.
//!
//! A [`Session`] drives one device through
//! `Disconnected -> Connecting -> PromptDetection -> Authenticated -> Executing -> Disconnected`,
//! retrying the whole sequence up to `cli.attempts` times before settling in
//! `Failed`. Every attempt owns a fresh transport through a [`TransportGuard`],
//! so the line is closed on success, error and panic alike.

use std::fmt;
use std::io;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::credentials::CliCredentials;
use super::platform::{CommandClass, DetectedPrompt, PlatformFamily, PromptSet};
use super::transport::{TransportFactory, TransportGuard};
use crate::config::CliConfig;
use crate::parser::NeighborProtocol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    Connecting,
    PromptDetection,
    Authenticated,
    Executing,
    Failed,
}

impl SessionState {
    /// Legal moves of the machine. `Failed` is absorbing; a retry re-enters
    /// `Connecting` from wherever the previous attempt stopped.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Failed, _) => false,
            (_, Failed) => true,
            (_, Connecting) => true,
            (Connecting, PromptDetection) => true,
            (PromptDetection, Authenticated) => true,
            (Authenticated, Executing) => true,
            (Executing, Disconnected) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("connection not established within {0:?}")]
    ConnectTimeout(Duration),
    #[error("no banner or prompt within {0:?}")]
    BannerTimeout(Duration),
    #[error("login did not complete within {0:?}")]
    AuthTimeout(Duration),
    #[error("credentials rejected")]
    AuthRejected,
    #[error("device asked for credentials but none are configured")]
    NoCredentials,
    #[error("no known prompt detected")]
    PromptNotDetected,
    #[error("`{command}` did not complete within {timeout:?}")]
    CommandTimeout { command: String, timeout: Duration },
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
}

/// Cleaned output of one command
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutput {
    pub command: String,
    pub protocol: Option<NeighborProtocol>,
    pub output: String,
}

/// What a successful session learned
#[derive(Debug, Clone, Serialize)]
pub struct SessionTranscript {
    pub hostname: String,
    pub platform: PlatformFamily,
    pub outputs: Vec<CommandOutput>,
}

impl SessionTranscript {
    pub fn neighbor_outputs(&self) -> impl Iterator<Item = (NeighborProtocol, &str)> {
        self.outputs
            .iter()
            .filter_map(|o| o.protocol.map(|p| (p, o.output.as_str())))
    }
}

pub struct Session<'a> {
    cli: &'a CliConfig,
    prompts: &'a PromptSet,
    state: SessionState,
    history: Vec<SessionState>,
}

impl<'a> Session<'a> {
    pub fn new(cli: &'a CliConfig, prompts: &'a PromptSet) -> Self {
        Self {
            cli,
            prompts,
            state: SessionState::Disconnected,
            history: vec![SessionState::Disconnected],
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every state entered, in order
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    fn advance(&mut self, next: SessionState) {
        if !self.state.can_transition_to(next) {
            log::warn!("ignoring illegal session transition {} -> {}", self.state, next);
            return;
        }
        log::debug!("session {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    /// Run discovery against `address`, retrying whole attempts on failure
    pub fn run(
        &mut self,
        transports: &dyn TransportFactory,
        address: &str,
        credentials: Option<&CliCredentials>,
        platform_hint: Option<PlatformFamily>,
    ) -> Result<SessionTranscript, SessionError> {
        if transports.authenticates_on_connect() && credentials.is_none() {
            self.advance(SessionState::Failed);
            return Err(SessionError::NoCredentials);
        }
        let attempts = self.cli.attempts.max(1);
        let mut last_error = SessionError::PromptNotDetected;
        for attempt in 1..=attempts {
            let mut transport = TransportGuard::new(transports.create());
            match self.attempt(&mut transport, address, credentials, platform_hint) {
                Ok(transcript) => {
                    // best effort; the guard closes the line either way
                    if let Err(e) = transport.send("exit\n") {
                        log::debug!("{}: exit not sent: {}", address, e);
                    }
                    self.advance(SessionState::Disconnected);
                    return Ok(transcript);
                }
                Err(e) => {
                    log::warn!(
                        "{}: CLI attempt {}/{} failed in {}: {}",
                        address,
                        attempt,
                        attempts,
                        self.state,
                        e
                    );
                    last_error = e;
                }
            }
        }
        self.advance(SessionState::Failed);
        Err(last_error)
    }

    fn attempt(
        &mut self,
        transport: &mut TransportGuard,
        address: &str,
        credentials: Option<&CliCredentials>,
        platform_hint: Option<PlatformFamily>,
    ) -> Result<SessionTranscript, SessionError> {
        self.advance(SessionState::Connecting);
        transport
            .connect(address, self.cli.port(), credentials, self.cli.connect_timeout)
            .map_err(|e| match e.kind() {
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                    SessionError::ConnectTimeout(self.cli.connect_timeout)
                }
                io::ErrorKind::PermissionDenied => SessionError::AuthRejected,
                _ => SessionError::Transport(e),
            })?;

        self.advance(SessionState::PromptDetection);
        let prompt = self.detect_prompt(transport, credentials)?;
        self.advance(SessionState::Authenticated);

        let platform = platform_hint.unwrap_or(prompt.platform);
        log::debug!("{}: prompt `{}`, running {} commands", address, prompt.prompt, platform);

        self.advance(SessionState::Executing);
        let mut outputs = Vec::new();
        for command in platform.commands(self.cli) {
            let timeout = match command.class {
                CommandClass::General => self.cli.command_timeout,
                CommandClass::Neighbor => self.cli.neighbor_command_timeout,
            };
            transport.send(&format!("{}\n", command.command))?;
            let mut raw = String::new();
            let complete = self.read_until(transport, &mut raw, timeout, |out| prompt.is_complete(out))?;
            if !complete {
                return Err(SessionError::CommandTimeout {
                    command: command.command,
                    timeout,
                });
            }
            outputs.push(CommandOutput {
                output: clean_output(&raw, &command.command, &prompt.prompt),
                command: command.command,
                protocol: command.protocol,
            });
        }

        Ok(SessionTranscript {
            hostname: prompt.hostname,
            platform,
            outputs,
        })
    }

    /// Wait for a banner, answer login challenges, and settle on a prompt
    fn detect_prompt(
        &self,
        transport: &mut TransportGuard,
        credentials: Option<&CliCredentials>,
    ) -> Result<DetectedPrompt, SessionError> {
        let mut buffer = String::new();
        self.read_until(transport, &mut buffer, self.cli.banner_timeout, |out| {
            self.is_login_point(out)
        })?;
        if buffer.trim().is_empty() {
            return Err(SessionError::BannerTimeout(self.cli.banner_timeout));
        }

        if self.prompts.is_username_challenge(&buffer) || self.prompts.is_password_challenge(&buffer) {
            buffer = self.authenticate(transport, buffer, credentials)?;
        }
        if let Some(prompt) = self.prompts.detect(&buffer) {
            return Ok(prompt);
        }

        // some devices print a banner and wait for a keypress
        transport.send("\n")?;
        let mut buffer = String::new();
        self.read_until(transport, &mut buffer, self.cli.prompt_timeout, |out| {
            self.prompts.detect(out).is_some()
        })?;
        self.prompts
            .detect(&buffer)
            .ok_or(SessionError::PromptNotDetected)
    }

    fn is_login_point(&self, output: &str) -> bool {
        self.prompts.is_username_challenge(output)
            || self.prompts.is_password_challenge(output)
            || self.prompts.detect(output).is_some()
    }

    fn authenticate(
        &self,
        transport: &mut TransportGuard,
        mut buffer: String,
        credentials: Option<&CliCredentials>,
    ) -> Result<String, SessionError> {
        let credentials = credentials.ok_or(SessionError::NoCredentials)?;
        let deadline = Instant::now() + self.cli.auth_timeout;
        let mut sent_username = false;
        let mut sent_password = false;
        loop {
            if self.prompts.detect(&buffer).is_some() {
                return Ok(buffer);
            }
            if self.prompts.is_username_challenge(&buffer) {
                if sent_username {
                    return Err(SessionError::AuthRejected);
                }
                transport.send(&format!("{}\n", credentials.username))?;
                sent_username = true;
            } else if self.prompts.is_password_challenge(&buffer) {
                if sent_password {
                    return Err(SessionError::AuthRejected);
                }
                transport.send(&format!("{}\n", credentials.password))?;
                sent_password = true;
            } else {
                return Err(SessionError::AuthTimeout(self.cli.auth_timeout));
            }

            buffer.clear();
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !self.read_until(transport, &mut buffer, remaining, |out| self.is_login_point(out))? {
                return Err(SessionError::AuthTimeout(self.cli.auth_timeout));
            }
        }
    }

    /// Accumulate output into `buffer` until `done` holds or `timeout` elapses
    fn read_until<F>(
        &self,
        transport: &mut TransportGuard,
        buffer: &mut String,
        timeout: Duration,
        done: F,
    ) -> Result<bool, SessionError>
    where
        F: Fn(&str) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if !buffer.is_empty() && done(buffer) {
                return Ok(true);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }
            let chunk = transport.receive(self.cli.poll_interval.min(remaining))?;
            buffer.push_str(&chunk);
        }
    }
}

/// Drop carriage returns, the echoed command and the trailing prompt
pub fn clean_output(raw: &str, command: &str, prompt: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "");
    let mut lines: Vec<&str> = text.lines().collect();
    if lines
        .first()
        .is_some_and(|first| first.trim().ends_with(command.trim()))
    {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    if lines.last().is_some_and(|l| l.trim() == prompt) {
        lines.pop();
    }
    lines.join("\n")
}
