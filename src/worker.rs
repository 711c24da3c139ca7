//! The session worker: one simulated end-user.
//!
//! Each worker owns an isolated HTTP session (its own cookie jar) and its own
//! event log file. It runs three strictly sequential phases: register, login,
//! stream. The first two are the "handshake": fetch the form, extract the
//! anti-forgery token, submit it together with the worker's credentials. The
//! third consumes `GET /events` as an unbounded sequence of lines, appending
//! each one to the log and flushing before reading the next, so nothing that
//! was received is lost if the process dies mid-stream.

use std::{io, path::Path};

use futures::TryStreamExt as _;
use reqwest::StatusCode;
use serde::Serialize;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader},
};
use tokio_util::{io::StreamReader, sync::CancellationToken};

use crate::{
    identity::{Credentials, WorkerIdentity},
    prelude::*,
    token::extract_token,
};


/// Why a worker stopped before reaching the stream's end.
///
/// The register/login POST responses are deliberately *not* inspected: the
/// original flow treats submissions as fire-and-forget, and the service
/// answers them with redirects whose status carries no signal for us. Only
/// the two form *fetches* gate on status 200.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("GET /register failed")]
    RegisterFetchFailed(#[source] anyhow::Error),

    #[error("registration failed")]
    RegisterFailed(#[source] anyhow::Error),

    #[error("GET /login failed")]
    LoginFetchFailed(#[source] anyhow::Error),

    #[error("login failed")]
    LoginFailed(#[source] anyhow::Error),

    #[error("event stream failed")]
    StreamFailed(#[source] anyhow::Error),

    #[error("cannot open event log")]
    SinkFailed(#[source] anyhow::Error),
}

impl WorkerError {
    /// Whether the failure happened before streaming started. The pool's
    /// `on_handshake_failure` policy only applies to these; failures of an
    /// established stream are always isolated to their worker.
    pub fn is_handshake(&self) -> bool {
        !matches!(self, Self::StreamFailed(_))
    }
}

/// How a worker's stream phase ended when nothing went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The remote end closed the stream.
    Eof,
    /// The worker was cancelled by the pool.
    Cancelled,
}

#[derive(Debug)]
pub struct WorkerOutcome {
    pub ordinal: u32,
    pub result: Result<StreamEnd, WorkerError>,
}

#[derive(Serialize)]
struct RegisterForm<'a> {
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    password: &'a str,
    password_verify: &'a str,
    token: &'a str,
}

#[derive(Serialize)]
struct LoginForm<'a> {
    email: &'a str,
    password: &'a str,
    token: &'a str,
}

pub struct Worker {
    identity: WorkerIdentity,
    credentials: Credentials,
    session: reqwest::Client,
    base: String,
    cancel: CancellationToken,
}

impl Worker {
    /// Creates a worker with a fresh, isolated HTTP session. `base` is the
    /// service's base URL without trailing slash.
    pub fn new(
        identity: WorkerIdentity,
        base: &str,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let session = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            credentials: Credentials::for_identity(&identity),
            identity,
            session,
            base: base.to_owned(),
            cancel,
        })
    }

    /// Runs the worker to completion: handshake, then streaming until EOF,
    /// cancellation or error. Never touches anything shared with sibling
    /// workers; the outcome is returned by value for the pool to act on.
    pub async fn run(self, log_directory: &Path) -> WorkerOutcome {
        let ordinal = self.identity.ordinal();
        info!(worker = ordinal, "starting");

        WorkerOutcome { ordinal, result: self.execute(log_directory).await }
    }

    async fn execute(&self, log_directory: &Path) -> Result<StreamEnd, WorkerError> {
        // The sink is opened first and lives for the whole worker: its file
        // handle is closed on every exit path, including errors mid-stream.
        let mut sink = EventLog::create(log_directory, &self.identity).await
            .map_err(WorkerError::SinkFailed)?;

        self.register().await?;
        if self.cancel.is_cancelled() {
            return Ok(StreamEnd::Cancelled);
        }

        self.login().await?;
        if self.cancel.is_cancelled() {
            return Ok(StreamEnd::Cancelled);
        }

        self.stream(&mut sink).await
    }

    async fn register(&self) -> Result<(), WorkerError> {
        let body = self.fetch_form("/register").await
            .map_err(WorkerError::RegisterFetchFailed)?;
        let token = extract_token(&body)
            .map_err(|e| WorkerError::RegisterFailed(e.into()))?;

        let form = RegisterForm {
            first_name: self.credentials.first_name,
            last_name: &self.credentials.last_name,
            email: &self.credentials.email,
            password: self.credentials.password,
            password_verify: self.credentials.password_verify,
            token: &token,
        };
        // Response status intentionally ignored, see `WorkerError` docs.
        self.session.post(format!("{}/register", self.base))
            .form(&form)
            .send()
            .await
            .map_err(|e| WorkerError::RegisterFailed(e.into()))?;

        info!(worker = self.identity.ordinal(), "registered");
        Ok(())
    }

    async fn login(&self) -> Result<(), WorkerError> {
        let body = self.fetch_form("/login").await
            .map_err(WorkerError::LoginFetchFailed)?;
        let token = extract_token(&body)
            .map_err(|e| WorkerError::LoginFailed(e.into()))?;

        let form = LoginForm {
            email: &self.credentials.email,
            password: self.credentials.password,
            token: &token,
        };
        self.session.post(format!("{}/login", self.base))
            .form(&form)
            .send()
            .await
            .map_err(|e| WorkerError::LoginFailed(e.into()))?;

        info!(worker = self.identity.ordinal(), "logged in");
        Ok(())
    }

    /// Fetches a form page, requiring status 200, and returns its body.
    async fn fetch_form(&self, path: &str) -> Result<String> {
        let response = self.session.get(format!("{}{}", self.base, path))
            .send()
            .await
            .with_context(|| format!("GET {path}"))?;

        let status = response.status();
        if status != StatusCode::OK {
            bail!("GET {path} returned unexpected status {status}");
        }

        response.text().await
            .with_context(|| format!("failed to read body of GET {path}"))
    }

    async fn stream(&self, sink: &mut EventLog) -> Result<StreamEnd, WorkerError> {
        let response = self.session.get(format!("{}/events", self.base))
            .send()
            .await
            .map_err(|e| WorkerError::StreamFailed(e.into()))?;

        debug!(
            worker = self.identity.ordinal(),
            status = response.status().as_u16(),
            "event stream connected",
        );

        // Bridge the chunked body into buffered line reads. Chunk boundaries
        // do not align with line boundaries, so the reader reassembles lines
        // as bytes arrive.
        let chunks = response.bytes_stream().map_err(io::Error::other);
        let mut lines = BufReader::new(StreamReader::new(chunks)).lines();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return Ok(StreamEnd::Cancelled),

                next = lines.next_line() => match next {
                    Ok(Some(line)) => {
                        trace!(worker = self.identity.ordinal(), line = line.as_str(), "event received");
                        sink.append(&line).await
                            .map_err(|e| WorkerError::StreamFailed(e.into()))?;
                    }
                    Ok(None) => return Ok(StreamEnd::Eof),
                    Err(e) => return Err(WorkerError::StreamFailed(e.into())),
                },
            }
        }
    }
}


/// Append-only, write-through event log of one worker.
pub struct EventLog {
    file: File,
}

impl EventLog {
    /// Opens (and truncates) this worker's log file inside `directory`.
    pub async fn create(directory: &Path, identity: &WorkerIdentity) -> Result<Self> {
        let path = directory.join(identity.log_file_name());
        let file = File::create(&path).await
            .with_context(|| format!("failed to create event log '{}'", path.display()))?;
        Ok(Self { file })
    }

    /// Writes one event line and flushes it before returning, so a line that
    /// was handed to us is on its way to disk before the next one is read.
    pub async fn append(&mut self, line: &str) -> io::Result<()> {
        self.file.write_all(line.as_bytes()).await?;
        self.file.write_all(b"\n").await?;
        self.file.flush().await
    }
}
