//! The worker pool: spawns one task per worker and decides what a failure
//! in one worker means for its siblings.
//!
//! Workers never terminate the process themselves. Each one reports its
//! outcome by value when its task finishes, and the policy decision lives
//! here: under `abort`, the first handshake failure cancels all siblings and
//! becomes the launch error; under `isolate`, failures are logged and the
//! rest of the pool keeps going. Failures of an already established stream
//! never take down siblings.

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::{
    config::{Config, FailurePolicy},
    identity::WorkerIdentity,
    prelude::*,
    worker::{StreamEnd, Worker, WorkerError, WorkerOutcome},
};


/// Spawns `worker_count` workers and waits for all of them. Returns an error
/// if any handshake failure was pool-fatal under the configured policy.
pub async fn launch(config: &Config, worker_count: u32) -> Result<()> {
    let log_directory = &config.pool.log_directory;
    tokio::fs::create_dir_all(log_directory).await.with_context(|| {
        format!("failed to create log directory '{}'", log_directory.display())
    })?;

    info!(workers = worker_count, base_url = config.service.base(), "launching pool");

    let cancel = CancellationToken::new();
    let mut tasks = JoinSet::new();
    for ordinal in 0..worker_count {
        let worker = Worker::new(
            WorkerIdentity::new(ordinal),
            config.service.base(),
            cancel.child_token(),
        )?;
        let log_directory = log_directory.clone();
        tasks.spawn(async move { worker.run(&log_directory).await });
    }

    // First pool-fatal failure; everything after it just drains.
    let mut fatal: Option<WorkerOutcome> = None;

    while let Some(joined) = tasks.join_next().await {
        let outcome = joined.context("worker task panicked")?;
        match &outcome.result {
            Ok(StreamEnd::Eof) => {
                info!(worker = outcome.ordinal, "event stream closed by remote end");
            }
            Ok(StreamEnd::Cancelled) => {
                debug!(worker = outcome.ordinal, "worker cancelled");
            }
            Err(e) if pool_fatal(e, config.pool.on_handshake_failure) => {
                error!(worker = outcome.ordinal, "worker failed: {}", ErrorChain(e));
                cancel.cancel();
                fatal.get_or_insert(outcome);
            }
            Err(e) => {
                warn!(worker = outcome.ordinal, "worker failed, siblings continue: {}", ErrorChain(e));
            }
        }
    }

    if let Some(WorkerOutcome { ordinal, result: Err(error) }) = fatal {
        return Err(anyhow::Error::new(error)
            .context(format!("worker {ordinal} failed during handshake")));
    }
    Ok(())
}

fn pool_fatal(error: &WorkerError, policy: FailurePolicy) -> bool {
    error.is_handshake() && policy == FailurePolicy::Abort
}

/// Formats an error with all its sources, like anyhow's alternate formatting.
struct ErrorChain<'a>(&'a WorkerError);

impl std::fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = std::error::Error::source(self.0);
        while let Some(cause) = source {
            write!(f, ": {cause}")?;
            source = cause.source();
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_decides_handshake_fatality() {
        let handshake = WorkerError::RegisterFetchFailed(anyhow!("status 500"));
        let stream = WorkerError::StreamFailed(anyhow!("connection reset"));

        assert!(pool_fatal(&handshake, FailurePolicy::Abort));
        assert!(!pool_fatal(&handshake, FailurePolicy::Isolate));
        assert!(!pool_fatal(&stream, FailurePolicy::Abort));
        assert!(!pool_fatal(&stream, FailurePolicy::Isolate));
    }

    #[test]
    fn error_chain_includes_sources() {
        let error = WorkerError::RegisterFetchFailed(anyhow!("unexpected status 500"));
        let rendered = ErrorChain(&error).to_string();
        assert!(rendered.contains("register"));
        assert!(rendered.contains("500"));
    }
}
