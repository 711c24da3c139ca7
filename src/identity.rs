//! Deterministic fake identities for workers.
//!
//! Each worker is assigned an ordinal at launch, and everything else (email,
//! name, log file name) is derived from that ordinal. Re-running with the
//! same worker count therefore talks to the service with the same set of
//! accounts and writes to the same set of log files.

/// Password used by all fake accounts.
const PASSWORD: &str = "secret";

/// First name shared by all fake accounts.
const FIRST_NAME: &str = "Demo";


/// Identity of a single worker, fixed for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerIdentity {
    ordinal: u32,
}

impl WorkerIdentity {
    pub fn new(ordinal: u32) -> Self {
        Self { ordinal }
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub fn email(&self) -> String {
        format!("demo{}@example.com", self.ordinal)
    }

    pub fn last_name(&self) -> String {
        format!("Mc{}", self.ordinal)
    }

    /// Name of this worker's event log file. Ordinals are 0-based but log
    /// files are numbered from 1, matching what operators expect to see in
    /// the log directory.
    pub fn log_file_name(&self) -> String {
        format!("log-{}.log", self.ordinal + 1)
    }
}

/// The full credential set submitted on registration. Derived solely from a
/// [`WorkerIdentity`], never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: &'static str,
    pub password_verify: &'static str,
    pub first_name: &'static str,
    pub last_name: String,
}

impl Credentials {
    pub fn for_identity(identity: &WorkerIdentity) -> Self {
        Self {
            email: identity.email(),
            password: PASSWORD,
            password_verify: PASSWORD,
            first_name: FIRST_NAME,
            last_name: identity.last_name(),
        }
    }
}
