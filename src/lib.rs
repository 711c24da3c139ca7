//! Concurrent session harness: simulates many independent end-users that
//! register and log in against a web service, then record its event stream.

pub mod cli;
pub mod config;
pub mod identity;
pub mod log;
pub mod pool;
pub mod token;
pub mod worker;

mod prelude;
