use std::{num::NonZeroU32, path::PathBuf};


#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    #[clap(subcommand)]
    pub cmd: Command,

    /// Specifies config file location. Defaults to 'config.toml' in the
    /// working directory; if neither is given nor present, built-in defaults
    /// are used.
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Starts the given number of workers, each registering, logging in and
    /// then recording the event stream to its own log file.
    Run {
        /// Number of concurrent workers. Must be a positive integer.
        workers: NonZeroU32,
    },

    /// Checks that the configured service is reachable and that its
    /// registration form carries a token field. Useful before a real run.
    Check,

    /// Outputs a template of the configuration, including all config options
    /// with descriptions, great as a starting point.
    GenConfigTemplate {
        /// File to write it to. If unspecified, written to stdout.
        #[clap(short, long)]
        out: Option<PathBuf>,
    },
}


#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser as _;

    #[test]
    fn run_parses_positive_worker_count() {
        let cli = Cli::try_parse_from(["sse-swarm", "run", "4"]).unwrap();
        match cli.cmd {
            Command::Run { workers } => assert_eq!(workers.get(), 4),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn missing_worker_count_is_rejected() {
        assert!(Cli::try_parse_from(["sse-swarm", "run"]).is_err());
        assert!(Cli::try_parse_from(["sse-swarm"]).is_err());
    }

    #[test]
    fn non_integer_worker_count_is_rejected() {
        assert!(Cli::try_parse_from(["sse-swarm", "run", "many"]).is_err());
        assert!(Cli::try_parse_from(["sse-swarm", "run", "2.5"]).is_err());
    }

    #[test]
    fn non_positive_worker_count_is_rejected() {
        assert!(Cli::try_parse_from(["sse-swarm", "run", "0"]).is_err());
        assert!(Cli::try_parse_from(["sse-swarm", "run", "-3"]).is_err());
    }
}
