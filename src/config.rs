use std::path::{Path, PathBuf};

use confique::Config as _;
use serde::Deserialize;

use crate::{log::LogConfig, prelude::*};


/// Loads the configuration. If `path` is given, that file must exist and be
/// loadable. Otherwise `config.toml` in the working directory is used if
/// present; every option has a default, so running without any config file
/// is fine.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let mut builder = Config::builder().env();
    match path {
        Some(path) => {
            if !path.exists() {
                bail!("config file '{}' does not exist", path.display());
            }
            builder = builder.file(path);
        }
        None => builder = builder.file("config.toml"),
    }

    builder.load().context("failed to load configuration")
}

pub fn template() -> String {
    let mut options = confique::toml::FormatOptions::default();
    options.general.nested_field_gap = 2;
    confique::toml::template::<Config>(options)
}

#[derive(Debug, confique::Config)]
pub struct Config {
    #[config(nested)]
    pub service: ServiceConfig,

    #[config(nested)]
    pub pool: PoolConfig,

    #[config(nested)]
    pub log: LogConfig,
}

#[derive(Debug, confique::Config)]
pub struct ServiceConfig {
    /// Base URL of the web service to exercise. Cookies are scoped per
    /// worker, so the service sees each worker as an independent browser.
    #[config(default = "http://localhost:8080", validate = validate_base_url)]
    pub base_url: String,
}

impl ServiceConfig {
    /// Base URL without trailing slash, ready for `format!("{base}{path}")`.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

#[derive(Debug, confique::Config)]
pub struct PoolConfig {
    /// Directory receiving one event log per worker (`log-1.log`,
    /// `log-2.log`, ...). Created if it does not exist. Existing log files
    /// are truncated at worker start.
    #[config(default = "./logs")]
    pub log_directory: PathBuf,

    /// What to do when a worker fails its handshake (register or login):
    ///
    /// - "abort": cancel all sibling workers and exit with an error. This
    ///   matches the original demo client, where any handshake failure took
    ///   the whole process down.
    /// - "isolate": log the failure and keep the remaining workers running.
    #[config(default = "abort")]
    pub on_handshake_failure: FailurePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    Abort,
    Isolate,
}

fn validate_base_url(value: &String) -> Result<(), &'static str> {
    let url = reqwest::Url::parse(value).map_err(|_| "not a valid URL")?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err("scheme must be http or https");
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("must not contain a query or fragment");
    }
    Ok(())
}
