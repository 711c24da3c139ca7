use std::{fs, io::{self, Write}};

use anyhow::{Context as _, Result, bail};
use clap::Parser as _;
use tracing::info;

use sse_swarm::{
    cli::{Cli, Command},
    config::{self, Config},
    log, pool, token,
};


#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Run { workers } => {
            let config = config::load(cli.config.as_deref())?;
            log::init(&config.log)?;
            pool::launch(&config, workers.get()).await?;
        }

        Command::Check => {
            let config = config::load(cli.config.as_deref())?;
            log::init(&config.log)?;
            check(&config).await?;
        }

        Command::GenConfigTemplate { out } => {
            let template = config::template();
            match out {
                Some(path) => fs::write(path, &template)?,
                None => io::stdout().write_all(template.as_bytes())?,
            }
        }
    }

    Ok(())
}

/// Fetches the registration form once to verify the service is reachable and
/// its form actually carries a token field.
async fn check(config: &Config) -> Result<()> {
    let client = reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .context("failed to build HTTP client")?;

    let url = format!("{}/register", config.service.base());
    let response = client.get(&url).send().await
        .with_context(|| format!("cannot reach service at {url}"))?;
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        bail!("GET {url} returned unexpected status {status}");
    }

    let body = response.text().await.context("failed to read registration form")?;
    token::extract_token(&body)
        .context("registration form has no usable token field")?;

    info!("service reachable, registration form carries a token field");
    Ok(())
}
