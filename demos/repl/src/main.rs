//! Example REPL running statements in a Livy interactive session.
//!
//! Run with: cargo run -p livy-repl-example -- --endpoint http://localhost:8998
//!
//! Type code, then a line holding only the terminator (`;;` by default,
//! see `--terminator`) to run it. Blank lines are kept as part of the
//! statement. Anything pending at EOF is run, then the session is removed.

use std::{fs::File, io::BufReader, path::PathBuf, time::Duration};

use anyhow::Context;
use clap::Parser;
use livy_session_client::{LivyClient, LivyError, delete_session};
use livy_session_core::SessionConfig;
use livy_session_transport::HttpTransport;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "livy-repl", about = "Run statements in a Livy interactive session")]
struct Cli {
    /// Base URL of the Livy server
    #[arg(long, env = "LIVY_URL")]
    endpoint: Option<String>,

    /// JSON session config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Session kind
    #[arg(long)]
    kind: Option<String>,

    /// User the session runs as
    #[arg(long)]
    proxy_user: Option<String>,

    /// Session property as key=value (value parsed as JSON when possible)
    #[arg(long = "conf", value_parser = parse_conf)]
    conf: Vec<(String, Value)>,

    /// Jar to add to the session (repeatable)
    #[arg(long = "jar")]
    jars: Vec<String>,

    /// Seconds between status polls
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Per-request HTTP timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Line that ends a statement
    #[arg(long, default_value = DEFAULT_TERMINATOR)]
    terminator: String,
}

const DEFAULT_TERMINATOR: &str = ";;";

/// Collects input lines into statements ended by a terminator line.
#[derive(Debug)]
struct StatementBuffer {
    terminator: String,
    code: String,
}

impl StatementBuffer {
    fn new(terminator: impl Into<String>) -> Self {
        Self {
            terminator: terminator.into(),
            code: String::new(),
        }
    }

    /// Add a line; returns the finished statement when `line` is the
    /// terminator.
    fn push_line(&mut self, line: &str) -> Option<String> {
        if line.trim() == self.terminator {
            return self.take();
        }
        self.code.push_str(line);
        self.code.push('\n');
        None
    }

    /// Statement left over at end of input.
    fn finish(&mut self) -> Option<String> {
        self.take()
    }

    fn take(&mut self) -> Option<String> {
        let code = std::mem::take(&mut self.code);
        (!code.trim().is_empty()).then_some(code)
    }
}

fn parse_conf(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_owned()));
    Ok((key.trim().to_owned(), value))
}

fn build_config(cli: Cli) -> anyhow::Result<SessionConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open config {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => SessionConfig::new(
            cli.endpoint
                .clone()
                .context("--endpoint or LIVY_URL is required without --config")?,
        ),
    };

    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(kind) = cli.kind {
        config.kind = kind;
    }
    if let Some(proxy_user) = cli.proxy_user {
        config.proxy_user = proxy_user;
    }
    if let Some(secs) = cli.poll_interval {
        config.poll_interval = Duration::from_secs(secs);
    }
    for (key, value) in cli.conf {
        config.set_conf(key, value);
    }
    for jar in cli.jars {
        config.add_jar(jar);
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let timeout = cli.timeout.map(Duration::from_secs);
    let terminator = cli.terminator.clone();
    let config = build_config(cli)?;

    let transport = match timeout {
        Some(timeout) => HttpTransport::with_timeout(timeout)?,
        None => HttpTransport::new()?,
    };

    tracing::info!(endpoint = %config.endpoint, kind = %config.kind, "Starting session");
    let client = match LivyClient::connect(transport.clone(), config.clone()).await {
        Ok(client) => client,
        Err(e) => {
            if let LivyError::SessionInitialization { session_id, .. } = &e {
                // The server created the session before it failed.
                if let Err(cleanup) = delete_session(&transport, &config, session_id).await {
                    tracing::warn!(%session_id, "Failed to remove session, remove it manually: {cleanup}");
                }
            }
            return Err(e.into());
        }
    };

    let result = run(&client, StatementBuffer::new(terminator)).await;
    client.remove_session().await?;
    result
}

async fn run(client: &LivyClient<HttpTransport>, mut buffer: StatementBuffer) -> anyhow::Result<()> {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let statement = match lines.next_line().await? {
            Some(line) => match buffer.push_line(&line) {
                Some(code) => code,
                None => continue,
            },
            None => match buffer.finish() {
                Some(code) => code,
                None => return Ok(()),
            },
        };

        match client.submit_statement(&statement).await {
            Ok(output) => {
                stdout.write_all(output.as_bytes()).await?;
                if !output.ends_with('\n') {
                    stdout.write_all(b"\n").await?;
                }
                stdout.flush().await?;
            }
            Err(e) => tracing::error!("{e}"),
        }
    }
}
