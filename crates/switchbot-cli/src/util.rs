//! Utility functions for CLI operations.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use switchbot_core::{BleTransport, ConnectionConfig, RetryConfig, Session, with_retry};
use tracing::debug;

use crate::cli::DeviceArgs;
use crate::config::{
    Config, resolve_alias, resolve_max_retry, resolve_password, resolve_timeout,
};

/// A Bot to connect to, with every setting resolved.
#[derive(Debug, Clone)]
pub struct Target {
    /// What the user typed (address or alias).
    pub name: String,
    /// Address after alias resolution.
    pub address: String,
    pub timeout: Duration,
    pub retry: RetryConfig,
    pub password: Option<String>,
}

impl Target {
    /// Resolve `args` against the config file.
    pub fn resolve(args: DeviceArgs, config: &Config) -> Self {
        let address = resolve_alias(&args.address, config);
        let timeout = Duration::from_secs(resolve_timeout(args.timeout, config));
        let max_retry = resolve_max_retry(args.max_retry, config);
        let password = resolve_password(args.password, &args.address, &address, config);

        if address != args.address {
            debug!("Using alias '{}' -> {}", args.address, address);
        }

        Self {
            name: args.address,
            address,
            timeout,
            retry: RetryConfig::for_command().max_retries(max_retry),
            password,
        }
    }

    /// Connection settings for one attempt.
    ///
    /// The timeout bounds the connect as a whole and each write and reply
    /// after it.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::default()
            .connection_timeout(self.timeout)
            .discovery_timeout(self.timeout)
            .write_timeout(self.timeout)
            .response_timeout(Some(self.timeout))
    }

    /// Connect, run `op` on the session, and disconnect.
    ///
    /// Every retry attempt opens a fresh connection.
    pub async fn run<T, F>(&self, operation: &str, op: F) -> Result<T>
    where
        F: AsyncFn(&mut Session<BleTransport>) -> switchbot_core::Result<T>,
    {
        with_retry(&self.retry, operation, || async {
            let mut session =
                Session::connect_with_config(&self.address, self.connection_config()).await?;
            if let Some(password) = &self.password {
                session.set_password(password);
            }

            let result = op(&mut session).await;
            if let Err(e) = session.disconnect().await {
                debug!("Disconnect failed: {}", e);
            }
            result
        })
        .await
        .with_context(|| format!("{} failed for SwitchBot {}", operation, self.name))
    }
}

/// Write output to file or stdout.
pub fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}
