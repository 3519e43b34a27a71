//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{load_config, AppConfig};
use crate::error::{Error, Result};
use crate::sync::SyncEngine;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Sync => self.sync().await,
            Commands::Watch { interval } => self.watch(*interval).await,
            Commands::Status => self.status().await,
            Commands::Get { id } => self.get(id).await,
            Commands::Reset => self.reset().await,
            Commands::Validate => self.validate(),
        }
    }

    fn load_config(&self) -> Result<AppConfig> {
        load_config(&self.cli.config)
    }

    /// Wire the remote source and both stores into an engine
    pub fn build_engine(config: &AppConfig) -> Result<SyncEngine> {
        let remote = Arc::new(config.remote_source()?);
        let engine = SyncEngine::new(remote, config.checkpoint_store()?, config.mirror_store()?)
            .with_config(config.sync_config());
        Ok(engine)
    }

    /// Run one pass
    async fn sync(&self) -> Result<()> {
        let config = self.load_config()?;
        let mut engine = Self::build_engine(&config)?;

        let report = engine.run_sync().await?;
        self.output_message(&json!({
            "type": "SYNC",
            "collection": config.collection,
            "report": report,
        }));
        Ok(())
    }

    /// Run passes until Ctrl-C or a non-retryable error
    async fn watch(&self, interval_secs: u64) -> Result<()> {
        if interval_secs == 0 {
            return Err(Error::invalid_value("interval", "must be at least one second"));
        }

        let config = self.load_config()?;
        let mut engine = Self::build_engine(&config)?;
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Watching '{}' every {}s (Ctrl-C to stop)",
            config.collection, interval_secs
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, stopping");
                    break;
                }
            }

            match engine.run_sync().await {
                Ok(report) => self.output_message(&json!({
                    "type": "SYNC",
                    "collection": config.collection,
                    "report": report,
                })),
                Err(e) if e.is_retryable() => {
                    warn!("Sync failed, retrying in {}s: {}", interval_secs, e);
                    self.output_log("WARN", &e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        self.output_message(&json!({
            "type": "STATS",
            "collection": config.collection,
            "stats": engine.stats(),
        }));
        Ok(())
    }

    /// Show checkpoint and mirror size
    async fn status(&self) -> Result<()> {
        let config = self.load_config()?;
        let checkpoint = config.checkpoint_store()?.get().await?;
        let entries = config.mirror_store()?.len().await?;

        self.output_message(&json!({
            "type": "STATUS",
            "collection": config.collection,
            "checkpoint": checkpoint,
            "next_sync": if checkpoint.is_some() { "incremental" } else { "full" },
            "entries": entries,
        }));
        Ok(())
    }

    /// Print a mirrored payload
    async fn get(&self, id: &str) -> Result<()> {
        let config = self.load_config()?;
        let payload = config
            .mirror_store()?
            .get(id)
            .await?
            .ok_or_else(|| Error::Other(format!("No mirror entry for '{id}'")))?;

        // Payloads from the HTTP source are JSON; anything else is printed as a string
        let payload = serde_json::from_str::<Value>(&payload).unwrap_or(Value::String(payload));
        self.output_message(&json!({
            "type": "RECORD",
            "id": id,
            "payload": payload,
        }));
        Ok(())
    }

    /// Clear checkpoint and mirror
    async fn reset(&self) -> Result<()> {
        let config = self.load_config()?;
        config.checkpoint_store()?.clear().await?;
        config.mirror_store()?.clear().await?;

        self.output_log(
            "INFO",
            &format!(
                "Cleared checkpoint and mirror for '{}'; the next sync is a full sync",
                config.collection
            ),
        );
        Ok(())
    }

    /// Validate the config file
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;
        config.remote_source()?;

        self.output_log(
            "INFO",
            &format!(
                "Config '{}' is valid for collection '{}'",
                self.cli.config.display(),
                config.collection
            ),
        );
        Ok(())
    }

    fn output_log(&self, level: &str, message: &str) {
        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": level,
                "message": message,
            }
        }));
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
