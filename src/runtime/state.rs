use crate::diagnostics::health::{self, HealthSnapshot};
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// On-disk form of the health registry, as read back by `adpace status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeState {
    #[serde(flatten)]
    pub health: HealthSnapshot,
    pub written_at: String,
}

/// Write the current health snapshot to `path`.
pub async fn write_state(path: &Path) -> Result<()> {
    let state = RuntimeState {
        health: health::snapshot(),
        written_at: Utc::now().to_rfc3339(),
    };
    let data = serde_json::to_vec_pretty(&state).context("failed to encode runtime state")?;
    tokio::fs::write(path, data)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Last snapshot written to `path`; `None` when nothing was written yet.
pub fn read_state(path: &Path) -> Result<Option<RuntimeState>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let state = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(state))
}

/// Flush the health registry to `path` every `period` until aborted.
pub fn spawn_state_writer(path: PathBuf, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Some(parent) = path.parent()
            && let Err(error) = tokio::fs::create_dir_all(parent).await
        {
            tracing::warn!(%error, "failed to create state file directory");
        }

        let mut interval = tokio::time::interval(period.max(Duration::from_millis(100)));
        loop {
            interval.tick().await;
            if let Err(error) = write_state(&path).await {
                tracing::warn!(%error, "failed to write runtime state file");
            }
        }
    })
}
