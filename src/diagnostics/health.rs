//! Process-wide component health.
//!
//! The coordinator, its supervisor and every page observer report here; the
//! `watch` command flushes [`snapshot`] to disk and `status` prints it.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{OnceLock, RwLock};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ComponentState {
    Starting,
    Ok,
    Error,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentState,
    pub updated_at: String,
    pub last_ok: Option<String>,
    pub last_error: Option<String>,
    pub restart_count: u64,
    pub error_count: u64,
    /// Free-form state worth showing, e.g. a page's last classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ComponentHealth {
    fn starting(now: String) -> Self {
        Self {
            status: ComponentState::Starting,
            updated_at: now,
            last_ok: None,
            last_error: None,
            restart_count: 0,
            error_count: 0,
            detail: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub pid: u32,
    pub updated_at: String,
    pub uptime_seconds: u64,
    pub components: BTreeMap<String, ComponentHealth>,
}

struct Registry {
    started_at: Instant,
    components: RwLock<BTreeMap<String, ComponentHealth>>,
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| Registry {
        started_at: Instant::now(),
        components: RwLock::new(BTreeMap::new()),
    })
}

fn timestamp() -> String {
    Utc::now().to_rfc3339()
}

fn update(name: &str, apply: impl FnOnce(&mut ComponentHealth, &str)) {
    let Ok(mut components) = registry().components.write() else {
        return;
    };
    let now = timestamp();
    let entry = components
        .entry(name.to_string())
        .or_insert_with(|| ComponentHealth::starting(now.clone()));
    apply(entry, &now);
    entry.updated_at = now;
}

pub fn mark_component_ok(name: &str) {
    update(name, |entry, now| {
        entry.status = ComponentState::Ok;
        entry.last_ok = Some(now.to_string());
        entry.last_error = None;
    });
}

#[allow(clippy::needless_pass_by_value)]
pub fn mark_component_error(name: &str, error: impl ToString) {
    let message = error.to_string();
    update(name, move |entry, _| {
        entry.status = ComponentState::Error;
        entry.last_error = Some(message);
        entry.error_count = entry.error_count.saturating_add(1);
    });
}

pub fn mark_component_stopped(name: &str) {
    update(name, |entry, _| entry.status = ComponentState::Stopped);
}

pub fn bump_component_restart(name: &str) {
    update(name, |entry, _| {
        entry.restart_count = entry.restart_count.saturating_add(1);
    });
}

pub fn set_component_detail(name: &str, detail: impl Into<String>) {
    let detail = detail.into();
    update(name, move |entry, _| entry.detail = Some(detail));
}

pub fn component(name: &str) -> Option<ComponentHealth> {
    registry()
        .components
        .read()
        .ok()
        .and_then(|components| components.get(name).cloned())
}

pub fn snapshot() -> HealthSnapshot {
    let components = registry()
        .components
        .read()
        .map(|components| components.clone())
        .unwrap_or_default();
    HealthSnapshot {
        pid: std::process::id(),
        updated_at: timestamp(),
        uptime_seconds: registry().started_at.elapsed().as_secs(),
        components,
    }
}
