use thiserror::Error;

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid indicator rule '{rule}': {message}")]
    Indicator { rule: String, message: String },
}

// ─── Settings storage errors ────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("read failed: {0}")]
    Read(String),

    #[error("write failed: {0}")]
    Write(String),

    #[error("encode failed: {0}")]
    Encode(String),
}

// ─── Message bus errors ─────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Nothing is registered (or listening) at the destination.
    #[error("no listener for {0}")]
    Disconnected(String),

    /// The callee dropped the request without answering.
    #[error("{0} dropped the request without responding")]
    NoResponse(String),

    #[error("request to {target} timed out after {millis}ms")]
    Timeout { target: String, millis: u64 },

    /// PING readiness budget exhausted.
    #[error("{target} not ready after {attempts} attempts")]
    NotReady { target: String, attempts: u32 },

    #[error("{target} rejected request: {message}")]
    Rejected { target: String, message: String },
}

// ─── Page host errors ───────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The player container is not mounted yet. Transient.
    #[error("player container not mounted")]
    NotMounted,

    /// The host tore down this observer instance. Terminal.
    #[error("extension context invalidated")]
    Invalidated,

    #[error("snapshot unavailable: {0}")]
    Snapshot(String),
}

impl HostError {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Invalidated)
    }
}

// ─── Panel errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("page observer is not ready; reload the page")]
    NotReady,

    #[error("no active page")]
    NoActivePage,

    #[error("request failed: {0}")]
    Request(#[from] BusError),
}
