use crate::controller::{Status, StatusReport};
use crate::error::BusError;
use crate::settings::Settings;
use serde::{Deserialize, Serialize};

/// Message kinds, named as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    GetSettings,
    UpdateSettings,
    GetAdStatus,
    AdStatusChanged,
    Ping,
    UpdateBadge,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BadgePayload {
    pub speed: Option<f64>,
}

impl BadgePayload {
    /// Badge text, `"16x"` style, empty when there is no speed to show.
    pub fn text(&self) -> String {
        match self.speed {
            Some(speed) if (speed - speed.round()).abs() < 1e-9 => format!("{speed:.0}x"),
            Some(speed) => format!("{speed}x"),
            None => String::new(),
        }
    }
}

/// Typed protocol message: `{"type": ..., "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    GetSettings,
    UpdateSettings(Settings),
    GetAdStatus,
    AdStatusChanged(Status),
    Ping,
    UpdateBadge(BadgePayload),
}

impl Message {
    pub fn kind(&self) -> MessageType {
        match self {
            Self::GetSettings => MessageType::GetSettings,
            Self::UpdateSettings(_) => MessageType::UpdateSettings,
            Self::GetAdStatus => MessageType::GetAdStatus,
            Self::AdStatusChanged(_) => MessageType::AdStatusChanged,
            Self::Ping => MessageType::Ping,
            Self::UpdateBadge(_) => MessageType::UpdateBadge,
        }
    }
}

/// Response envelope: `{success, settings?, status?, error?}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: Some(settings),
            ..Self::ok()
        }
    }

    pub fn with_status(status: Status) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::ok()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Turn `success: false` into `BusError::Rejected`.
    pub fn into_result(self, target: &str) -> Result<Self, BusError> {
        if self.success {
            Ok(self)
        } else {
            Err(BusError::Rejected {
                target: target.to_string(),
                message: self.error.unwrap_or_else(|| "unspecified failure".into()),
            })
        }
    }
}
