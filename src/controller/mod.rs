//! Playback-rate state machine driven by the classifier.
//!
//! The controller remembers which rate it imposed on which element, so a
//! rate change it caused itself is never mistaken for the user picking a new
//! normal speed. The user's baseline is `Settings::video_speed`: a capture
//! feeds it, and leaving an ad or music video restores it.

use crate::classifier::Classification;
use crate::page::{VideoElement, VideoId};
use crate::settings::Settings;
use serde::{Deserialize, Serialize};

/// Rates closer than this are the same rate.
const RATE_EPSILON: f64 = 1e-3;

pub fn rates_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < RATE_EPSILON
}

/// Per-page status shared with the other contexts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub classification: Classification,
    /// `None` while the controller is disabled or no video is present.
    pub current_speed: Option<f64>,
}

impl Status {
    pub const fn unknown() -> Self {
        Self {
            classification: Classification::Unknown,
            current_speed: None,
        }
    }

    pub fn is_ad(&self) -> bool {
        self.classification == Classification::Ad
    }

    pub fn is_music(&self) -> bool {
        self.classification == Classification::Music
    }
}

/// Wire form of a status answer (`GET_AD_STATUS`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub classification: Classification,
    pub is_ad: bool,
    pub is_music: bool,
    pub current_speed: Option<f64>,
}

impl From<Status> for StatusReport {
    fn from(status: Status) -> Self {
        Self {
            classification: status.classification,
            is_ad: status.is_ad(),
            is_music: status.is_music(),
            current_speed: status.current_speed,
        }
    }
}

impl From<StatusReport> for Status {
    fn from(report: StatusReport) -> Self {
        Self {
            classification: report.classification,
            current_speed: report.current_speed,
        }
    }
}

/// What the transition table says to do with the rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateAction {
    Set(f64),
    /// Disabled: leave the rate alone.
    Untouched,
    /// Unknown: nothing to act on.
    Skip,
}

/// Transition table.
pub fn target_rate(classification: Classification, settings: &Settings) -> RateAction {
    if classification == Classification::Unknown {
        return RateAction::Skip;
    }
    if !settings.enabled {
        return RateAction::Untouched;
    }
    match classification {
        Classification::Ad => RateAction::Set(settings.ad_speed),
        Classification::Music if settings.auto_normal_speed_for_music => RateAction::Set(1.0),
        Classification::Music | Classification::Normal => RateAction::Set(settings.video_speed),
        Classification::Unknown => RateAction::Skip,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Imposed {
    video: VideoId,
    rate: f64,
}

/// Result of one [`SpeedController::apply`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApplyOutcome {
    /// Rate written to the element this call, if any.
    pub applied_rate: Option<f64>,
    pub status: Status,
    /// Status differs from the last one reported. Notify exactly when set.
    pub changed: bool,
    /// New normal speed learned from a manual change, to be persisted.
    pub captured: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SpeedController {
    current: Classification,
    imposed: Option<Imposed>,
    last_status: Option<Status>,
}

impl Default for SpeedController {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeedController {
    pub fn new() -> Self {
        Self {
            current: Classification::Unknown,
            imposed: None,
            last_status: None,
        }
    }

    pub fn classification(&self) -> Classification {
        self.current
    }

    /// Status as of the last `apply`.
    pub fn status(&self) -> Status {
        self.last_status.unwrap_or(Status::unknown())
    }

    /// Drive the element to the rate the table prescribes for `classification`.
    pub fn apply(
        &mut self,
        classification: Classification,
        settings: &Settings,
        video: Option<&dyn VideoElement>,
    ) -> ApplyOutcome {
        let classification = if video.is_some() {
            classification
        } else {
            Classification::Unknown
        };
        let previous = std::mem::replace(&mut self.current, classification);

        let mut captured = None;
        let mut applied_rate = None;
        let mut current_speed = None;

        if let Some(video) = video {
            let mut effective = *settings;
            if previous == Classification::Normal
                && classification == Classification::Normal
                && settings.enabled
                && let Some(rate) = self.capture(video, settings)
            {
                captured = Some(rate);
                effective = effective.with_video_speed(rate);
            }

            match target_rate(classification, &effective) {
                RateAction::Set(target) => {
                    if !rates_equal(video.playback_rate(), target) {
                        video.set_playback_rate(target);
                        applied_rate = Some(target);
                    }
                    self.imposed = Some(Imposed {
                        video: video.id(),
                        rate: target,
                    });
                    current_speed = Some(target);
                }
                RateAction::Untouched => self.imposed = None,
                RateAction::Skip => {}
            }
        }

        let status = Status {
            classification,
            current_speed,
        };
        let changed = self.last_status != Some(status);
        if changed {
            self.last_status = Some(status);
        }

        ApplyOutcome {
            applied_rate,
            status,
            changed,
            captured,
        }
    }

    /// Handle a rate-change event from the element.
    ///
    /// Returns the new normal speed when the change came from the user while
    /// NORMAL content plays. Changes during AD or MUSIC, and echoes of the
    /// controller's own writes, are ignored.
    pub fn observe_rate(&mut self, video: &dyn VideoElement, settings: &Settings) -> Option<f64> {
        if !settings.enabled || self.current != Classification::Normal {
            return None;
        }
        self.capture(video, settings)
    }

    fn capture(&mut self, video: &dyn VideoElement, settings: &Settings) -> Option<f64> {
        let imposed = self.imposed?;
        if imposed.video != video.id() {
            return None;
        }
        // Read the live rate, not the event value: queued events can be stale.
        let observed = video.playback_rate();
        if !observed.is_finite() || observed < 0.0 {
            return None;
        }
        if rates_equal(observed, imposed.rate) || rates_equal(observed, settings.video_speed) {
            return None;
        }
        self.imposed = Some(Imposed {
            video: imposed.video,
            rate: observed,
        });
        Some(observed)
    }
}
