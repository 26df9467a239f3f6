use serde::{Deserialize, Serialize};

pub const DEFAULT_AD_SPEED: f64 = 16.0;
pub const DEFAULT_VIDEO_SPEED: f64 = 1.0;
pub const MIN_AD_SPEED: f64 = 1.0;
/// Players reject rates above this.
pub const MAX_PLAYBACK_RATE: f64 = 16.0;

/// The single persisted user settings record.
///
/// Field names are camelCase on the wire so the record stays compatible with
/// the message protocol payloads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Rate applied while an advertisement is showing.
    pub ad_speed: f64,
    /// Rate applied to normal content; doubles as the last user-chosen rate.
    pub video_speed: f64,
    /// Master switch. When off the playback rate is never touched.
    pub enabled: bool,
    /// Force 1.0x on music videos instead of `video_speed`.
    pub auto_normal_speed_for_music: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ad_speed: DEFAULT_AD_SPEED,
            video_speed: DEFAULT_VIDEO_SPEED,
            enabled: true,
            auto_normal_speed_for_music: true,
        }
    }
}

impl Settings {
    /// Clamp speeds into the range the player accepts.
    ///
    /// `ad_speed` never drops below 1.0; a negative or non-finite
    /// `video_speed` falls back to the default.
    pub fn sanitized(self) -> Self {
        let ad_speed = if self.ad_speed.is_finite() {
            self.ad_speed.clamp(MIN_AD_SPEED, MAX_PLAYBACK_RATE)
        } else {
            DEFAULT_AD_SPEED
        };
        let video_speed = if self.video_speed.is_finite() && self.video_speed >= 0.0 {
            self.video_speed.min(MAX_PLAYBACK_RATE)
        } else {
            DEFAULT_VIDEO_SPEED
        };
        Self {
            ad_speed,
            video_speed,
            ..self
        }
    }

    pub fn with_video_speed(self, video_speed: f64) -> Self {
        Self {
            video_speed,
            ..self
        }
        .sanitized()
    }
}

/// Partial update merged over the current record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_normal_speed_for_music: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.ad_speed.is_none()
            && self.video_speed.is_none()
            && self.enabled.is_none()
            && self.auto_normal_speed_for_music.is_none()
    }

    pub fn apply_to(&self, base: Settings) -> Settings {
        Settings {
            ad_speed: self.ad_speed.unwrap_or(base.ad_speed),
            video_speed: self.video_speed.unwrap_or(base.video_speed),
            enabled: self.enabled.unwrap_or(base.enabled),
            auto_normal_speed_for_music: self
                .auto_normal_speed_for_music
                .unwrap_or(base.auto_normal_speed_for_music),
        }
        .sanitized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_first_install_record() {
        let settings = Settings::default();
        assert!((settings.ad_speed - 16.0).abs() < f64::EPSILON);
        assert!((settings.video_speed - 1.0).abs() < f64::EPSILON);
        assert!(settings.enabled);
        assert!(settings.auto_normal_speed_for_music);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["adSpeed"], 16.0);
        assert_eq!(json["videoSpeed"], 1.0);
        assert_eq!(json["enabled"], true);
        assert_eq!(json["autoNormalSpeedForMusic"], true);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"adSpeed": 4.0}"#).unwrap();
        assert!((settings.ad_speed - 4.0).abs() < f64::EPSILON);
        assert!((settings.video_speed - 1.0).abs() < f64::EPSILON);
        assert!(settings.enabled);
    }

    #[test]
    fn sanitize_clamps_out_of_range_speeds() {
        let settings = Settings {
            ad_speed: 0.25,
            video_speed: -2.0,
            ..Settings::default()
        }
        .sanitized();
        assert!((settings.ad_speed - MIN_AD_SPEED).abs() < f64::EPSILON);
        assert!((settings.video_speed - DEFAULT_VIDEO_SPEED).abs() < f64::EPSILON);

        let settings = Settings {
            ad_speed: 99.0,
            video_speed: f64::NAN,
            ..Settings::default()
        }
        .sanitized();
        assert!((settings.ad_speed - MAX_PLAYBACK_RATE).abs() < f64::EPSILON);
        assert!((settings.video_speed - DEFAULT_VIDEO_SPEED).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_video_speed_is_allowed() {
        let settings = Settings::default().with_video_speed(0.0);
        assert!(settings.video_speed.abs() < f64::EPSILON);
    }

    #[test]
    fn patch_merges_only_present_fields() {
        let patch = SettingsPatch {
            video_speed: Some(1.5),
            enabled: Some(false),
            ..SettingsPatch::default()
        };
        let merged = patch.apply_to(Settings::default());
        assert!((merged.video_speed - 1.5).abs() < f64::EPSILON);
        assert!(!merged.enabled);
        assert!((merged.ad_speed - DEFAULT_AD_SPEED).abs() < f64::EPSILON);
        assert!(merged.auto_normal_speed_for_music);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(SettingsPatch::default().is_empty());
        assert!(
            !SettingsPatch {
                ad_speed: Some(2.0),
                ..SettingsPatch::default()
            }
            .is_empty()
        );
    }
}
