mod store;
mod types;

pub use store::{JsonFileStore, MemoryStore, SettingsStore, initialize_defaults, load_or_default};
pub use types::{
    DEFAULT_AD_SPEED, DEFAULT_VIDEO_SPEED, MAX_PLAYBACK_RATE, MIN_AD_SPEED, Settings,
    SettingsPatch,
};
