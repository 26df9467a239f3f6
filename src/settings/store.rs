use super::Settings;
use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::RwLock;

/// Persistence contract for the settings record.
///
/// `load` distinguishes an absent record (`Ok(None)`) from a present one so
/// the coordinator can default-initialize on first run.
pub trait SettingsStore: Send + Sync {
    fn name(&self) -> &str;

    fn load(&self) -> Pin<Box<dyn Future<Output = Result<Option<Settings>, StorageError>> + Send + '_>>;

    fn save<'a>(
        &'a self,
        settings: &'a Settings,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>>;
}

/// Read the record, falling back to defaults on absence or any read failure.
pub async fn load_or_default(store: &dyn SettingsStore) -> Settings {
    match store.load().await {
        Ok(Some(settings)) => settings.sanitized(),
        Ok(None) => Settings::default(),
        Err(error) => {
            tracing::warn!(store = store.name(), %error, "settings unreadable, using defaults");
            Settings::default()
        }
    }
}

/// Persist defaults when no record exists yet. Returns the effective record.
pub async fn initialize_defaults(store: &dyn SettingsStore) -> Result<Settings, StorageError> {
    match store.load().await {
        Ok(Some(settings)) => Ok(settings.sanitized()),
        Ok(None) => {
            let defaults = Settings::default();
            store.save(&defaults).await?;
            tracing::info!(store = store.name(), "settings initialized with defaults");
            Ok(defaults)
        }
        Err(error) => {
            // An unreadable record is left in place for the user to inspect.
            tracing::warn!(store = store.name(), %error, "settings unreadable, not overwriting");
            Ok(Settings::default())
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredRecord {
    #[serde(default)]
    settings: Option<Settings>,
}

/// JSON file holding `{"settings": {...}}`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn name(&self) -> &str {
        "json-file"
    }

    fn load(&self) -> Pin<Box<dyn Future<Output = Result<Option<Settings>, StorageError>> + Send + '_>> {
        Box::pin(async move {
            let contents = match tokio::fs::read_to_string(&self.path).await {
                Ok(contents) => contents,
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(error) => {
                    return Err(StorageError::Read(format!(
                        "{}: {error}",
                        self.path.display()
                    )));
                }
            };
            if contents.trim().is_empty() {
                return Ok(None);
            }
            let record: StoredRecord = serde_json::from_str(&contents).map_err(|error| {
                StorageError::Read(format!("{}: {error}", self.path.display()))
            })?;
            Ok(record.settings)
        })
    }

    fn save<'a>(
        &'a self,
        settings: &'a Settings,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(parent) = self.path.parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|error| StorageError::Write(error.to_string()))?;
            }
            let record = StoredRecord {
                settings: Some(*settings),
            };
            let data = serde_json::to_vec_pretty(&record)
                .map_err(|error| StorageError::Encode(error.to_string()))?;
            tokio::fs::write(&self.path, data)
                .await
                .map_err(|error| StorageError::Write(format!("{}: {error}", self.path.display())))
        })
    }
}

/// In-process store, used by tests and the `simulate` command.
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: RwLock<Option<Settings>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            record: RwLock::new(Some(settings)),
        }
    }

    pub fn current(&self) -> Option<Settings> {
        self.record.read().ok().and_then(|record| *record)
    }
}

impl SettingsStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self) -> Pin<Box<dyn Future<Output = Result<Option<Settings>, StorageError>> + Send + '_>> {
        Box::pin(async move {
            self.record
                .read()
                .map(|record| *record)
                .map_err(|_| StorageError::Read("memory store poisoned".into()))
        })
    }

    fn save<'a>(
        &'a self,
        settings: &'a Settings,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        Box::pin(async move {
            let mut record = self
                .record
                .write()
                .map_err(|_| StorageError::Write("memory store poisoned".into()))?;
            *record = Some(*settings);
            Ok(())
        })
    }
}
