// # Config Store
//
// Loads, defaults, backfills and persists the agent's Configuration.
//
// ## Lifecycle
//
// - Missing file: first run. Every recognized field is prompted, the result
//   is saved and returned.
// - Existing file: parsed, merged against defaults, then any required field
//   still empty is prompted for until a non-empty value is supplied.
// - Unparseable file: copied to `<name>.backup`, then treated as an empty
//   record, which forces backfill of the required fields.
//
// Outside of `load` the file is never rewritten from defaults: a missing or
// unparseable file is a storage error for `load_existing` and
// `set_autostart`.
//
// ## Atomicity
//
// Saves write the full record to `<name>.tmp` first and rename it over the
// target, so a half-written file is never observable.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::config::{ConfigField, Configuration, merge_defaults};
use crate::error::{Error, Result};
use crate::traits::Prompter;

/// File-backed configuration store
///
/// # Example
///
/// ```rust,ignore
/// let store = ConfigStore::new("/home/me/.config/cfddns/config.json", prompter);
/// let config = store.load().await?;
/// ```
pub struct ConfigStore {
    path: PathBuf,
    prompter: Arc<dyn Prompter>,
}

impl ConfigStore {
    /// Create a store for the file at `path`
    pub fn new(path: impl AsRef<Path>, prompter: Arc<dyn Prompter>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            prompter,
        }
    }

    /// Location of the persisted configuration
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load a complete configuration, prompting as needed
    ///
    /// Fails only on unrecoverable I/O or when the prompter can no longer
    /// supply input for a required field.
    pub async fn load(&self) -> Result<Configuration> {
        let Some(content) = self.read_raw().await? else {
            tracing::info!(
                "Configuration file not found at {}, collecting settings",
                self.path.display()
            );
            let cfg = self.collect_all().await?;
            self.save(&cfg).await?;
            tracing::info!("Configuration saved to {}", self.path.display());
            return Ok(cfg);
        };

        let raw = match self.parse_record(&content) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("{}. Using defaults.", e);
                self.back_up_unparseable().await?;
                Map::new()
            }
        };
        self.ensure_complete(merge_defaults(&raw)).await
    }

    /// Load the persisted configuration without prompting
    ///
    /// Returns `None` when no file exists yet. An unparseable file is a
    /// storage error.
    pub async fn load_existing(&self) -> Result<Option<Configuration>> {
        match self.read_raw().await? {
            Some(content) => Ok(Some(merge_defaults(&self.parse_record(&content)?))),
            None => Ok(None),
        }
    }

    /// Persist `autostart`, leaving every other key of the file as written
    pub async fn set_autostart(&self, enabled: bool) -> Result<()> {
        let content = self.read_raw().await?.ok_or_else(|| {
            Error::storage(format!("Configuration {} not found", self.path.display()))
        })?;
        let mut raw = self.parse_record(&content)?;

        if let Some(legacy) = ConfigField::Autostart.legacy_key() {
            raw.remove(legacy);
        }
        raw.insert(ConfigField::Autostart.key().to_string(), Value::Bool(enabled));

        self.write(&Value::Object(raw)).await
    }

    /// Prompt for every required field that is still empty, then persist
    pub async fn ensure_complete(&self, mut cfg: Configuration) -> Result<Configuration> {
        let missing = cfg.missing_required();
        if missing.is_empty() {
            return Ok(cfg);
        }

        tracing::info!(
            "Configuration incomplete, prompting for: {}",
            missing
                .iter()
                .map(|f| f.key())
                .collect::<Vec<_>>()
                .join(", ")
        );

        for field in missing {
            let value = self.prompt_required(field).await?;
            cfg.set_text(field, value);
        }

        self.save(&cfg).await?;
        Ok(cfg)
    }

    /// Write the full configuration atomically
    pub async fn save(&self, cfg: &Configuration) -> Result<()> {
        self.write(cfg).await
    }

    async fn write(&self, record: &impl serde::Serialize) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::storage(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let json = serde_json::to_string_pretty(record)
            .map_err(|e| Error::storage(format!("Failed to serialize configuration: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::storage(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::storage(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                Error::storage(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::storage(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Configuration written to {}", self.path.display());
        Ok(())
    }

    /// Read the file; `None` means it does not exist
    async fn read_raw(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::storage(format!(
                "Failed to read configuration {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn parse_record(&self, content: &str) -> Result<Map<String, Value>> {
        match serde_json::from_str::<Value>(content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(Error::storage(format!(
                "Configuration {} is not a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(Error::storage(format!(
                "Configuration {} appears corrupted: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Keep the unparseable file before backfill overwrites it
    async fn back_up_unparseable(&self) -> Result<()> {
        let backup_path = self.backup_path();
        fs::copy(&self.path, &backup_path).await.map_err(|e| {
            Error::storage(format!(
                "Failed to back up {} to {}: {}",
                self.path.display(),
                backup_path.display(),
                e
            ))
        })?;
        tracing::warn!(
            "Unparseable configuration kept at {}",
            backup_path.display()
        );
        Ok(())
    }

    /// First-run collection of every recognized field
    async fn collect_all(&self) -> Result<Configuration> {
        let mut raw = Map::new();

        for field in ConfigField::ALL {
            let answer = if field.is_required() {
                Some(self.prompt_required(field).await?)
            } else {
                self.prompter.prompt(field).await?
            };

            if let Some(answer) = answer {
                raw.insert(field.key().to_string(), Value::String(answer));
            }
        }

        Ok(merge_defaults(&raw))
    }

    async fn prompt_required(&self, field: ConfigField) -> Result<String> {
        loop {
            match self.prompter.prompt(field).await? {
                Some(answer) if !answer.trim().is_empty() => return Ok(answer.trim().to_string()),
                _ => tracing::warn!("{} is required and cannot be empty", field),
            }
        }
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".backup");
        PathBuf::from(name)
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }
}
