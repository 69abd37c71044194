// config.rs

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use askama::Template;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::{sync::RwLock, task};
use tracing::*;

use crate::TempUnit;

pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 24601;
const DEFAULT_LOGFILE: &str = "~/sv-log.txt";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read settings file {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot parse settings file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("cannot encode settings: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("cannot write settings file {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("settings writer task failed: {0}")]
    Task(#[from] task::JoinError),
}

/// One radio button on the settings page.
pub struct UnitChoice {
    pub value: &'static str,
    pub name: &'static str,
    pub checked: bool,
}

/// Settings of the web front-end, persisted as json.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Template)]
#[template(path = "settings.html.ask", escape = "html")]
pub struct WebSettings {
    pub host: String,
    #[serde(serialize_with = "port_to_string", deserialize_with = "port_from_any")]
    pub port: u16,
    pub logfile: String,
    pub units: TempUnit,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            logfile: DEFAULT_LOGFILE.into(),
            units: TempUnit::Fahrenheit,
        }
    }
}

impl WebSettings {
    /// Read settings from `path`, or write and return the defaults if the file is missing.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No settings file at {path:?}, creating defaults.");
            let c = WebSettings::default();
            c.save(path)?;
            return Ok(c);
        }

        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Got {sz} bytes from {path:?}. Parsing settings...", sz = text.len());

        match serde_json::from_str::<WebSettings>(&text) {
            Ok(c) => {
                info!("Successfully parsed settings.");
                Ok(c)
            }
            Err(source) => {
                error!("Cannot parse settings from {path:?}: {source}");
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    /// Overwrite `path` with all fields.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let data = serde_json::to_string(self)?;
        info!("Encoded settings to {sz} bytes. Saving to {path:?}...", sz = data.len());

        match fs::write(path, data) {
            Ok(_) => {
                info!("Settings saved.");
                Ok(())
            }
            Err(source) => {
                error!("Cannot save settings to {path:?}: {source}");
                Err(ConfigError::Write {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    pub fn unit_choices(&self) -> Vec<UnitChoice> {
        TempUnit::ALL
            .iter()
            .map(|u| UnitChoice {
                value: u.form_value(),
                name: u.name(),
                checked: *u == self.units,
            })
            .collect()
    }
}

fn port_to_string<S: Serializer>(port: &u16, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&port.to_string())
}

// older files may carry the port as a bare number
fn port_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<u16, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Num(u16),
        Text(String),
    }

    match Port::deserialize(d)? {
        Port::Num(p) => Ok(p),
        Port::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Owner of the process-wide settings record and its backing file.
///
/// Built once by the entry point and shared through [`crate::MyState`].
/// Reads take the shared lock, mutations hold the exclusive lock until the
/// file write has finished. File io runs on the blocking pool.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: RwLock<WebSettings>,
    dirty: AtomicBool,
}

impl SettingsStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let settings = WebSettings::load_or_create(&path)?;
        info!("My settings:\n{settings:#?}");
        Ok(Self {
            path,
            settings: RwLock::new(settings),
            dirty: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self) -> WebSettings {
        self.settings.read().await.clone()
    }

    pub async fn units(&self) -> TempUnit {
        self.settings.read().await.units
    }

    /// True after [`SettingsStore::edit`] until the next successful save.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Change fields in memory only, see [`SettingsStore::save`].
    pub async fn edit<F>(&self, f: F)
    where
        F: FnOnce(&mut WebSettings),
    {
        let mut settings = self.settings.write().await;
        f(&mut *settings);
        self.dirty.store(true, Ordering::Release);
    }

    pub async fn save(&self) -> Result<(), ConfigError> {
        let settings = self.settings.write().await;
        self.persist(settings.clone()).await?;
        self.dirty.store(false, Ordering::Release);
        Ok(())
    }

    /// Apply `f` and persist. On a failed write the in-memory record is rolled back.
    pub async fn update<F>(&self, f: F) -> Result<WebSettings, ConfigError>
    where
        F: FnOnce(&mut WebSettings),
    {
        let mut settings = self.settings.write().await;
        let mut next = settings.clone();
        f(&mut next);
        self.persist(next.clone()).await?;
        *settings = next;
        self.dirty.store(false, Ordering::Release);
        Ok(settings.clone())
    }

    pub async fn reset(&self) -> Result<(), ConfigError> {
        self.update(|s| *s = WebSettings::default()).await.map(|_| ())
    }

    // callers hold the write guard, so writes never interleave
    async fn persist(&self, settings: WebSettings) -> Result<(), ConfigError> {
        let path = self.path.clone();
        task::spawn_blocking(move || settings.save(&path)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_missing_file_creates_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        let c = WebSettings::load_or_create(&path).unwrap();
        assert_eq!(c.host, "localhost");
        assert_eq!(c.port, 24601);
        assert_eq!(c.logfile, "~/sv-log.txt");
        assert_eq!(c.units, TempUnit::Fahrenheit);

        assert!(path.exists());
        assert_eq!(
            read_json(&path),
            serde_json::json!({
                "host": "localhost",
                "port": "24601",
                "logfile": "~/sv-log.txt",
                "units": 2
            })
        );
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        let c = WebSettings {
            host: "sousvide.local".into(),
            port: 5000,
            logfile: "/var/log/sv.txt".into(),
            units: TempUnit::Celsius,
        };
        c.save(&path).unwrap();

        let loaded = WebSettings::load_or_create(&path).unwrap();
        assert_eq!(loaded, c);
    }

    #[test]
    fn test_port_accepts_number_or_string() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        fs::write(
            &path,
            r#"{"host":"h","port":8080,"logfile":"l","units":0}"#,
        )
        .unwrap();
        let c = WebSettings::load_or_create(&path).unwrap();
        assert_eq!(c.port, 8080);
        assert_eq!(c.units, TempUnit::Kelvin);

        fs::write(
            &path,
            r#"{"host":"h","port":"9090","logfile":"l","units":1}"#,
        )
        .unwrap();
        let c = WebSettings::load_or_create(&path).unwrap();
        assert_eq!(c.port, 9090);
        assert_eq!(c.units, TempUnit::Celsius);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let err = WebSettings::load_or_create(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        // the broken file is left alone
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_unknown_unit_code_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"host":"h","port":"1","logfile":"l","units":7}"#,
        )
        .unwrap();

        let err = WebSettings::load_or_create(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_unwritable_path_is_write_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no-such-dir").join("settings.json");

        let err = WebSettings::default().save(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Write { .. }));

        let err = WebSettings::load_or_create(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Write { .. }));
    }

    #[tokio::test]
    async fn test_store_update_changes_only_that_field() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::open(&path).unwrap();

        store.update(|s| s.host = "controller.lan".into()).await.unwrap();

        let on_disk = WebSettings::load_or_create(&path).unwrap();
        assert_eq!(
            on_disk,
            WebSettings {
                host: "controller.lan".into(),
                ..WebSettings::default()
            }
        );
        assert_eq!(store.get().await, on_disk);
    }

    #[tokio::test]
    async fn test_store_reopen_sees_saved_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::open(&path).unwrap();
        store
            .update(|s| {
                s.units = TempUnit::Kelvin;
                s.port = 4000;
            })
            .await
            .unwrap();
        drop(store);

        let store = SettingsStore::open(&path).unwrap();
        let c = store.get().await;
        assert_eq!(c.units, TempUnit::Kelvin);
        assert_eq!(c.port, 4000);
        assert_eq!(c.host, "localhost");
    }

    #[tokio::test]
    async fn test_store_failed_write_keeps_old_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::open(&path).unwrap();

        // swap the file for a directory so the next write fails
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        let err = store.update(|s| s.host = "lost".into()).await.unwrap_err();
        assert!(matches!(err, ConfigError::Write { .. }));
        assert_eq!(store.get().await.host, "localhost");
    }

    #[tokio::test]
    async fn test_store_edit_then_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::open(&path).unwrap();
        assert!(!store.is_dirty());

        store.edit(|s| s.logfile = "/srv/sv.log".into()).await;
        assert!(store.is_dirty());
        // not on disk yet
        assert_eq!(WebSettings::load_or_create(&path).unwrap(), WebSettings::default());

        store.save().await.unwrap();
        assert!(!store.is_dirty());
        assert_eq!(
            WebSettings::load_or_create(&path).unwrap(),
            WebSettings {
                logfile: "/srv/sv.log".into(),
                ..WebSettings::default()
            }
        );
    }

    #[tokio::test]
    async fn test_store_save_failure_stays_dirty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::open(&path).unwrap();

        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        store.edit(|s| s.port = 1234).await;
        let err = store.save().await.unwrap_err();
        assert!(matches!(err, ConfigError::Write { .. }));
        assert!(store.is_dirty());
        assert_eq!(store.get().await.port, 1234);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_keep_memory_and_disk_equal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let store = Arc::new(SettingsStore::open(&path).unwrap());

        let tasks: Vec<_> = (1..=32u16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .update(|s| {
                            s.port = i;
                            s.host = format!("host-{i}");
                        })
                        .await
                })
            })
            .collect();
        for t in tasks {
            t.await.unwrap().unwrap();
        }

        let in_memory = store.get().await;
        let on_disk = WebSettings::load_or_create(&path).unwrap();
        assert_eq!(in_memory, on_disk);
        // host and port always come from the same writer
        assert_eq!(on_disk.host, format!("host-{}", on_disk.port));
        assert!((1..=32).contains(&on_disk.port));
    }

    #[tokio::test]
    async fn test_store_reset_restores_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::open(&path).unwrap();

        store.update(|s| s.units = TempUnit::Celsius).await.unwrap();
        store.reset().await.unwrap();

        assert_eq!(store.get().await, WebSettings::default());
        assert_eq!(WebSettings::load_or_create(&path).unwrap(), WebSettings::default());
    }

    #[test]
    fn test_unit_choices_mark_current() {
        let c = WebSettings {
            units: TempUnit::Celsius,
            ..WebSettings::default()
        };
        let checked: Vec<&str> = c
            .unit_choices()
            .iter()
            .filter(|u| u.checked)
            .map(|u| u.value)
            .collect();
        assert_eq!(checked, vec!["celsius"]);
    }

    #[test]
    fn test_settings_page_renders_values() {
        let c = WebSettings {
            host: "a<b".into(),
            ..WebSettings::default()
        };
        let html = c.render().unwrap();
        assert!(html.contains("value=\"24601\""));
        assert!(!html.contains("a<b"));
        assert!(html.contains("value=\"fahrenheit\" checked"));
    }
}

// EOF
