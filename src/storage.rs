use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::crypto::{decrypt_with_key, encrypt_with_key, generate_key, KEY_LEN};
use crate::models::{forest_from_json, EncryptedBlob, Node};

pub const DATA_DIR: &str = ".aegis-vault";
pub const FOREST_FILE: &str = "credentials.bin";
pub const SELECTION_FILE: &str = "tree_view.json";
pub const CONFIG_FILE: &str = "config.json";
pub const LOG_DIR: &str = "logs";
const KEYRING_SERVICE: &str = "aegis-vault";
const KEYRING_USER: &str = "forest-key";
const SAMPLE_FOREST: &str = include_str!("../assets/sample_credentials.json");

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub backup_enabled: bool,
    pub backup_path: Option<PathBuf>,
}

pub fn default_base_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    Ok(home.join(DATA_DIR))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(default_base_dir()?.join(CONFIG_FILE))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| anyhow!("Invalid config at {}: {e}", path.display()))
}

pub fn save_config(path: &Path, cfg: &Config) -> Result<()> {
    let data = serde_json::to_string_pretty(cfg)?;
    atomic_write(path, data.as_bytes())?;
    restrict_file(path)?;
    Ok(())
}

/// Directory holding the encrypted store and tree view state.
pub fn data_dir(cfg: &Config) -> Result<PathBuf> {
    match &cfg.data_dir {
        Some(dir) => validate_configured_dir(dir),
        None => default_base_dir(),
    }
}

pub fn forest_path(dir: &Path) -> PathBuf {
    dir.join(FOREST_FILE)
}

pub fn selection_path(dir: &Path) -> PathBuf {
    dir.join(SELECTION_FILE)
}

pub fn log_dir(dir: &Path) -> PathBuf {
    dir.join(LOG_DIR)
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    restrict_dir(dir)
}

/// Where the key sealing the stored forest comes from.
pub trait KeySource {
    /// `Ok(None)` when no key has been created yet; `Err` when the key store itself is unavailable.
    fn load_key(&self) -> Result<Option<[u8; KEY_LEN]>>;

    fn store_key(&self, key: &[u8; KEY_LEN]) -> Result<()>;

    fn load_or_create_key(&self) -> Result<[u8; KEY_LEN]> {
        if let Some(key) = self.load_key()? {
            return Ok(key);
        }
        let key = generate_key();
        self.store_key(&key)?;
        info!("created a new storage key");
        Ok(key)
    }
}

/// Key kept in the OS keyring.
pub struct KeyringKeySource;

impl KeySource for KeyringKeySource {
    fn load_key(&self) -> Result<Option<[u8; KEY_LEN]>> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
        match entry.get_password() {
            Ok(stored) => {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(stored)
                    .map_err(|e| anyhow!("Failed to decode storage key: {e}"))?;
                let key: [u8; KEY_LEN] = bytes
                    .try_into()
                    .map_err(|_| anyhow!("Stored key has invalid length"))?;
                Ok(Some(key))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(anyhow!("Keyring read error: {e}")),
        }
    }

    fn store_key(&self, key: &[u8; KEY_LEN]) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(key);
        entry
            .set_password(&encoded)
            .map_err(|e| anyhow!("Keyring write error: {e}"))
    }
}

/// A key supplied up front, e.g. for tests or one-shot tooling.
pub struct FixedKey(pub [u8; KEY_LEN]);

impl KeySource for FixedKey {
    fn load_key(&self) -> Result<Option<[u8; KEY_LEN]>> {
        Ok(Some(self.0))
    }

    fn store_key(&self, _key: &[u8; KEY_LEN]) -> Result<()> {
        Err(anyhow!("Fixed keys cannot be replaced"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Stored,
    Sample,
}

pub struct LoadedForest {
    pub forest: Vec<Node>,
    pub source: LoadSource,
    /// Message the UI should show the user, if any.
    pub notice: Option<String>,
}

pub struct ForestStorage<K: KeySource> {
    path: PathBuf,
    keys: K,
}

impl<K: KeySource> ForestStorage<K> {
    pub fn new(path: PathBuf, keys: K) -> Self {
        Self { path, keys }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn keys(&self) -> &K {
        &self.keys
    }

    /// Decrypts the stored forest, falling back to the bundled sample.
    pub fn read_forest(&self) -> LoadedForest {
        let key = match self.keys.load_key() {
            Ok(Some(key)) => key,
            Ok(None) => return sample_fallback(self.missing_notice()),
            Err(e) => {
                warn!(error = %e, "encrypted storage unavailable");
                return sample_fallback(
                    "Encrypted storage is unavailable; loading sample data instead.",
                );
            }
        };

        let loaded = fs::read(&self.path)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| open_forest(&key, &bytes));
        match loaded {
            Ok(forest) => {
                info!(path = %self.path.display(), roots = forest.len(), "loaded stored items");
                LoadedForest {
                    forest,
                    source: LoadSource::Stored,
                    notice: None,
                }
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read stored items");
                sample_fallback(self.missing_notice())
            }
        }
    }

    fn missing_notice(&self) -> &'static str {
        match self.path.exists() {
            true => concat!(
                "Saved items could not be read; saving now will replace them. ",
                "Loading sample data instead."
            ),
            false => "No saved credentials were found; loading sample data instead.",
        }
    }

    /// Seals and atomically writes `forest`, creating the key on first save.
    pub fn write_forest(&self, forest: &[Node]) -> Result<()> {
        let key = self.keys.load_or_create_key()?;
        let sealed = seal_forest(&key, forest)?;
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        atomic_write(&self.path, &sealed)?;
        restrict_file(&self.path)?;
        info!(path = %self.path.display(), roots = forest.len(), "saved items");
        Ok(())
    }
}

fn sample_fallback(notice: &str) -> LoadedForest {
    LoadedForest {
        forest: sample_forest(),
        source: LoadSource::Sample,
        notice: Some(notice.to_string()),
    }
}

pub fn sample_forest() -> Vec<Node> {
    match forest_from_json(SAMPLE_FOREST.as_bytes()) {
        Ok(forest) => forest,
        Err(e) => {
            warn!(error = %e, "bundled sample data is unreadable");
            Vec::new()
        }
    }
}

pub fn seal_forest(key: &[u8; KEY_LEN], forest: &[Node]) -> Result<Vec<u8>> {
    let plaintext = serde_json::to_vec(forest)?;
    let blob = encrypt_with_key(key, &plaintext)?;
    Ok(serde_json::to_vec_pretty(&blob)?)
}

pub fn open_forest(key: &[u8; KEY_LEN], bytes: &[u8]) -> Result<Vec<Node>> {
    let blob: EncryptedBlob =
        serde_json::from_slice(bytes).map_err(|e| anyhow!("Not an encrypted item file: {e}"))?;
    let plaintext = decrypt_with_key(key, &blob)?;
    Ok(forest_from_json(&plaintext)?)
}

fn validate_configured_dir(raw: &Path) -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    let candidate = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        home.join(raw)
    };

    if candidate
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(anyhow!(
            "Configured data path is invalid: parent traversal is not allowed"
        ));
    }
    if !candidate.starts_with(&home) {
        return Err(anyhow!(
            "Configured data path must be inside home directory ({})",
            home.display()
        ));
    }

    // Resolve symlinks when possible so a link cannot lead outside home.
    let home_real = fs::canonicalize(&home).unwrap_or(home.clone());
    if candidate.exists() {
        let real = fs::canonicalize(&candidate)?;
        if !real.starts_with(&home_real) {
            return Err(anyhow!(
                "Configured data path resolves outside home directory ({})",
                home.display()
            ));
        }
    }

    Ok(candidate)
}

pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| anyhow!("Invalid target path"))?;
    if !parent.exists() {
        fs::create_dir_all(parent)?;
        restrict_dir(parent)?;
    }

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(path)
        .map_err(|e| anyhow!("Atomic write failed: {}", e.error))?;
    Ok(())
}

pub(crate) fn restrict_file(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if path.exists() {
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, perms)?;
        }
    }
    // Elsewhere the platform defaults apply.
    Ok(())
}

fn restrict_dir(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if path.exists() {
            let perms = fs::Permissions::from_mode(0o700);
            fs::set_permissions(path, perms)?;
        }
    }
    Ok(())
}
