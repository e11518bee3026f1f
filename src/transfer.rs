use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Local};
use serde_json::error::Category;
use thiserror::Error;
use tracing::info;

use crate::crypto::{decrypt_with_key, KEY_LEN};
use crate::models::{forest_from_json, EncryptedBlob, Node};
use crate::queue::Queue;
use crate::storage::{atomic_write, restrict_file, seal_forest, Config};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Encrypted,
    Plaintext,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Encrypted => "bin",
            ExportFormat::Plaintext => "json",
        }
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("could not read import file: {0}")]
    Io(#[from] std::io::Error),
    #[error("import file has a syntax error at line {line}, column {column}")]
    Syntax { line: usize, column: usize },
    #[error("import file is not a valid item list: {0}")]
    Invalid(String),
    #[error("encrypted import could not be opened: {0}")]
    Decrypt(String),
}

impl ImportError {
    pub fn is_syntax(&self) -> bool {
        matches!(self, ImportError::Syntax { .. })
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(e: serde_json::Error) -> Self {
        match e.classify() {
            Category::Syntax | Category::Eof => ImportError::Syntax {
                line: e.line(),
                column: e.column(),
            },
            Category::Data => ImportError::Invalid(e.to_string()),
            Category::Io => ImportError::Io(e.into()),
        }
    }
}

/// `credentials_YYYYMMDDHHMMSS.<ext>`
pub fn export_file_name(format: ExportFormat, now: DateTime<Local>) -> String {
    format!(
        "credentials_{}.{}",
        now.format("%Y%m%d%H%M%S"),
        format.extension()
    )
}

pub fn export_dir(cfg: &Config, fallback: &Path) -> PathBuf {
    cfg.backup_path
        .clone()
        .or_else(dirs::desktop_dir)
        .unwrap_or_else(|| fallback.to_path_buf())
}

pub fn default_export_path(
    cfg: &Config,
    fallback: &Path,
    format: ExportFormat,
    now: DateTime<Local>,
) -> PathBuf {
    export_dir(cfg, fallback).join(export_file_name(format, now))
}

pub fn export_encrypted(path: &Path, forest: &[Node], key: &[u8; KEY_LEN]) -> Result<()> {
    let sealed = seal_forest(key, forest)?;
    atomic_write(path, &sealed)?;
    restrict_file(path)?;
    info!(path = %path.display(), "exported encrypted items");
    Ok(())
}

pub fn export_plaintext(path: &Path, forest: &[Node]) -> Result<()> {
    let data = serde_json::to_string_pretty(forest)?;
    atomic_write(path, data.as_bytes())?;
    restrict_file(path)?;
    info!(path = %path.display(), "exported plaintext items");
    Ok(())
}

pub fn parse_forest_json(bytes: &[u8]) -> Result<Vec<Node>, ImportError> {
    let forest = forest_from_json(bytes)?;
    validate_forest(&forest)?;
    Ok(forest)
}

/// Encrypted exports need `key`; plaintext ones ignore it.
pub fn import_file(path: &Path, key: Option<&[u8; KEY_LEN]>) -> Result<Vec<Node>, ImportError> {
    let bytes = fs::read(path)?;
    let forest = match serde_json::from_slice::<EncryptedBlob>(&bytes) {
        Ok(blob) => {
            let key = key.ok_or_else(|| {
                ImportError::Decrypt("encrypted storage is unavailable".to_string())
            })?;
            let plaintext =
                decrypt_with_key(key, &blob).map_err(|e| ImportError::Decrypt(e.to_string()))?;
            parse_forest_json(&plaintext)?
        }
        Err(_) => parse_forest_json(&bytes)?,
    };
    info!(path = %path.display(), roots = forest.len(), "imported items");
    Ok(forest)
}

fn validate_forest(forest: &[Node]) -> Result<(), ImportError> {
    let mut seen = HashSet::new();
    let mut queue: Queue<&Node> = forest.iter().collect();
    while let Some(node) = queue.dequeue() {
        if node.id.is_empty() {
            return Err(ImportError::Invalid("item with empty id".into()));
        }
        if !seen.insert(node.id.as_str()) {
            return Err(ImportError::Invalid(format!("duplicate item id {}", node.id)));
        }
        queue.extend(node.children());
    }
    Ok(())
}

pub fn auto_backup(
    cfg: &Config,
    fallback: &Path,
    forest: &[Node],
    key: &[u8; KEY_LEN],
    now: DateTime<Local>,
) -> Result<Option<PathBuf>> {
    if !cfg.backup_enabled {
        return Ok(None);
    }
    let path = default_export_path(cfg, fallback, ExportFormat::Encrypted, now);
    export_encrypted(&path, forest, key)?;
    Ok(Some(path))
}
