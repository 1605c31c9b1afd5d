//! In-place config edits.
//!
//! Uses `toml_edit` so comments and unrelated settings survive, and writes
//! through the atomic writer with owner-only permissions because the file may
//! hold an API key.

use std::fs;
use std::io;
use std::path::Path;

use nexus_utils::{WriteMode, atomic_write_with_mode};

use crate::config_path;

/// Store the Groq key under `[api_keys] groq`.
pub fn persist_api_key(key: &str) -> io::Result<()> {
    let path = default_path()?;
    set_string_at(&path, "api_keys", "groq", key)
}

/// Store the chat model under `[brain] model`.
pub fn persist_model(model: &str) -> io::Result<()> {
    let path = default_path()?;
    set_string_at(&path, "brain", "model", model)
}

fn default_path() -> io::Result<std::path::PathBuf> {
    config_path().ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "Could not determine config path")
    })
}

/// Set `[table] key = value`, creating the file and table when missing.
pub(crate) fn set_string_at(path: &Path, table: &str, key: &str, value: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        restrict_dir_permissions(parent)?;
    }

    let content = if path.exists() {
        fs::read_to_string(path)?
    } else {
        String::new()
    };

    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    if !doc.contains_key(table) {
        doc[table] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc[table][key] = toml_edit::value(value);

    atomic_write_with_mode(path, doc.to_string().as_bytes(), WriteMode::Private)?;
    tracing::info!(path = %path.display(), table, key, "Config updated");
    Ok(())
}

#[cfg(unix)]
fn restrict_dir_permissions(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::{MetadataExt, PermissionsExt};

    let metadata = fs::metadata(dir)?;
    // Only tighten directories we own.
    let our_uid = unsafe { libc::getuid() };
    if metadata.uid() == our_uid {
        let mode = metadata.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn restrict_dir_permissions(_dir: &Path) -> io::Result<()> {
    Ok(())
}
