use std::path::{Path, PathBuf};

#[must_use]
pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}

/// Expand a leading `~` (alone, or followed by `/` or `\`) to the home directory.
///
/// Paths without a leading tilde, or when no home directory is known, are
/// returned unchanged. Surrounding whitespace and quotes from dictated paths
/// are trimmed.
#[must_use]
pub fn expand_home(raw: &str) -> PathBuf {
    let trimmed = raw.trim().trim_matches('"');
    let Some(rest) = trimmed.strip_prefix('~') else {
        return PathBuf::from(trimmed);
    };
    let Some(home) = home_dir() else {
        return PathBuf::from(trimmed);
    };
    if rest.is_empty() {
        return home;
    }
    match rest.strip_prefix(['/', '\\']) {
        Some(tail) => join_components(&home, tail),
        // `~user` forms are not expanded.
        None => PathBuf::from(trimmed),
    }
}

fn join_components(base: &Path, tail: &str) -> PathBuf {
    tail.split(['/', '\\'])
        .filter(|part| !part.is_empty())
        .fold(base.to_path_buf(), |acc, part| acc.join(part))
}
