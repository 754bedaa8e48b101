//! Path and filter utilities

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// True when the file name ends with one of `suffixes`.
pub fn has_target_suffix(path: &Path, suffixes: &[String]) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => suffixes.iter().any(|s| name.ends_with(s.as_str())),
        None => false,
    }
}

/// Files directly inside `dir` matching `suffixes`, sorted by name.
pub fn list_target_files(dir: &Path, suffixes: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries = std::fs::read_dir(dir).with_context(|| format!("list {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("list {}", dir.display()))?;
        let path = entry.path();
        if has_target_suffix(&path, suffixes) && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// True when `dir` directly contains at least one matching file. Stops at the first hit.
pub fn dir_has_target_file(dir: &Path, suffixes: &[String]) -> std::io::Result<bool> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if has_target_suffix(&path, suffixes) && path.is_file() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Stable string form of a path for checkpoint ids: forward slashes on every platform.
pub fn path_to_id(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Canonicalize the input root; it must be an existing directory.
pub fn canonical_root(root: &Path) -> Result<PathBuf> {
    let root = root
        .canonicalize()
        .with_context(|| format!("input path '{}' does not exist", root.display()))?;
    if !root.is_dir() {
        anyhow::bail!("input path '{}' is not a directory", root.display());
    }
    Ok(root)
}

/// Returns true if the directory should be walked. `skip` holds the run's own state paths
/// (temp dir, checkpoint) when they live under the input root.
pub fn should_include_in_walk(
    path: &Path,
    root: &Path,
    skip: &[PathBuf],
    exclude_patterns: &[String],
) -> bool {
    if path == root {
        return true;
    }
    if skip.iter().any(|s| path == s.as_path()) {
        return false;
    }
    if exclude_patterns.is_empty() {
        return true;
    }
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return true,
    };
    let path_str = path.to_str().unwrap_or("");
    !exclude_patterns
        .iter()
        .any(|pattern| glob_match(pattern, name) || glob_match(pattern, path_str))
}

/// Glob matching with `*` (any run) and `?` (one char). A leading `!` is ignored.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.strip_prefix('!').unwrap_or(pattern).chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position of the last `*` and the text index it was tried against.
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p) {
            Some(&'*') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    p = sp + 1;
                    t = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}
