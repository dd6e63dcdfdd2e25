use anyhow::{Result, bail};
use std::path::{Component, Path, PathBuf};

pub fn validate_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("search root does not exist: {}", path.display());
    }
    if !path.is_dir() {
        bail!("search root is not a directory: {}", path.display());
    }
    Ok(())
}

/// 以字面方式整理路徑（不存取檔案系統）
///
/// Drops `.` and repeated or trailing separators, and resolves `name/..`.
/// `..` directly under the root is dropped; leading `..` of a relative path
/// are kept. An empty result becomes `.`.
#[must_use]
pub fn clean_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                Some(Component::ParentDir | Component::CurDir) | None => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    let cleaned: PathBuf = parts.iter().collect();
    if cleaned.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        cleaned
    }
}
