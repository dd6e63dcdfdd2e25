use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 深度優先掃描目錄，依檔名排序回傳所有有副檔名的檔案
///
/// Same-directory entries come out in file name order, so files of one
/// image sequence are always contiguous in the returned list.
pub fn scan_media_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("walk failed under {}", directory.display()))?;
        if entry.file_type().is_dir() {
            continue;
        }
        if entry.path().extension().is_none() {
            continue;
        }
        files.push(entry.into_path());
    }

    Ok(files)
}

/// 取得小寫副檔名（不含 `.`）
#[must_use]
pub fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}
