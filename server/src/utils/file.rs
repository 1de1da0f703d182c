//! File utility functions

use std::path::{Path, PathBuf};

/// Expand `~` and make relative paths absolute against the working directory
///
/// ```text
/// expand_path("~/.osmetrics-server/metrics.json") // -> /home/user/.osmetrics-server/metrics.json
/// expand_path("metrics.json")                     // -> /current/dir/metrics.json
/// expand_path("/var/lib/metrics.json")            // -> unchanged
/// ```
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    let expanded = if path == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(path))
    } else if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        home.join(rest)
    } else {
        PathBuf::from(path)
    };

    if expanded.is_relative() {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    } else {
        expanded
    }
}

/// Sibling path used while a snapshot is being written
pub fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace `path` with `contents` via a sibling temp file and a rename
///
/// Readers see either the old file or the new one, never a partial write.
/// Missing parent directories are created.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = temp_sibling(path);
    tokio::fs::write(&tmp, contents).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_path_absolute_unchanged() {
        assert_eq!(
            expand_path("/var/lib/metrics.json"),
            PathBuf::from("/var/lib/metrics.json")
        );
    }

    #[test]
    fn test_expand_path_tilde() {
        let result = expand_path("~/.osmetrics-server/metrics.json");
        assert!(result.is_absolute());
        assert!(!result.to_string_lossy().contains('~'));
        assert!(result.ends_with(".osmetrics-server/metrics.json"));
    }

    #[test]
    fn test_expand_path_relative() {
        let result = expand_path("  metrics.json ");
        assert!(result.is_absolute());
        assert_eq!(result, std::env::current_dir().unwrap().join("metrics.json"));
    }

    #[test]
    fn test_temp_sibling() {
        assert_eq!(
            temp_sibling(Path::new("/data/metrics.json")),
            PathBuf::from("/data/metrics.json.tmp")
        );
    }

    #[tokio::test]
    async fn test_write_atomic_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        write_atomic(&path, b"first").await.unwrap();
        write_atomic(&path, b"second").await.unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"second");
        assert!(!temp_sibling(&path).exists());
    }
}
