//! Atomic file replacement to prevent corrupted dataset files
//!
//! A save must never leave a partially written file where a complete one used
//! to be. All writes go to a temporary sibling first; the target is only ever
//! swapped whole.

use saveback_core::{Error, Result, TMP_SUFFIX};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// The temporary sibling path a replacement of `path` is staged at
pub fn tmp_sibling(path: &Path) -> PathBuf {
    let mut staged = path.as_os_str().to_os_string();
    staged.push(TMP_SUFFIX);
    PathBuf::from(staged)
}

/// Replace the file at `path` with `content`, creating parent directories on
/// demand.
///
/// The content is written and synced to the `.tmp` sibling, then swapped into
/// place with an atomic rename. If the rename fails while a previous target
/// exists, falls back to delete-target-then-rename (best effort, not atomic).
/// On any failure the stray temporary file is removed and the previous target
/// file is left untouched.
pub fn replace_file(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::configuration("invalid file path: no parent directory"))?;

    fs::create_dir_all(parent)
        .map_err(|e| Error::file_system(parent.to_path_buf(), "create parent directory", e))?;

    let temp_path = tmp_sibling(path);

    // Write to the temporary sibling
    let staged = (|| -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| Error::file_system(&temp_path, "create temporary file", e))?;

        file.write_all(content)
            .map_err(|e| Error::file_system(&temp_path, "write to temporary file", e))?;

        file.sync_all()
            .map_err(|e| Error::file_system(&temp_path, "sync temporary file", e))?;

        Ok(())
    })();

    if staged.is_err() {
        let _ = fs::remove_file(&temp_path);
        return staged;
    }

    // Swap the staged file into place
    match fs::rename(&temp_path, path) {
        Ok(()) => Ok(()),
        Err(rename_err) if path.exists() => {
            tracing::warn!(
                "atomic replace of '{}' failed ({rename_err}), falling back to delete-then-rename",
                path.display()
            );
            match fs::remove_file(path).and_then(|()| fs::rename(&temp_path, path)) {
                Ok(()) => Ok(()),
                Err(e) => {
                    let _ = fs::remove_file(&temp_path);
                    Err(Error::file_system(path.to_path_buf(), "replace file", e))
                }
            }
        }
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            Err(Error::file_system(
                path.to_path_buf(),
                "move file into place",
                e,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_replace_writes_content() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("data.json");

        replace_file(&file_path, b"{\"gold\":100}").unwrap();

        let content = fs::read(&file_path).unwrap();
        assert_eq!(content, b"{\"gold\":100}");
    }

    #[test]
    fn test_replace_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("datasets").join("1").join("data.json");

        replace_file(&file_path, b"x").unwrap();

        assert_eq!(fs::read(&file_path).unwrap(), b"x");
    }

    #[test]
    fn test_replace_overwrites_existing_whole() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("data.json");
        fs::write(&file_path, b"old content, longer than the new one").unwrap();

        replace_file(&file_path, b"new").unwrap();

        assert_eq!(fs::read(&file_path).unwrap(), b"new");
    }

    #[test]
    fn test_replace_leaves_no_temp_behind() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("data.json");

        replace_file(&file_path, b"payload").unwrap();

        assert!(!tmp_sibling(&file_path).exists());
    }

    #[test]
    fn test_failed_replace_preserves_target_and_cleans_temp() {
        let temp_dir = TempDir::new().unwrap();
        // A file where the parent directory is expected makes the temp-file
        // creation fail.
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();
        let file_path = blocker.join("data.json");

        assert!(replace_file(&file_path, b"payload").is_err());
        assert_eq!(fs::read(&blocker).unwrap(), b"not a directory");
    }

    #[test]
    fn test_stale_temp_sibling_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("data.json");
        // A crash between staging and swapping leaves a stray .tmp behind; a
        // later save must simply overwrite it.
        fs::write(tmp_sibling(&file_path), b"interrupted write").unwrap();

        replace_file(&file_path, b"fresh").unwrap();

        assert_eq!(fs::read(&file_path).unwrap(), b"fresh");
        assert!(!tmp_sibling(&file_path).exists());
    }

    #[test]
    fn test_tmp_sibling_keeps_full_file_name() {
        let path = Path::new("/root/datasets/1/save.json");
        assert_eq!(
            tmp_sibling(path),
            PathBuf::from("/root/datasets/1/save.json.tmp")
        );
    }
}
