use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Writes `contents` beside `path` and renames it into place, so readers only
/// ever see the old file or the complete new one.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = temp_path_for(path);
    if let Err(err) = fs::write(&temp_path, contents) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }
    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn replaces_existing_file_and_leaves_no_temp() {
        let dir = TempDir::new().expect("temp");
        let path = dir.path().join("nested").join("record.plr");
        write_atomic(&path, "Name: first\n").expect("first write");
        write_atomic(&path, "Name: second\n").expect("second write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "Name: second\n");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn failed_rename_keeps_destination_directory() {
        let dir = TempDir::new().expect("temp");
        let path = dir.path().join("blocked");
        fs::create_dir_all(path.join("child")).expect("dir");
        assert!(write_atomic(&path, "data").is_err());
        assert!(path.is_dir());
        assert!(!temp_path_for(&path).exists());
    }
}
