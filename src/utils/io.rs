//! File I/O primitives with consistent error handling.
//!
//! Script files are UTF-8 text. Writes never emit a byte-order mark and never
//! leave a half-written file behind.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

const BOM: char = '\u{feff}';

/// Read a UTF-8 text file. Invalid UTF-8 is reported as an IO error.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("read {}", path.display()))))
}

/// Write text atomically (write to a sibling `.tmp`, then rename).
///
/// A leading byte-order mark is dropped. Readers observe either the old
/// content or the new content, never a partial write. A symlink is written
/// through to its target, and an existing file keeps its permissions.
pub fn write_text_atomic(path: &Path, content: &str) -> Result<()> {
    let operation = format!("write {}", path.display());
    let content = content.strip_prefix(BOM).unwrap_or(content);

    let resolved = if path.exists() {
        fs::canonicalize(path).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("{} (resolve)", operation)))
        })?
    } else {
        path.to_path_buf()
    };
    let path = resolved.as_path();
    let permissions = fs::metadata(path).ok().map(|m| m.permissions());

    let parent = path.parent().ok_or_else(|| {
        Error::internal_io(format!("Invalid path: {}", path.display()), Some(operation.clone()))
    })?;

    let filename = path.file_name().ok_or_else(|| {
        Error::internal_io(format!("Invalid path: {}", path.display()), Some(operation.clone()))
    })?;

    let tmp_path = parent.join(format!("{}.tmp", filename.to_string_lossy()));

    fs::write(&tmp_path, content).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("{} (write temp)", operation)))
    })?;

    if let Some(permissions) = permissions {
        if let Err(e) = fs::set_permissions(&tmp_path, permissions) {
            let _ = fs::remove_file(&tmp_path);
            return Err(Error::internal_io(
                e.to_string(),
                Some(format!("{} (permissions)", operation)),
            ));
        }
    }

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::internal_io(
            e.to_string(),
            Some(format!("{} (rename)", operation)),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn read_text_succeeds_for_existing_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "EventBus.game.emit_event(\"game_started\", [1])").unwrap();

        let content = read_text(temp.path()).unwrap();
        assert!(content.contains("emit_event"));
    }

    #[test]
    fn read_text_rejects_invalid_utf8() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(&[0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let err = read_text(temp.path()).unwrap_err();
        assert_eq!(err.code.as_str(), "internal.io_error");
    }

    #[test]
    fn read_text_returns_error_for_missing_file() {
        let err = read_text(Path::new("/nonexistent/path.gd")).unwrap_err();
        assert_eq!(err.code.as_str(), "internal.io_error");
    }

    #[test]
    fn write_text_atomic_replaces_content_and_cleans_temp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("player.gd");
        fs::write(&path, "old").unwrap();

        write_text_atomic(&path, "new content").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new content");
        assert!(!dir.path().join("player.gd.tmp").exists());
    }

    #[test]
    fn write_text_atomic_strips_bom() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bom.gd");

        write_text_atomic(&path, "\u{feff}extends Node\n").unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes, b"extends Node\n");
    }

    #[test]
    fn write_text_atomic_fails_for_missing_dir() {
        let err = write_text_atomic(Path::new("/nonexistent/dir/file.gd"), "content").unwrap_err();
        assert_eq!(err.code.as_str(), "internal.io_error");
    }

    #[test]
    fn write_text_atomic_fails_when_temp_path_is_blocked() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blocked.gd");
        fs::write(&path, "old").unwrap();
        fs::create_dir(dir.path().join("blocked.gd.tmp")).unwrap();

        let err = write_text_atomic(&path, "new").unwrap_err();

        assert_eq!(err.code.as_str(), "internal.io_error");
        assert_eq!(fs::read_to_string(&path).unwrap(), "old");
    }

    #[cfg(unix)]
    #[test]
    fn write_text_atomic_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tool.gd");
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o750)).unwrap();

        write_text_atomic(&path, "new").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o750);
    }

    #[cfg(unix)]
    #[test]
    fn write_text_atomic_writes_through_symlink() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target.gd");
        let link = dir.path().join("link.gd");
        fs::write(&target, "old").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        write_text_atomic(&link, "new").unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    }
}
