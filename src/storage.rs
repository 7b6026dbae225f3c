// ABOUTME: Per-document output layout with atomic whole-buffer writes
// ABOUTME: Every document gets its own folder of JSON snapshots and Markdown

use crate::util::sanitize_filename;
use crate::{Error, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub struct Paths {
    pub output_dir: PathBuf,
}

impl Paths {
    /// The output directory must already exist; it is never created.
    pub fn new(output_dir: PathBuf) -> Result<Self> {
        if !output_dir.is_dir() {
            return Err(Error::Config(format!(
                "Output directory '{}' does not exist or is not a directory",
                output_dir.display()
            )));
        }

        Ok(Paths { output_dir })
    }

    pub fn document(&self, doc_id: &str) -> DocumentPaths {
        DocumentPaths::new(self.output_dir.join(sanitize_filename(doc_id)))
    }
}

pub struct DocumentPaths {
    pub dir: PathBuf,
    pub document_json: PathBuf,
    pub transcript_json: PathBuf,
    pub metadata_json: PathBuf,
    pub resume_md: PathBuf,
    pub transcript_md: PathBuf,
}

impl DocumentPaths {
    fn new(dir: PathBuf) -> Self {
        DocumentPaths {
            document_json: dir.join("document.json"),
            transcript_json: dir.join("transcript.json"),
            metadata_json: dir.join("metadata.json"),
            resume_md: dir.join("resume.md"),
            transcript_md: dir.join("transcript.md"),
            dir,
        }
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o700);
            fs::set_permissions(&self.dir, perms)?;
        }
        Ok(())
    }
}

/// Writes `content` to a temp file beside `path`, then renames it into place.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    use rand::Rng;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    // Create temp file
    let random: u32 = rand::thread_rng().gen();
    let tmp_path = parent.join(format!(".{:x}.part", random));

    // Write to temp
    fs::write(&tmp_path, content)?;

    // Set permissions
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(&tmp_path, perms)?;
    }

    // Atomic rename
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, json.as_bytes())
}


#[cfg(test)]
mod write_tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_file() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("test.txt");
        write_atomic(&target, b"hello").unwrap();

        assert!(target.exists());
        assert_eq!(fs::read_to_string(&target).unwrap(), "hello");
    }

    #[test]
    fn test_write_atomic_overwrites_and_leaves_no_temp() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("test.txt");
        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "second");
        let leftovers = fs::read_dir(temp.path())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .ends_with(".part")
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    #[cfg(unix)]
    fn test_write_atomic_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let target = temp.path().join("test.txt");
        write_atomic(&target, b"hello").unwrap();

        let perms = fs::metadata(&target).unwrap().permissions();
        assert_eq!(perms.mode() & 0o777, 0o600);
    }

    #[test]
    fn test_write_json_pretty() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("data.json");
        write_json(&target, &serde_json::json!({"a": 1})).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "{\n  \"a\": 1\n}");
    }
}
