//! Loading and saving.
//!
//! Regular files are mapped read-only and become an immutable block; pipes
//! and other irregular sources are streamed into an arena block. Saving
//! prefers a sibling temp file + fsync + rename so the target is replaced
//! atomically; a buffer that still maps the target never writes through the
//! live mapping. After a rename the old inode stays pinned by the mapping,
//! so existing pieces remain readable and undo history stays valid.

use crate::block::Block;
use crate::text::Text;
use crate::{Result, TextError};
use memmap2::Mmap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How a save reached the disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Temp file + rename; the target was replaced atomically.
    Atomic,
    /// Truncate-and-write fallback. Callers should surface a warning: a
    /// crash mid-write leaves a partial file.
    InPlace,
}

impl Text {
    /// Load `path`. Regular non-empty files are memory-mapped; anything else
    /// is streamed into memory. A missing file yields an empty buffer (it is
    /// created on first save).
    pub fn load(path: &Path) -> Result<Self> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };
        let meta = file.metadata()?;
        if meta.is_file() && meta.len() > 0 {
            // Safety: the mapping is read-only and the buffer never writes
            // through it; concurrent truncation by another process surfaces
            // as an IO fault, not as memory unsafety we could prevent here.
            let mmap = unsafe { Mmap::map(&file)? };
            debug!(target: "text.io", path = %path.display(), len = mmap.len(), "mapped");
            Ok(Self::with_content(
                Some(Block::Mapped(mmap)),
                Some(path.to_path_buf()),
            ))
        } else if meta.is_file() {
            Ok(Self::new())
        } else {
            let mut content = Vec::new();
            let mut reader = file;
            reader.read_to_end(&mut content)?;
            debug!(target: "text.io", path = %path.display(), len = content.len(), "streamed");
            Ok(Self::with_content(Some(Block::Arena(content)), None))
        }
    }

    /// Stream an arbitrary reader (e.g. stdin) into a fresh buffer.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;
        Ok(Self::with_content(Some(Block::Arena(content)), None))
    }

    /// Persist the buffer to `path`, sealing the pending action first.
    pub fn save(&mut self, path: &Path) -> Result<SaveOutcome> {
        self.snapshot();
        match self.save_atomic(path) {
            Ok(()) => {
                self.mark_saved();
                Ok(SaveOutcome::Atomic)
            }
            Err(err) => {
                if self.maps_target(path) {
                    // Writing in place would scribble over our own blocks.
                    return Err(err);
                }
                warn!(target: "text.io", path = %path.display(), error = %err, "atomic save failed, falling back to in-place write");
                self.save_in_place(path)?;
                self.mark_saved();
                Ok(SaveOutcome::InPlace)
            }
        }
    }

    fn maps_target(&self, path: &Path) -> bool {
        let Some(mapped) = self.path_of_mapping() else {
            return false;
        };
        match (fs::canonicalize(mapped), fs::canonicalize(path)) {
            (Ok(a), Ok(b)) => a == b,
            _ => mapped == path,
        }
    }

    fn temp_sibling(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        let tmp = format!(".{}.tmp-{}", name, std::process::id());
        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join(tmp),
            _ => PathBuf::from(tmp),
        }
    }

    fn save_atomic(&self, path: &Path) -> Result<()> {
        let tmp = Self::temp_sibling(path);
        let result = (|| -> Result<()> {
            let mut file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&tmp)?;
            for chunk in self.chunks(0) {
                file.write_all(chunk)?;
            }
            file.sync_all()?;
            // Carry over the permissions of an existing target.
            if let Ok(meta) = fs::metadata(path) {
                let _ = fs::set_permissions(&tmp, meta.permissions());
            }
            fs::rename(&tmp, path)?;
            Ok(())
        })();
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }

    fn save_in_place(&self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        for chunk in self.chunks(0) {
            file.write_all(chunk)?;
        }
        file.sync_all().map_err(TextError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::MetadataExt;

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let t = Text::load(&dir.path().join("nope.txt")).unwrap();
        assert_eq!(t.size(), 0);
        assert!(!t.modified());
    }

    #[test]
    fn load_edit_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "one\ntwo\n").unwrap();
        let mut t = Text::load(&path).unwrap();
        t.insert(4, b"1.5\n").unwrap();
        assert!(t.modified());
        let outcome = t.save(&path).unwrap();
        assert_eq!(outcome, SaveOutcome::Atomic);
        assert!(!t.modified());
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\n1.5\ntwo\n");
    }

    #[test]
    fn atomic_save_replaces_the_inode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "mapped content").unwrap();
        let before = fs::metadata(&path).unwrap().ino();
        let mut t = Text::load(&path).unwrap();
        t.insert(0, b"new ").unwrap();
        t.save(&path).unwrap();
        let after = fs::metadata(&path).unwrap().ino();
        assert_ne!(before, after, "temp-and-rename must replace the inode");
        assert_eq!(fs::read_to_string(&path).unwrap(), "new mapped content");
        // The old mapping stays readable: the buffer still serves its bytes.
        assert_eq!(t.bytes(), b"new mapped content");
    }

    #[test]
    fn save_to_fresh_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("created.txt");
        let mut t = Text::new();
        t.insert(0, b"fresh").unwrap();
        t.save(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh");
    }

    #[test]
    fn mapped_file_contents_are_served() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        let content = "x".repeat(8192);
        fs::write(&path, &content).unwrap();
        let t = Text::load(&path).unwrap();
        assert_eq!(t.size(), 8192);
        assert_eq!(t.byte_at(8191), Some(b'x'));
    }
}
