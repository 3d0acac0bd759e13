// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEntry {
    File { content: Vec<u8>, executable: bool },
    Dir,
}

/// In-memory filesystem for tests. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register `path` and all of its ancestors as directories.
    fn add_dirs(entries: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            entries
                .entry(ancestor.to_path_buf())
                .or_insert(MockEntry::Dir);
        }
    }

    /// Contents of a file written through [`FileSystem::write`].
    pub fn read_to_string(&self, path: &Path) -> Result<String> {
        match self.entries().get(path) {
            Some(MockEntry::File { content, .. }) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    pub fn is_executable(&self, path: &Path) -> bool {
        matches!(
            self.entries().get(path),
            Some(MockEntry::File { executable: true, .. })
        )
    }
}

impl FileSystem for MockFileSystem {
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let mut entries = self.entries();
        if let Some(parent) = path.parent() {
            Self::add_dirs(&mut entries, parent);
        }
        if matches!(entries.get(path), Some(MockEntry::Dir)) {
            return Err(anyhow!("Is a directory: {:?}", path));
        }
        entries.insert(
            path.to_path_buf(),
            MockEntry::File {
                content: contents.to_vec(),
                executable: false,
            },
        );
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut entries = self.entries();
        if matches!(entries.get(path), Some(MockEntry::File { .. })) {
            return Err(anyhow!("Is a file: {:?}", path));
        }
        Self::add_dirs(&mut entries, path);
        Ok(())
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.entries().get(path), Some(MockEntry::Dir))
    }

    fn set_executable(&self, path: &Path) -> Result<()> {
        match self.entries().get_mut(path) {
            Some(MockEntry::File { executable, .. }) => {
                *executable = true;
                Ok(())
            }
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }
}
