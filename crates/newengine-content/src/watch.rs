use crate::error::ContentResult;
use crate::source::FileSystem;
use log::{debug, info, warn};
use notify::event::{EventKind, ModifyKind};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub(crate) type ChangeSink = Arc<dyn Fn(&Path) + Send + Sync + 'static>;

/// Recursive OS watchers over the content directories.
///
/// Events arrive on notify's thread and are forwarded to the sink, which only
/// schedules work; nothing is reloaded from the watcher thread.
pub(crate) struct ContentWatcher {
    sink: ChangeSink,
    watchers: Vec<(PathBuf, RecommendedWatcher)>,
}

impl ContentWatcher {
    #[inline]
    pub fn new(sink: ChangeSink) -> Self {
        Self {
            sink,
            watchers: Vec::new(),
        }
    }

    /// Starts watching `dir`. Returns false if it is already watched or does not exist.
    pub fn watch(&mut self, dir: &Path) -> ContentResult<bool> {
        if self.watchers.iter().any(|(d, _)| d == dir) || !dir.is_dir() {
            return Ok(false);
        }

        let sink = self.sink.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_content_change(&event.kind) => {
                    for path in &event.paths {
                        sink(path);
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(target: "content::watch", "watch.error error='{}'", e),
            },
            notify::Config::default(),
        )?;
        watcher.watch(dir, RecursiveMode::Recursive)?;

        info!(target: "content::watch", "watch.start dir='{}'", dir.display());
        self.watchers.push((dir.to_path_buf(), watcher));
        Ok(true)
    }

    pub fn unwatch(&mut self, dir: &Path) -> bool {
        let before = self.watchers.len();
        self.watchers.retain(|(d, _)| d != dir);
        let removed = self.watchers.len() != before;
        if removed {
            info!(target: "content::watch", "watch.stop dir='{}'", dir.display());
        }
        removed
    }
}

impl Drop for ContentWatcher {
    fn drop(&mut self) {
        if !self.watchers.is_empty() {
            debug!(target: "content::watch", "watch.shutdown count={}", self.watchers.len());
        }
    }
}

#[inline]
fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

/// blake3 of the file contents, or `None` if it cannot be read (e.g. still being written).
pub(crate) fn content_hash(fs: &dyn FileSystem, path: &Path) -> Option<blake3::Hash> {
    let mut reader = fs.open_read(path).ok()?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; 16 * 1024];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buf[..n]);
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => return None,
        }
    }
    Some(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StdFileSystem;
    use notify::event::{CreateKind, DataChange, MetadataKind};

    #[test]
    fn only_data_changes_are_forwarded() {
        assert!(is_content_change(&EventKind::Create(CreateKind::File)));
        assert!(is_content_change(&EventKind::Modify(ModifyKind::Data(DataChange::Content))));
        assert!(!is_content_change(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::WriteTime
        ))));
        assert!(!is_content_change(&EventKind::Access(notify::event::AccessKind::Any)));
    }

    #[test]
    fn hash_tracks_contents() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a.txt");
        std::fs::write(&p, "one").unwrap();
        let a = content_hash(&StdFileSystem, &p).unwrap();
        std::fs::write(&p, "one").unwrap();
        assert_eq!(content_hash(&StdFileSystem, &p), Some(a));
        std::fs::write(&p, "two").unwrap();
        assert_ne!(content_hash(&StdFileSystem, &p), Some(a));
        assert!(content_hash(&StdFileSystem, &dir.path().join("missing")).is_none());
    }
}
