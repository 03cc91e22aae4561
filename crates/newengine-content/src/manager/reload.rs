use super::{record_edges, ContentManager};
use crate::density::ScreenDensityBucket;
use crate::error::{AssetError, ContentResult};
use crate::types::{AnyAsset, Asset, AssetType};
use crate::watch::{content_hash, ChangeSink, ContentWatcher};
use crate::watchers::{watcher_key, AssetWatcher, AssetWatcherCollection, WatchedAsset};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of reloading one cached density version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The candidate replaced the cached version.
    Committed,
    /// Watcher `watcher` rejected the candidate; the previous version stays cached.
    Rejected { watcher: usize },
    /// Loading failed; watched assets keep their last known good version.
    Recovered,
    /// The asset was purged while the candidate was loading.
    Discarded,
}

impl ContentManager {
    /// Registers `watcher` for reloads of `asset` at `density`.
    ///
    /// Returns false when watched content is disabled or the watcher is already registered.
    pub fn add_watcher<T: Asset>(
        &self,
        asset: &str,
        density: ScreenDensityBucket,
        watcher: Arc<dyn AssetWatcher<T>>,
    ) -> ContentResult<bool> {
        self.ensure_alive()?;
        if !self.config.watch_content {
            return Ok(false);
        }

        let ty = AssetType::of::<T>();
        let file = self.dependency_file(asset, density)?;
        let added = {
            let mut g = self.state.lock();
            let collection = g
                .watchers
                .entry(file.clone())
                .or_insert_with(|| AssetWatcherCollection::new(asset, density, ty));
            if collection.asset_type() != ty {
                return Err(AssetError::TypeMismatch {
                    asset: asset.to_owned(),
                    expected: ty.name(),
                    actual: collection.asset_type().name(),
                });
            }
            collection.add(watcher)
        };

        self.ensure_file_watchers()?;
        debug!(
            target: "content::reload",
            "watcher.add asset='{}' density={} file='{}' added={}",
            asset,
            density,
            file.display(),
            added
        );
        Ok(added)
    }

    pub fn remove_watcher<T: Asset>(
        &self,
        asset: &str,
        density: ScreenDensityBucket,
        watcher: &Arc<dyn AssetWatcher<T>>,
    ) -> ContentResult<bool> {
        self.ensure_alive()?;
        let key = watcher_key(watcher);

        let mut g = self.state.lock();
        let Some(file) = g
            .watchers
            .iter()
            .find(|(_, c)| c.asset_path() == asset && c.density() == density)
            .map(|(f, _)| f.clone())
        else {
            return Ok(false);
        };

        let removed = g.watchers.get_mut(&file).is_some_and(|c| c.remove(key));
        if g.watchers.get(&file).is_some_and(AssetWatcherCollection::is_empty) {
            g.watchers.remove(&file);
        }
        Ok(removed)
    }

    /// Watched asset owned by the manager and shared by every caller.
    pub fn get_shared_watched_asset<T: Asset>(
        &self,
        asset: &str,
        density: ScreenDensityBucket,
    ) -> ContentResult<Arc<WatchedAsset<T>>> {
        self.ensure_alive()?;
        let key = (asset.to_owned(), density);

        let existing = self.state.lock().shared_watched.get(&key).cloned();
        let shared = match existing {
            Some(shared) => shared,
            None => {
                let created: AnyAsset = WatchedAsset::<T>::new(self, asset, density)?;
                self.state
                    .lock()
                    .shared_watched
                    .entry(key)
                    .or_insert(created)
                    .clone()
            }
        };

        shared
            .downcast::<WatchedAsset<T>>()
            .map_err(|_| AssetError::TypeMismatch {
                asset: asset.to_owned(),
                expected: std::any::type_name::<T>(),
                actual: "another watched asset type",
            })
    }

    /// Starts OS watchers on the first watcher registration.
    fn ensure_file_watchers(&self) -> ContentResult<()> {
        if !self.config.watch_content || !self.config.file_system_events {
            return Ok(());
        }

        let mut guard = self.watch.lock();
        if guard.is_some() {
            return Ok(());
        }

        let weak = self.this.clone();
        let sink: ChangeSink = Arc::new(move |path: &Path| {
            if let Some(manager) = weak.upgrade() {
                manager.on_file_changed(path);
            }
        });

        let mut watcher = ContentWatcher::new(sink);
        for dir in self.resolver.watch_roots() {
            watcher.watch(&dir)?;
        }
        *guard = Some(watcher);
        Ok(())
    }

    /// Entry point for change notifications. Only schedules work on the queue.
    pub fn on_file_changed(&self, path: &Path) {
        if self.is_disposed() {
            return;
        }

        let full = self.full_path(path);
        if let Some(hash) = content_hash(self.file_system(), &full) {
            let previous = self.file_hashes.lock().insert(full.clone(), hash);
            if previous == Some(hash) {
                debug!(target: "content::watch", "change.unchanged file='{}'", full.display());
                return;
            }
        }

        let mut visited = HashSet::new();
        self.propagate_change(&full, None, &mut visited);
    }

    /// Schedules the asset mapped to `file` and walks its dependents once each.
    fn propagate_change(&self, file: &Path, known_asset: Option<&str>, visited: &mut HashSet<PathBuf>) {
        if !visited.insert(file.to_path_buf()) {
            return;
        }

        let (target, dependents) = {
            let g = self.state.lock();
            let deps = g.dependencies.get(file).cloned();
            let target = g
                .watchers
                .get(file)
                .map(|w| w.asset_path().to_owned())
                .or_else(|| deps.as_ref().map(|d| d.asset_path().to_owned()))
                .or_else(|| known_asset.map(str::to_owned))
                .filter(|asset| g.assets.contains_key(asset));
            (target, deps)
        };

        if let Some(asset) = target {
            self.schedule_reload(asset, file);
        }

        let Some(deps) = dependents else {
            return;
        };
        for (dependent, density) in deps.dependents() {
            match self.dependency_file(dependent, *density) {
                Ok(dependent_file) => self.propagate_change(&dependent_file, Some(dependent.as_str()), visited),
                Err(e) => warn!(
                    target: "content::reload",
                    "reload.dependent_unresolved dependency='{}' dependent='{}' error='{}'",
                    deps.asset_path(),
                    dependent,
                    e
                ),
            }
        }
    }

    fn schedule_reload(&self, asset: String, file: &Path) {
        if !self.pending_reloads.lock().insert(file.to_path_buf()) {
            debug!(target: "content::reload", "reload.coalesced asset='{}'", asset);
            return;
        }

        debug!(
            target: "content::reload",
            "reload.schedule asset='{}' file='{}'",
            asset,
            file.display()
        );

        let weak = self.this.clone();
        let file = file.to_path_buf();
        self.work_queue.post(move || {
            let Some(manager) = weak.upgrade() else {
                return;
            };
            manager.pending_reloads.lock().remove(&file);
            manager.reload_asset(&asset, &file);
        });
    }

    /// Reloads the cached density versions of `asset` that resolve to `file`.
    fn reload_asset(&self, asset: &str, file: &Path) {
        if self.is_disposed() {
            return;
        }

        let (ty, versions, watchers) = {
            let g = self.state.lock();
            let Some(entry) = g.assets.get(asset) else {
                return;
            };
            (entry.asset_type(), entry.versions(), g.watchers.get(file).cloned())
        };

        for (density, version) in versions {
            if !self.dependency_file(asset, density).is_ok_and(|f| f.as_path() == file) {
                continue;
            }
            let watchers = watchers.as_ref().filter(|w| w.density() == density);
            match self.reload_version(asset, ty, density, version.instance, watchers) {
                Ok(outcome) => debug!(
                    target: "content::reload",
                    "reload.done asset='{}' density={} outcome={:?}",
                    asset,
                    density,
                    outcome
                ),
                Err(e) => error!(
                    target: "content::reload",
                    "reload.failed asset='{}' density={} error='{}'",
                    asset,
                    density,
                    e
                ),
            }
        }
    }

    fn reload_version(
        &self,
        asset: &str,
        ty: AssetType,
        density: ScreenDensityBucket,
        last_known_good: AnyAsset,
        watchers: Option<&AssetWatcherCollection>,
    ) -> ContentResult<ReloadOutcome> {
        let (candidate, metadata) = match self.load_uncached(asset, ty, density, true) {
            Ok(loaded) => loaded,
            Err(e) if watchers.is_some_and(|w| !w.is_empty()) => {
                warn!(
                    target: "content::reload",
                    "reload.recovered asset='{}' density={} error='{}'",
                    asset,
                    density,
                    e
                );
                return Ok(ReloadOutcome::Recovered);
            }
            Err(e) => return Err(e),
        };

        if let Some(w) = watchers {
            if let Err(index) = w.validate(&candidate) {
                drop(candidate);
                warn!(
                    target: "content::reload",
                    "reload.rejected asset='{}' density={} watcher={}",
                    asset,
                    density,
                    index
                );
                w.notify(&last_known_good, false, Some(index));
                return Ok(ReloadOutcome::Rejected { watcher: index });
            }
        }

        let origin = self.origin_of(&metadata);
        let edges = self.dependency_edges(asset, &metadata);
        {
            let mut g = self.state.lock();
            let st = &mut *g;
            let Some(entry) = st.assets.get_mut(asset) else {
                return Ok(ReloadOutcome::Discarded);
            };
            entry.replace(density, candidate.clone(), origin);
            st.dependencies.clear_dependent_at(asset, density);
            record_edges(&mut st.dependencies, asset, density, edges);
        }

        if let Some(w) = watchers {
            w.notify(&candidate, true, None);
        }
        info!(
            target: "content::reload",
            "reload.committed asset='{}' density={} file='{}'",
            asset,
            density,
            metadata.asset_file_path().display()
        );
        Ok(ReloadOutcome::Committed)
    }
}
