mod preprocess;
mod reload;

pub use reload::ReloadOutcome;

use crate::cache::AssetCacheEntry;
use crate::config::ContentManagerConfig;
use crate::density::{DensityProvider, DisplayDensities, ScreenDensityBucket};
use crate::dependencies::{globally_suppress_dependency_tracking, DependencyGraph};
use crate::error::{AssetError, ContentResult};
use crate::metadata::{load_asset_metadata, AssetMetadata};
use crate::path::normalize_asset_path;
use crate::preprocessed::PreprocessedReader;
use crate::registry::ContentRegistry;
use crate::resolver::{detect_solution_directory, AssetOrigin, PathResolver};
use crate::source::{FileSystem, StdFileSystem};
use crate::types::{AnyAsset, Asset, AssetFlags, AssetType, BoxedAsset, ContentMessage, LoadOptions};
use crate::watch::ContentWatcher;
use crate::watchers::AssetWatcherCollection;
use crate::work_queue::WorkQueue;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Everything guarded by the cache lock. Only in-memory map work happens under it.
#[derive(Default)]
struct CacheState {
    assets: HashMap<String, AssetCacheEntry>,
    flags: HashMap<String, AssetFlags>,
    dependencies: DependencyGraph,
    watchers: HashMap<PathBuf, AssetWatcherCollection>,
    shared_watched: HashMap<(String, ScreenDensityBucket), AnyAsset>,
}

#[derive(Default)]
struct DeletionBatch {
    enabled: bool,
    guaranteed: bool,
    files: Vec<PathBuf>,
}

/// Dependency file resolved for the dependent's density.
struct DependencyEdge {
    file: PathBuf,
    dependency: String,
}

/// Loads, caches and hot-reloads assets below a content root.
///
/// Created through [`ContentManager::builder`] as an `Arc`; reload work items hold a
/// `Weak` back-reference and run when the owner drains [`ContentManager::work_queue`].
pub struct ContentManager {
    config: ContentManagerConfig,
    resolver: PathResolver,
    registry: Arc<ContentRegistry>,
    density: Arc<dyn DensityProvider>,
    work_queue: WorkQueue,

    state: Mutex<CacheState>,
    deletions: Mutex<DeletionBatch>,
    watch: Mutex<Option<ContentWatcher>>,
    pending_reloads: Mutex<HashSet<PathBuf>>,
    file_hashes: Mutex<HashMap<PathBuf, blake3::Hash>>,

    suppress_dependency_tracking: AtomicBool,
    disposed: AtomicBool,
    this: Weak<ContentManager>,
}

pub struct ContentManagerBuilder {
    config: ContentManagerConfig,
    registry: Option<Arc<ContentRegistry>>,
    density: Option<Arc<dyn DensityProvider>>,
    fs: Option<Arc<dyn FileSystem>>,
    work_queue: Option<WorkQueue>,
}

impl ContentManagerBuilder {
    #[inline]
    pub fn with_registry(mut self, registry: Arc<ContentRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    #[inline]
    pub fn with_density_provider(mut self, density: Arc<dyn DensityProvider>) -> Self {
        self.density = Some(density);
        self
    }

    #[inline]
    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    /// Shares an existing queue (e.g. the host's main-thread queue).
    #[inline]
    pub fn with_work_queue(mut self, queue: WorkQueue) -> Self {
        self.work_queue = Some(queue);
        self
    }

    pub fn build(self) -> Arc<ContentManager> {
        let config = self.config;
        let fs = self.fs.unwrap_or_else(|| Arc::new(StdFileSystem));

        let solution = config
            .solution_directory
            .clone()
            .or_else(|| detect_solution_directory(&config.root_directory));
        let resolver = PathResolver::new(fs, &config.root_directory, solution.as_deref());
        for dir in &config.override_directories {
            resolver.add_override_directory(dir);
        }

        info!(
            target: "content",
            "manager.init root='{}' solution='{}' overrides={} watch={} fs_events={}",
            resolver.root().display(),
            resolver
                .solution_directory()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "none".to_owned()),
            resolver.override_directories().len(),
            config.watch_content,
            config.file_system_events
        );

        let deletions = DeletionBatch {
            enabled: config.batch_deleted_files,
            ..DeletionBatch::default()
        };
        let suppress = config.suppress_dependency_tracking;

        Arc::new_cyclic(|this| ContentManager {
            config,
            resolver,
            registry: self.registry.unwrap_or_default(),
            density: self
                .density
                .unwrap_or_else(|| Arc::new(DisplayDensities::single(ScreenDensityBucket::Desktop))),
            work_queue: self.work_queue.unwrap_or_default(),
            state: Mutex::new(CacheState::default()),
            deletions: Mutex::new(deletions),
            watch: Mutex::new(None),
            pending_reloads: Mutex::new(HashSet::new()),
            file_hashes: Mutex::new(HashMap::new()),
            suppress_dependency_tracking: AtomicBool::new(suppress),
            disposed: AtomicBool::new(false),
            this: this.clone(),
        })
    }
}

impl ContentManager {
    #[inline]
    pub fn builder(config: ContentManagerConfig) -> ContentManagerBuilder {
        ContentManagerBuilder {
            config,
            registry: None,
            density: None,
            fs: None,
            work_queue: None,
        }
    }

    #[inline]
    pub fn config(&self) -> &ContentManagerConfig {
        &self.config
    }

    #[inline]
    pub fn registry(&self) -> &Arc<ContentRegistry> {
        &self.registry
    }

    /// Queue of reload work items. Drain it from the thread that owns the assets.
    #[inline]
    pub fn work_queue(&self) -> &WorkQueue {
        &self.work_queue
    }

    #[inline]
    pub fn root_directory(&self) -> &Path {
        self.resolver.root()
    }

    #[inline]
    pub fn solution_directory(&self) -> Option<&Path> {
        self.resolver.solution_directory()
    }

    #[inline]
    pub fn primary_density(&self) -> ScreenDensityBucket {
        self.density.primary_density().unwrap_or_default()
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    #[inline]
    fn ensure_alive(&self) -> ContentResult<()> {
        if self.is_disposed() {
            return Err(AssetError::Disposed);
        }
        Ok(())
    }

    #[inline]
    fn file_system(&self) -> &dyn FileSystem {
        self.resolver.file_system().as_ref()
    }

    #[inline]
    fn full_path(&self, path: &Path) -> PathBuf {
        self.file_system().full_path(path)
    }

    // ---- loading ----

    #[inline]
    pub fn load<T: Asset>(&self, asset: &str) -> ContentResult<Arc<T>> {
        self.load_with(asset, LoadOptions::default())
    }

    pub fn load_with<T: Asset>(&self, asset: &str, options: LoadOptions) -> ContentResult<Arc<T>> {
        let ty = AssetType::of::<T>();
        let instance = self.load_dynamic(asset, ty, options)?;
        downcast_asset::<T>(asset, instance)
    }

    /// Get-or-load for a runtime asset type.
    pub fn load_dynamic(&self, asset: &str, ty: AssetType, options: LoadOptions) -> ContentResult<AnyAsset> {
        self.ensure_alive()?;
        let density = options.density.unwrap_or_else(|| self.primary_density());

        if options.cache {
            if let Some(hit) = self.cached(asset, ty, density)? {
                return Ok(hit);
            }
        }

        let (instance, metadata) = self.load_uncached(asset, ty, density, options.from_solution)?;
        if !options.cache {
            return Ok(instance);
        }
        self.commit(asset, ty, density, instance, &metadata)
    }

    fn cached(&self, asset: &str, ty: AssetType, density: ScreenDensityBucket) -> ContentResult<Option<AnyAsset>> {
        let g = self.state.lock();
        let Some(entry) = g.assets.get(asset) else {
            return Ok(None);
        };
        if entry.asset_type() != ty {
            return Err(AssetError::TypeMismatch {
                asset: asset.to_owned(),
                expected: ty.name(),
                actual: entry.asset_type().name(),
            });
        }
        Ok(entry.get(density).map(|v| {
            debug!(target: "content", "cache.hit asset='{}' density={}", asset, density);
            v.instance.clone()
        }))
    }

    /// Stores a freshly loaded instance, or yields to one committed concurrently.
    fn commit(
        &self,
        asset: &str,
        ty: AssetType,
        density: ScreenDensityBucket,
        instance: AnyAsset,
        metadata: &AssetMetadata,
    ) -> ContentResult<AnyAsset> {
        let origin = self.origin_of(metadata);
        let edges = self.dependency_edges(asset, metadata);

        let mut g = self.state.lock();
        let st = &mut *g;
        let entry = st
            .assets
            .entry(asset.to_owned())
            .or_insert_with(|| AssetCacheEntry::new(ty));
        if entry.asset_type() != ty {
            return Err(AssetError::TypeMismatch {
                asset: asset.to_owned(),
                expected: ty.name(),
                actual: entry.asset_type().name(),
            });
        }

        let committed = entry.get_or_insert(density, instance.clone(), origin);
        st.flags.entry(asset.to_owned()).or_default();
        if Arc::ptr_eq(&committed, &instance) {
            record_edges(&mut st.dependencies, asset, density, edges);
        }
        Ok(committed)
    }

    /// Full pipeline, bypassing the cache.
    pub(crate) fn load_uncached(
        &self,
        asset: &str,
        ty: AssetType,
        density: ScreenDensityBucket,
        from_solution: bool,
    ) -> ContentResult<(AnyAsset, AssetMetadata)> {
        let normalized = normalize_asset_path(asset)?;
        let metadata = load_asset_metadata(&self.resolver, &normalized, density, true, from_solution)?;

        let instance = if metadata.is_preprocessed() {
            self.load_preprocessed(&metadata, ty)?
        } else {
            let (intermediate, imported) = self.import_file(&metadata, ty)?;
            let processor = self
                .registry
                .find_processor(metadata.asset_path(), imported, ty)?;
            processor.process_dyn(self, &metadata, intermediate)?
        };

        debug!(
            target: "content",
            "asset.load asset='{}' density={} file='{}' preprocessed={}",
            asset,
            density,
            metadata.asset_file_path().display(),
            metadata.is_preprocessed()
        );
        Ok((instance, metadata))
    }

    fn load_preprocessed(&self, metadata: &AssetMetadata, ty: AssetType) -> ContentResult<AnyAsset> {
        let path = metadata.asset_file_path();
        let mut file = self
            .file_system()
            .open_read(path)
            .map_err(|e| AssetError::io(path, e))?;
        let mut reader = PreprocessedReader::new(&mut *file, path);

        let id = reader.read_header()?;
        let processor = self
            .registry
            .processor_by_id(&id)
            .ok_or_else(|| AssetError::UnknownProcessor {
                path: path.to_path_buf(),
                id: id.clone(),
            })?;
        if processor.output_type() != ty {
            return Err(AssetError::PreprocessedTypeMismatch {
                path: path.to_path_buf(),
                expected: ty.name(),
                actual: processor.output_type().name(),
            });
        }
        processor.import_preprocessed_dyn(self, metadata, &mut reader)
    }

    /// Runs the importer for the metadata's file. Returns the intermediate and its type.
    pub(crate) fn import_file(
        &self,
        metadata: &AssetMetadata,
        requested: AssetType,
    ) -> ContentResult<(BoxedAsset, AssetType)> {
        let path = metadata.asset_file_path();
        let mut reader = self
            .file_system()
            .open_read(path)
            .map_err(|e| AssetError::io(path, e))?;
        self.import_reader(metadata, &mut *reader, requested)
    }

    fn import_reader(
        &self,
        metadata: &AssetMetadata,
        reader: &mut dyn Read,
        requested: AssetType,
    ) -> ContentResult<(BoxedAsset, AssetType)> {
        let ext = metadata.extension();
        let importer = self
            .registry
            .find_importer(metadata.asset_path(), ext.as_deref(), requested)?;
        let value = importer.import_dyn(metadata, reader)?;
        Ok((value, importer.output_type()))
    }

    /// Imports the file behind `asset` without processing or caching.
    pub fn import<T: Asset>(
        &self,
        asset: &str,
        density: Option<ScreenDensityBucket>,
        from_solution: bool,
    ) -> ContentResult<T> {
        self.ensure_alive()?;
        let density = density.unwrap_or_else(|| self.primary_density());
        let normalized = normalize_asset_path(asset)?;
        let metadata = load_asset_metadata(&self.resolver, &normalized, density, false, from_solution)?;

        let (value, _) = self.import_file(&metadata, AssetType::of::<T>())?;
        value
            .downcast::<T>()
            .map(|v| *v)
            .map_err(|_| AssetError::ImporterOutputInvalid {
                asset: asset.to_owned(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Runs the processor for `(I, O)` on an in-memory object.
    pub fn process<I: Asset, O: Asset>(&self, input: I) -> ContentResult<O> {
        self.ensure_alive()?;
        let metadata = AssetMetadata::in_memory(self.primary_density());
        let processor = self.registry.find_processor(
            "",
            AssetType::of::<I>(),
            AssetType::of::<O>(),
        )?;
        let out = processor.process_dyn(self, &metadata, Box::new(input))?;
        let out = downcast_asset::<O>("", out)?;
        Arc::try_unwrap(out).map_err(|_| AssetError::other("processor kept a reference to its output"))
    }

    /// Imports and processes a stream. The result is never cached.
    pub fn load_from_stream<T: Asset>(
        &self,
        reader: &mut dyn Read,
        extension: &str,
        density: Option<ScreenDensityBucket>,
    ) -> ContentResult<Arc<T>> {
        self.ensure_alive()?;
        let ty = AssetType::of::<T>();
        let metadata = AssetMetadata::for_stream(extension, density.unwrap_or_else(|| self.primary_density()));

        let (intermediate, imported) = self.import_reader(&metadata, reader, ty)?;
        let processor = self
            .registry
            .find_processor(metadata.asset_path(), imported, ty)?;
        let out = processor.process_dyn(self, &metadata, intermediate)?;
        downcast_asset::<T>(metadata.asset_path(), out)
    }

    /// Physical file `asset` resolves to.
    pub fn resolve_asset_file_path(
        &self,
        asset: &str,
        density: Option<ScreenDensityBucket>,
        from_solution: bool,
    ) -> ContentResult<PathBuf> {
        self.ensure_alive()?;
        let density = density.unwrap_or_else(|| self.primary_density());
        let normalized = normalize_asset_path(asset)?;
        let metadata = load_asset_metadata(&self.resolver, &normalized, density, true, from_solution)?;
        Ok(metadata.asset_file_path().to_path_buf())
    }

    /// Where the cached version of `asset` at `density` was loaded from.
    pub fn cached_origin(&self, asset: &str, density: ScreenDensityBucket) -> ContentResult<Option<AssetOrigin>> {
        self.ensure_alive()?;
        let g = self.state.lock();
        Ok(g.assets
            .get(asset)
            .and_then(|e| e.get(density))
            .map(|v| v.origin.clone()))
    }

    fn origin_of(&self, metadata: &AssetMetadata) -> AssetOrigin {
        if let Some(dir) = metadata.override_directory() {
            return AssetOrigin::Override(dir.to_path_buf());
        }
        match self.resolver.solution_directory() {
            Some(sln) if metadata.from_solution() && metadata.asset_file_path().starts_with(sln) => {
                AssetOrigin::Solution
            }
            _ => AssetOrigin::Root,
        }
    }

    // ---- flags and purging ----

    pub fn get_asset_flags(&self, asset: &str) -> ContentResult<Option<AssetFlags>> {
        self.ensure_alive()?;
        Ok(self.state.lock().flags.get(asset).copied())
    }

    pub fn set_asset_flags(&self, asset: &str, flags: AssetFlags) -> ContentResult<()> {
        self.ensure_alive()?;
        self.state.lock().flags.insert(asset.to_owned(), flags);
        Ok(())
    }

    /// Resets the flags of `asset` to empty. Returns the previous flags.
    pub fn clear_asset_flags(&self, asset: &str) -> ContentResult<Option<AssetFlags>> {
        self.ensure_alive()?;
        let mut g = self.state.lock();
        Ok(g.flags
            .get_mut(asset)
            .map(|f| std::mem::replace(f, AssetFlags::empty())))
    }

    pub fn purge_cache(&self, asset: &str, low_memory: bool) -> ContentResult<bool> {
        self.ensure_alive()?;
        let mut g = self.state.lock();
        Ok(purge_locked(&mut g, asset, low_memory))
    }

    /// Purges every asset that has flags. Returns the number removed.
    pub fn purge_all(&self, low_memory: bool) -> ContentResult<usize> {
        self.ensure_alive()?;
        let mut g = self.state.lock();
        let keys: Vec<String> = g.flags.keys().cloned().collect();
        let mut purged = 0usize;
        for k in &keys {
            if purge_locked(&mut g, k, low_memory) {
                purged += 1;
            }
        }
        info!(target: "content", "cache.purge count={} low_memory={}", purged, low_memory);
        Ok(purged)
    }

    /// Drops versions for densities no display uses; empty entries are purged.
    pub fn purge_unused_densities(&self) -> ContentResult<usize> {
        self.ensure_alive()?;
        let in_use = self.density.densities_in_use();

        let mut g = self.state.lock();
        let st = &mut *g;
        let mut emptied = Vec::new();
        for (k, e) in st.assets.iter_mut() {
            for b in ScreenDensityBucket::ALL.into_iter().filter(|b| !in_use.contains(b)) {
                st.dependencies.clear_dependent_at(k, b);
            }
            if e.purge_unused_versions(&in_use) {
                emptied.push(k.clone());
            }
        }
        for k in &emptied {
            purge_locked(st, k, false);
        }
        info!(
            target: "content",
            "cache.purge_densities in_use={:?} emptied={}",
            in_use,
            emptied.len()
        );
        Ok(emptied.len())
    }

    pub fn receive_message(&self, message: ContentMessage) -> ContentResult<()> {
        match message {
            ContentMessage::LowMemory => self.purge_all(true).map(|_| ()),
            ContentMessage::DisplayDensityChanged => self.purge_unused_densities().map(|_| ()),
        }
    }

    /// Number of logical assets with at least one cached version.
    pub fn cached_asset_count(&self) -> usize {
        self.state.lock().assets.len()
    }

    // ---- dependencies ----

    #[inline]
    pub fn dependency_tracking_suppressed(&self) -> bool {
        self.suppress_dependency_tracking.load(Ordering::Relaxed) || globally_suppress_dependency_tracking()
    }

    #[inline]
    pub fn set_suppress_dependency_tracking(&self, suppress: bool) {
        self.suppress_dependency_tracking.store(suppress, Ordering::Relaxed);
    }

    fn dependency_file(&self, dependency: &str, density: ScreenDensityBucket) -> ContentResult<PathBuf> {
        let file = self.resolve_asset_file_path(dependency, Some(density), true)?;
        Ok(self.full_path(&file))
    }

    fn dependency_edges(&self, asset: &str, metadata: &AssetMetadata) -> Vec<DependencyEdge> {
        if self.dependency_tracking_suppressed() {
            return Vec::new();
        }
        metadata
            .asset_dependencies()
            .into_iter()
            .filter_map(|dependency| match self.dependency_file(&dependency, metadata.density()) {
                Ok(file) => Some(DependencyEdge { file, dependency }),
                Err(e) => {
                    warn!(
                        target: "content",
                        "dependency.unresolved asset='{}' dependency='{}' error='{}'",
                        asset,
                        dependency,
                        e
                    );
                    None
                }
            })
            .collect()
    }

    /// Records that `asset` must reload whenever `dependency` changes.
    ///
    /// Returns false without recording anything while tracking is suppressed.
    pub fn add_asset_dependency(
        &self,
        asset: &str,
        dependency: &str,
        density: Option<ScreenDensityBucket>,
    ) -> ContentResult<bool> {
        self.ensure_alive()?;
        if self.dependency_tracking_suppressed() {
            return Ok(false);
        }
        let density = density.unwrap_or_else(|| self.primary_density());
        let file = self.dependency_file(dependency, density)?;
        self.state
            .lock()
            .dependencies
            .add(file, dependency, density, asset);
        Ok(true)
    }

    pub fn remove_asset_dependency(
        &self,
        asset: &str,
        dependency: &str,
        density: Option<ScreenDensityBucket>,
    ) -> ContentResult<bool> {
        self.ensure_alive()?;
        let density = density.unwrap_or_else(|| self.primary_density());
        let file = self.dependency_file(dependency, density)?;
        Ok(self.state.lock().dependencies.remove(&file, asset))
    }

    pub fn is_asset_dependency(
        &self,
        asset: &str,
        dependency: &str,
        density: Option<ScreenDensityBucket>,
    ) -> ContentResult<bool> {
        self.ensure_alive()?;
        let density = density.unwrap_or_else(|| self.primary_density());
        let file = self.dependency_file(dependency, density)?;
        Ok(self.state.lock().dependencies.contains(&file, asset))
    }

    pub fn is_asset_dependency_path(&self, asset: &str, dependency_file: &Path) -> ContentResult<bool> {
        self.ensure_alive()?;
        let file = self.full_path(dependency_file);
        Ok(self.state.lock().dependencies.contains(&file, asset))
    }

    pub fn clear_asset_dependencies(&self, asset: &str) -> ContentResult<()> {
        self.ensure_alive()?;
        self.state.lock().dependencies.clear_dependent(asset);
        Ok(())
    }

    pub fn clear_all_asset_dependencies(&self) -> ContentResult<()> {
        self.ensure_alive()?;
        self.state.lock().dependencies.clear();
        Ok(())
    }

    // ---- directory listing ----

    fn listing(&self, path: &str, pattern: &str, directories: bool) -> ContentResult<BTreeMap<String, PathBuf>> {
        self.ensure_alive()?;
        let normalized = normalize_asset_path(path)?;
        let pattern = glob::Pattern::new(pattern)
            .map_err(|e| AssetError::other(format!("invalid search pattern '{}': {}", pattern, e)))?;
        self.resolver.list_directory(&normalized, &pattern, directories)
    }

    /// Logical paths of the files in `path` across the root and every override directory.
    pub fn get_assets_in_directory(&self, path: &str, pattern: &str) -> ContentResult<Vec<String>> {
        Ok(self.listing(path, pattern, false)?.into_keys().collect())
    }

    pub fn get_asset_file_paths_in_directory(&self, path: &str, pattern: &str) -> ContentResult<Vec<PathBuf>> {
        Ok(self.listing(path, pattern, false)?.into_values().collect())
    }

    pub fn get_subdirectories(&self, path: &str, pattern: &str) -> ContentResult<Vec<String>> {
        Ok(self.listing(path, pattern, true)?.into_keys().collect())
    }

    // ---- override directories ----

    /// Adds a directory searched after the existing ones. Returns false if already present.
    pub fn add_override_directory(&self, dir: &Path) -> ContentResult<bool> {
        self.ensure_alive()?;
        let Some(full) = self.resolver.add_override_directory(dir) else {
            return Ok(false);
        };
        if let Some(watch) = self.watch.lock().as_mut() {
            watch.watch(&full)?;
        }
        info!(target: "content", "override.add dir='{}'", full.display());
        Ok(true)
    }

    pub fn remove_override_directory(&self, dir: &Path) -> ContentResult<bool> {
        self.ensure_alive()?;
        if !self.resolver.remove_override_directory(dir) {
            return Ok(false);
        }
        let full = self.full_path(dir);
        if let Some(watch) = self.watch.lock().as_mut() {
            watch.unwatch(&full);
        }
        info!(target: "content", "override.remove dir='{}'", full.display());
        Ok(true)
    }

    #[inline]
    pub fn override_directories(&self) -> Vec<PathBuf> {
        self.resolver.override_directories()
    }

    // ---- lifecycle ----

    /// Releases every cached asset and stops file watching. Later calls fail with `Disposed`.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let watcher = self.watch.lock().take();
        drop(watcher);

        let released = {
            let mut g = self.state.lock();
            let n = g.assets.len();
            *g = CacheState::default();
            n
        };
        self.deletions.lock().files.clear();
        self.pending_reloads.lock().clear();
        self.file_hashes.lock().clear();

        info!(target: "content", "manager.dispose released={}", released);
    }
}

impl Drop for ContentManager {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn purge_locked(state: &mut CacheState, asset: &str, low_memory: bool) -> bool {
    let Some(flags) = state.flags.get(asset).copied() else {
        return false;
    };
    if low_memory && flags.contains(AssetFlags::PRESERVE_THROUGH_LOW_MEMORY) {
        return false;
    }
    let removed = state.assets.remove(asset).is_some();
    state.dependencies.clear_dependent(asset);
    if removed {
        debug!(target: "content", "cache.evict asset='{}' low_memory={}", asset, low_memory);
    }
    removed
}

fn record_edges(
    graph: &mut DependencyGraph,
    asset: &str,
    density: ScreenDensityBucket,
    edges: Vec<DependencyEdge>,
) {
    for edge in edges {
        graph.add(edge.file, &edge.dependency, density, asset);
    }
}

fn downcast_asset<T: Asset>(asset: &str, instance: AnyAsset) -> ContentResult<Arc<T>> {
    instance
        .downcast::<T>()
        .map_err(|_| AssetError::ImporterOutputInvalid {
            asset: asset.to_owned(),
            expected: std::any::type_name::<T>(),
        })
}
