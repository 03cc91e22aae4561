use crate::density::ScreenDensityBucket;
use crate::error::ContentResult;
use crate::manager::ContentManager;
use crate::types::{AnyAsset, Asset, AssetType, LoadOptions};
use parking_lot::RwLock;
use std::sync::Arc;

/// Hook invoked while a watched asset is hot-reloaded.
pub trait AssetWatcher<T: Asset>: Send + Sync + 'static {
    /// Called with the freshly loaded candidate before it is committed.
    /// Returning false rolls the reload back.
    fn on_validating(&self, _asset: &str, _candidate: &Arc<T>) -> bool {
        true
    }

    /// Called after commit (`validated == true`, with the new instance) or after rollback
    /// (`validated == false`, with the instance that stays in the cache).
    fn on_validation_complete(&self, _asset: &str, _instance: &Arc<T>, _validated: bool) {}
}

pub(crate) trait AnyWatcher: Send + Sync {
    fn key(&self) -> usize;
    fn validating(&self, asset: &str, candidate: &AnyAsset) -> bool;
    fn complete(&self, asset: &str, instance: &AnyAsset, validated: bool);
}

struct TypedWatcher<T: Asset> {
    inner: Arc<dyn AssetWatcher<T>>,
}

#[inline]
pub(crate) fn watcher_key<T: Asset>(w: &Arc<dyn AssetWatcher<T>>) -> usize {
    Arc::as_ptr(w) as *const () as usize
}

impl<T: Asset> AnyWatcher for TypedWatcher<T> {
    #[inline]
    fn key(&self) -> usize {
        watcher_key(&self.inner)
    }

    fn validating(&self, asset: &str, candidate: &AnyAsset) -> bool {
        match candidate.clone().downcast::<T>() {
            Ok(v) => self.inner.on_validating(asset, &v),
            Err(_) => false,
        }
    }

    fn complete(&self, asset: &str, instance: &AnyAsset, validated: bool) {
        if let Ok(v) = instance.clone().downcast::<T>() {
            self.inner.on_validation_complete(asset, &v, validated);
        }
    }
}

/// Watchers of one asset file, in registration order.
#[derive(Clone)]
pub(crate) struct AssetWatcherCollection {
    asset_path: String,
    density: ScreenDensityBucket,
    asset_type: AssetType,
    watchers: Vec<Arc<dyn AnyWatcher>>,
}

impl AssetWatcherCollection {
    #[inline]
    pub fn new(asset_path: &str, density: ScreenDensityBucket, asset_type: AssetType) -> Self {
        Self {
            asset_path: asset_path.to_owned(),
            density,
            asset_type,
            watchers: Vec::new(),
        }
    }

    #[inline]
    pub fn asset_path(&self) -> &str {
        &self.asset_path
    }

    #[inline]
    pub fn density(&self) -> ScreenDensityBucket {
        self.density
    }

    #[inline]
    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    pub fn add<T: Asset>(&mut self, watcher: Arc<dyn AssetWatcher<T>>) -> bool {
        let key = watcher_key(&watcher);
        if self.watchers.iter().any(|w| w.key() == key) {
            return false;
        }
        self.watchers.push(Arc::new(TypedWatcher { inner: watcher }));
        true
    }

    pub fn remove(&mut self, key: usize) -> bool {
        let before = self.watchers.len();
        self.watchers.retain(|w| w.key() != key);
        self.watchers.len() != before
    }

    /// Runs validation in order; `Err(i)` names the first watcher that rejected.
    pub fn validate(&self, candidate: &AnyAsset) -> Result<(), usize> {
        for (i, w) in self.watchers.iter().enumerate() {
            if !w.validating(&self.asset_path, candidate) {
                return Err(i);
            }
        }
        Ok(())
    }

    /// Notifies watchers `0..=last` (or all of them).
    pub fn notify(&self, instance: &AnyAsset, validated: bool, last: Option<usize>) {
        let end = last.map_or(self.watchers.len(), |i| (i + 1).min(self.watchers.len()));
        for w in &self.watchers[..end] {
            w.complete(&self.asset_path, instance, validated);
        }
    }
}

type ValidatingFn<T> = Box<dyn Fn(&str, &Arc<T>) -> bool + Send + Sync>;

/// Asset reference that follows hot reloads of its source.
pub struct WatchedAsset<T: Asset> {
    asset: String,
    density: ScreenDensityBucket,
    value: RwLock<Arc<T>>,
    validating: Option<ValidatingFn<T>>,
}

impl<T: Asset> WatchedAsset<T> {
    /// Loads `asset` and registers the wrapper as a watcher of it.
    pub fn new(
        manager: &ContentManager,
        asset: &str,
        density: ScreenDensityBucket,
    ) -> ContentResult<Arc<Self>> {
        Self::create(manager, asset, density, None)
    }

    /// Like [`WatchedAsset::new`], with a predicate that can veto reloaded content.
    pub fn with_validator(
        manager: &ContentManager,
        asset: &str,
        density: ScreenDensityBucket,
        validating: impl Fn(&str, &Arc<T>) -> bool + Send + Sync + 'static,
    ) -> ContentResult<Arc<Self>> {
        Self::create(manager, asset, density, Some(Box::new(validating)))
    }

    fn create(
        manager: &ContentManager,
        asset: &str,
        density: ScreenDensityBucket,
        validating: Option<ValidatingFn<T>>,
    ) -> ContentResult<Arc<Self>> {
        let value = manager.load_with::<T>(asset, LoadOptions::default().with_density(density))?;
        let this = Arc::new(Self {
            asset: asset.to_owned(),
            density,
            value: RwLock::new(value),
            validating,
        });
        manager.add_watcher::<T>(asset, density, this.clone())?;
        Ok(this)
    }

    #[inline]
    pub fn asset_path(&self) -> &str {
        &self.asset
    }

    #[inline]
    pub fn density(&self) -> ScreenDensityBucket {
        self.density
    }

    /// Current instance; replaced after every validated reload.
    #[inline]
    pub fn value(&self) -> Arc<T> {
        self.value.read().clone()
    }
}

impl<T: Asset> AssetWatcher<T> for WatchedAsset<T> {
    fn on_validating(&self, asset: &str, candidate: &Arc<T>) -> bool {
        self.validating
            .as_ref()
            .map_or(true, |f| f(asset, candidate))
    }

    fn on_validation_complete(&self, _asset: &str, instance: &Arc<T>, validated: bool) {
        if validated {
            *self.value.write() = instance.clone();
        }
    }
}
