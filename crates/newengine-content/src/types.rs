use crate::density::ScreenDensityBucket;
use bitflags::bitflags;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// Anything the content manager can hand out. Implemented for every `Send + Sync` type.
pub trait Asset: Any + Send + Sync + 'static {}

impl<T: Any + Send + Sync + 'static> Asset for T {}

/// Shared, type-erased asset instance as stored in the cache.
pub type AnyAsset = Arc<dyn Any + Send + Sync>;

/// Owned, type-erased intermediate produced by an importer.
pub type BoxedAsset = Box<dyn Any + Send + Sync>;

/// Runtime identity of an asset type.
#[derive(Debug, Clone, Copy)]
pub struct AssetType {
    id: TypeId,
    name: &'static str,
}

impl AssetType {
    #[inline]
    pub fn of<T: Asset>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for AssetType {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for AssetType {}

impl std::hash::Hash for AssetType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

bitflags! {
    /// Per-asset cache policy.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AssetFlags: u32 {
        /// Keep the asset when the cache is purged because memory is low.
        const PRESERVE_THROUGH_LOW_MEMORY = 1 << 0;
    }
}

/// Options of a single load call.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Density to load; `None` means the primary display's density.
    pub density: Option<ScreenDensityBucket>,
    /// Store the result in the cache (and return a cached instance if present).
    pub cache: bool,
    /// Resolve against the solution content directory first.
    pub from_solution: bool,
}

impl Default for LoadOptions {
    #[inline]
    fn default() -> Self {
        Self {
            density: None,
            cache: true,
            from_solution: false,
        }
    }
}

impl LoadOptions {
    #[inline]
    pub fn with_density(mut self, density: ScreenDensityBucket) -> Self {
        self.density = Some(density);
        self
    }

    #[inline]
    pub fn uncached(mut self) -> Self {
        self.cache = false;
        self
    }

    #[inline]
    pub fn from_solution(mut self) -> Self {
        self.from_solution = true;
        self
    }
}

/// Host notifications the content manager reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMessage {
    LowMemory,
    DisplayDensityChanged,
}
