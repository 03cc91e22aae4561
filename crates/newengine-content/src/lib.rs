//! Asset content manager: logical path resolution, metadata wrappers, density-aware caching,
//! dependency tracking, hot reload and preprocessing into `.uvc` containers.

mod cache;
mod dependencies;
mod watch;

pub mod config;
pub mod density;
pub mod error;
pub mod importers;
pub mod manager;
pub mod manifest;
pub mod metadata;
pub mod path;
pub mod preprocessed;
pub mod processors;
pub mod registry;
pub mod resolver;
pub mod source;
pub mod types;
pub mod watchers;
pub mod work_queue;

pub use config::{
    ConfigError, ContentConfigLoader, ContentConfigOverrides, ContentConfigReport, ContentConfigSource,
    ContentManagerConfig, ContentOverride, ContentOverrideSource,
};
pub use density::{DensityProvider, DisplayDensities, ScreenDensityBucket};
pub use dependencies::{globally_suppress_dependency_tracking, set_globally_suppress_dependency_tracking};
pub use error::{AssetError, ContentResult};
pub use importers::Importer;
pub use manager::{ContentManager, ContentManagerBuilder, ReloadOutcome};
pub use manifest::{ContentManifest, ContentManifestAsset, ContentManifestGroup};
pub use metadata::{AssetMetadata, MetadataBlock};
pub use path::normalize_asset_path;
pub use preprocessed::{PreprocessedReader, PreprocessedWriter};
pub use processors::Processor;
pub use registry::ContentRegistry;
pub use resolver::{AssetOrigin, AssetResolutionFlags};
pub use source::{FileSystem, StdFileSystem};
pub use types::{Asset, AssetFlags, AssetType, ContentMessage, LoadOptions};
pub use watchers::{AssetWatcher, WatchedAsset};
pub use work_queue::WorkQueue;
