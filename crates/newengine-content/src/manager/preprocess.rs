use super::ContentManager;
use crate::density::ScreenDensityBucket;
use crate::error::{AssetError, ContentResult};
use crate::manifest::ContentManifest;
use crate::metadata::load_asset_metadata;
use crate::path::normalize_asset_path;
use crate::preprocessed::PreprocessedWriter;
use crate::resolver::{AssetResolutionFlags, PREPROCESSED_EXTENSION};
use crate::types::{Asset, AssetType, LoadOptions};
use log::{info, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

impl ContentManager {
    /// Writes `<name>.uvc` next to the raw file of `asset` and of each of its density variants.
    ///
    /// Returns false if the processor for the asset does not support preprocessing.
    pub fn preprocess<T: Asset>(&self, asset: &str, delete: bool) -> ContentResult<bool> {
        self.preprocess_dynamic(asset, AssetType::of::<T>(), delete)
    }

    pub fn preprocess_dynamic(&self, asset: &str, ty: AssetType, delete: bool) -> ContentResult<bool> {
        self.ensure_alive()?;
        let normalized = normalize_asset_path(asset)?;
        let density = self.primary_density();

        let found = self
            .resolver
            .resolve(&normalized, None, density, AssetResolutionFlags::empty())?;
        let Some(found) = found else {
            // Already preprocessed with its source deleted.
            let preprocessed = self.resolver.resolve(
                &normalized,
                Some(PREPROCESSED_EXTENSION),
                density,
                AssetResolutionFlags::INCLUDE_PREPROCESSED,
            )?;
            return match preprocessed {
                Some(_) => Ok(true),
                None => Err(AssetError::not_found(&normalized)),
            };
        };

        let variants = self.resolver.list_possible_substitutions(
            &found.directory,
            &found.file,
            ScreenDensityBucket::Desktop,
            ScreenDensityBucket::ExtraExtraExtraHigh,
        );
        for variant in variants {
            if !self.preprocess_one(&variant, ty, density, delete)? {
                return Ok(false);
            }
        }

        self.preprocess_one(&normalized, ty, density, delete)
    }

    fn preprocess_one(
        &self,
        asset: &str,
        ty: AssetType,
        density: ScreenDensityBucket,
        delete: bool,
    ) -> ContentResult<bool> {
        let metadata = load_asset_metadata(&self.resolver, asset, density, false, false)?;
        if metadata.is_preprocessed() {
            return Ok(true);
        }

        let (intermediate, imported) = self.import_file(&metadata, ty)?;
        let processor = self.registry.find_processor(asset, imported, ty)?;
        if !processor.supports_preprocessing() {
            warn!(
                target: "content::preprocess",
                "preprocess.unsupported asset='{}' processor='{}'",
                asset,
                processor.id()
            );
            return Ok(false);
        }

        let output = metadata.asset_file_path().with_extension(PREPROCESSED_EXTENSION);
        {
            let mut file = self
                .file_system()
                .create(&output)
                .map_err(|e| AssetError::io(&output, e))?;
            let mut writer = PreprocessedWriter::new(&mut *file, &output);
            writer.write_header(processor.id())?;
            processor.export_dyn(self, &metadata, &mut writer, &*intermediate, delete)?;
            writer.flush()?;
        }

        info!(
            target: "content::preprocess",
            "preprocess.write asset='{}' processor='{}' file='{}'",
            asset,
            processor.id(),
            output.display()
        );

        if delete {
            self.delete_source_file(metadata.asset_file_path())?;
        }
        Ok(true)
    }

    /// Deletes a raw source file now, or defers it while deletions are batched.
    pub fn delete_source_file(&self, path: &Path) -> ContentResult<()> {
        {
            let mut batch = self.deletions.lock();
            if batch.enabled {
                if !batch.files.iter().any(|f| f == path) {
                    batch.files.push(path.to_path_buf());
                }
                return Ok(());
            }
        }
        remove_if_present(self, path)
    }

    #[inline]
    pub fn batch_deleted_files(&self) -> bool {
        self.deletions.lock().enabled
    }

    /// Turns batching on or off. Turning it off deletes everything batched so far.
    pub fn set_batch_deleted_files(&self, enabled: bool) -> ContentResult<()> {
        let was = {
            let mut batch = self.deletions.lock();
            if batch.guaranteed {
                return Err(AssetError::BatchGuaranteed);
            }
            std::mem::replace(&mut batch.enabled, enabled)
        };
        if was && !enabled {
            self.delete_files(self.take_batched());
        }
        Ok(())
    }

    /// Deletes every batched file.
    pub fn flush_deleted_files(&self) -> ContentResult<usize> {
        let files = {
            let mut batch = self.deletions.lock();
            if !batch.enabled {
                return Err(AssetError::NotBatchingDeletes);
            }
            std::mem::take(&mut batch.files)
        };
        Ok(self.delete_files(files))
    }

    fn take_batched(&self) -> Vec<PathBuf> {
        std::mem::take(&mut self.deletions.lock().files)
    }

    fn delete_files(&self, files: Vec<PathBuf>) -> usize {
        let mut deleted = 0usize;
        for file in files {
            match remove_if_present(self, &file) {
                Ok(()) => deleted += 1,
                Err(e) => warn!(
                    target: "content::preprocess",
                    "preprocess.delete_failed file='{}' error='{}'",
                    file.display(),
                    e
                ),
            }
        }
        if deleted > 0 {
            info!(target: "content::preprocess", "preprocess.deleted count={}", deleted);
        }
        deleted
    }

    /// Preprocesses every asset of every manifest with deletions batched for the whole run.
    ///
    /// Batched files are deleted only if the whole run succeeds.
    pub fn preprocess_manifests(&self, manifests: &[ContentManifest], delete: bool) -> ContentResult<()> {
        self.ensure_alive()?;

        let turned_on = {
            let mut batch = self.deletions.lock();
            let turned_on = !batch.enabled;
            batch.enabled = true;
            batch.guaranteed = true;
            turned_on
        };

        let result = self.preprocess_manifest_assets(manifests, delete);

        let discarded = {
            let mut batch = self.deletions.lock();
            batch.guaranteed = false;
            match (&result, turned_on) {
                (Err(_), true) => {
                    batch.enabled = false;
                    std::mem::take(&mut batch.files).len()
                }
                _ => 0,
            }
        };
        if discarded > 0 {
            warn!(
                target: "content::preprocess",
                "preprocess.manifest_failed kept_sources={}",
                discarded
            );
        }

        result?;
        if turned_on {
            self.set_batch_deleted_files(false)?;
        }
        Ok(())
    }

    fn preprocess_manifest_assets(&self, manifests: &[ContentManifest], delete: bool) -> ContentResult<()> {
        for manifest in manifests {
            let assets = manifest.resolve_assets(&self.registry)?;
            let mut written = 0usize;
            for (asset, ty) in assets {
                if self.preprocess_dynamic(&asset, ty, delete)? {
                    written += 1;
                }
            }
            info!(
                target: "content::preprocess",
                "preprocess.manifest name='{}' assets={} written={}",
                manifest.name,
                manifest.asset_count(),
                written
            );
        }
        Ok(())
    }

    /// Loads (and caches) every asset named by the manifest at the primary density.
    pub fn load_manifest(&self, manifest: &ContentManifest) -> ContentResult<usize> {
        self.ensure_alive()?;
        let assets = manifest.resolve_assets(&self.registry)?;
        for (asset, ty) in &assets {
            self.load_dynamic(asset, *ty, LoadOptions::default())?;
        }
        info!(
            target: "content",
            "manifest.load name='{}' assets={}",
            manifest.name,
            assets.len()
        );
        Ok(assets.len())
    }
}

fn remove_if_present(manager: &ContentManager, path: &Path) -> ContentResult<()> {
    match manager.file_system().remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AssetError::io(path, e)),
    }
}
