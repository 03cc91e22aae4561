use crate::error::AssetError;
use crate::metadata::AssetMetadata;
use crate::types::{Asset, AssetType, BoxedAsset};
use std::io::Read;

/// Typed importer: file stream -> intermediate `T`.
pub trait Importer<T: Asset>: Send + Sync + 'static {
    fn supported_extensions(&self) -> &'static [&'static str];

    fn import(&self, metadata: &AssetMetadata, reader: &mut dyn Read) -> Result<T, AssetError>;
}

/// Type-erased wrapper so the registry can keep heterogeneous importers.
pub(crate) trait AnyImporter: Send + Sync + 'static {
    fn output_type(&self) -> AssetType;
    fn supported_extensions(&self) -> &'static [&'static str];
    fn import_dyn(
        &self,
        metadata: &AssetMetadata,
        reader: &mut dyn Read,
    ) -> Result<BoxedAsset, AssetError>;
}

pub(crate) struct ImporterBox<T: Asset> {
    inner: Box<dyn Importer<T>>,
}

impl<T: Asset> ImporterBox<T> {
    #[inline]
    pub fn new(inner: Box<dyn Importer<T>>) -> Self {
        Self { inner }
    }
}

impl<T: Asset> AnyImporter for ImporterBox<T> {
    #[inline]
    fn output_type(&self) -> AssetType {
        AssetType::of::<T>()
    }

    #[inline]
    fn supported_extensions(&self) -> &'static [&'static str] {
        self.inner.supported_extensions()
    }

    fn import_dyn(
        &self,
        metadata: &AssetMetadata,
        reader: &mut dyn Read,
    ) -> Result<BoxedAsset, AssetError> {
        let v = self.inner.import(metadata, reader)?;
        Ok(Box::new(v))
    }
}
