use crate::error::AssetError;
use crate::manager::ContentManager;
use crate::metadata::AssetMetadata;
use crate::preprocessed::{PreprocessedReader, PreprocessedWriter};
use crate::types::{AnyAsset, Asset, AssetType, BoxedAsset};
use std::any::Any;
use std::sync::Arc;

/// Identifier recorded for the built-in identity processor.
pub const PASSTHROUGH_PROCESSOR_ID: &str = "newengine.content.passthrough";

/// Typed processor: intermediate `I` -> final asset `O`.
///
/// Processors that support preprocessing write a payload that `import_preprocessed`
/// turns back into `O` without the importer.
pub trait Processor<I: Asset, O: Asset>: Send + Sync + 'static {
    fn process(
        &self,
        manager: &ContentManager,
        metadata: &AssetMetadata,
        input: I,
    ) -> Result<O, AssetError>;

    fn supports_preprocessing(&self) -> bool {
        false
    }

    /// Writes the payload after the container header. `delete` mirrors the preprocess
    /// request so processors can schedule their own raw dependencies for deletion.
    fn export_preprocessed(
        &self,
        _manager: &ContentManager,
        _metadata: &AssetMetadata,
        _writer: &mut PreprocessedWriter<'_>,
        _input: &I,
        _delete: bool,
    ) -> Result<(), AssetError> {
        Err(AssetError::other("processor does not export preprocessed data"))
    }

    fn import_preprocessed(
        &self,
        _manager: &ContentManager,
        _metadata: &AssetMetadata,
        _reader: &mut PreprocessedReader<'_>,
    ) -> Result<O, AssetError> {
        Err(AssetError::other("processor does not import preprocessed data"))
    }
}

pub(crate) trait AnyProcessor: Send + Sync + 'static {
    fn id(&self) -> &str;
    fn input_type(&self) -> AssetType;
    fn output_type(&self) -> AssetType;
    fn supports_preprocessing(&self) -> bool;

    fn process_dyn(
        &self,
        manager: &ContentManager,
        metadata: &AssetMetadata,
        input: BoxedAsset,
    ) -> Result<AnyAsset, AssetError>;

    fn export_dyn(
        &self,
        manager: &ContentManager,
        metadata: &AssetMetadata,
        writer: &mut PreprocessedWriter<'_>,
        input: &(dyn Any + Send + Sync),
        delete: bool,
    ) -> Result<(), AssetError>;

    fn import_preprocessed_dyn(
        &self,
        manager: &ContentManager,
        metadata: &AssetMetadata,
        reader: &mut PreprocessedReader<'_>,
    ) -> Result<AnyAsset, AssetError>;
}

pub(crate) struct ProcessorBox<I: Asset, O: Asset> {
    id: Arc<str>,
    inner: Box<dyn Processor<I, O>>,
}

impl<I: Asset, O: Asset> ProcessorBox<I, O> {
    #[inline]
    pub fn new(id: Arc<str>, inner: Box<dyn Processor<I, O>>) -> Self {
        Self { id, inner }
    }
}

#[inline]
fn input_mismatch<I: Asset>(metadata: &AssetMetadata) -> AssetError {
    AssetError::ImporterOutputInvalid {
        asset: metadata.asset_path().to_owned(),
        expected: std::any::type_name::<I>(),
    }
}

impl<I: Asset, O: Asset> AnyProcessor for ProcessorBox<I, O> {
    #[inline]
    fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    fn input_type(&self) -> AssetType {
        AssetType::of::<I>()
    }

    #[inline]
    fn output_type(&self) -> AssetType {
        AssetType::of::<O>()
    }

    #[inline]
    fn supports_preprocessing(&self) -> bool {
        self.inner.supports_preprocessing()
    }

    fn process_dyn(
        &self,
        manager: &ContentManager,
        metadata: &AssetMetadata,
        input: BoxedAsset,
    ) -> Result<AnyAsset, AssetError> {
        let input = input
            .downcast::<I>()
            .map_err(|_| input_mismatch::<I>(metadata))?;
        let out = self.inner.process(manager, metadata, *input)?;
        Ok(Arc::new(out))
    }

    fn export_dyn(
        &self,
        manager: &ContentManager,
        metadata: &AssetMetadata,
        writer: &mut PreprocessedWriter<'_>,
        input: &(dyn Any + Send + Sync),
        delete: bool,
    ) -> Result<(), AssetError> {
        let input = input
            .downcast_ref::<I>()
            .ok_or_else(|| input_mismatch::<I>(metadata))?;
        self.inner
            .export_preprocessed(manager, metadata, writer, input, delete)
    }

    fn import_preprocessed_dyn(
        &self,
        manager: &ContentManager,
        metadata: &AssetMetadata,
        reader: &mut PreprocessedReader<'_>,
    ) -> Result<AnyAsset, AssetError> {
        let out = self.inner.import_preprocessed(manager, metadata, reader)?;
        Ok(Arc::new(out))
    }
}

/// Identity processor used when input and output types match and nothing is registered.
pub(crate) struct Passthrough {
    ty: AssetType,
}

impl Passthrough {
    #[inline]
    pub fn new(ty: AssetType) -> Self {
        Self { ty }
    }
}

impl AnyProcessor for Passthrough {
    #[inline]
    fn id(&self) -> &str {
        PASSTHROUGH_PROCESSOR_ID
    }

    #[inline]
    fn input_type(&self) -> AssetType {
        self.ty
    }

    #[inline]
    fn output_type(&self) -> AssetType {
        self.ty
    }

    #[inline]
    fn supports_preprocessing(&self) -> bool {
        false
    }

    #[inline]
    fn process_dyn(
        &self,
        _manager: &ContentManager,
        _metadata: &AssetMetadata,
        input: BoxedAsset,
    ) -> Result<AnyAsset, AssetError> {
        Ok(Arc::from(input))
    }

    fn export_dyn(
        &self,
        _manager: &ContentManager,
        _metadata: &AssetMetadata,
        _writer: &mut PreprocessedWriter<'_>,
        _input: &(dyn Any + Send + Sync),
        _delete: bool,
    ) -> Result<(), AssetError> {
        Err(AssetError::PreprocessingUnsupported {
            id: PASSTHROUGH_PROCESSOR_ID.to_owned(),
        })
    }

    fn import_preprocessed_dyn(
        &self,
        _manager: &ContentManager,
        _metadata: &AssetMetadata,
        _reader: &mut PreprocessedReader<'_>,
    ) -> Result<AnyAsset, AssetError> {
        Err(AssetError::PreprocessingUnsupported {
            id: PASSTHROUGH_PROCESSOR_ID.to_owned(),
        })
    }
}
