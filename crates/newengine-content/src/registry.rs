use crate::error::{AssetError, ContentResult};
use crate::importers::{AnyImporter, Importer, ImporterBox};
use crate::path::normalize_ext;
use crate::processors::{AnyProcessor, Passthrough, Processor, ProcessorBox};
use crate::types::{Asset, AssetType};
use log::{info, warn};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

/// Importers by extension, processors by type pair and by stable id, named asset types.
///
/// Populated at startup, then shared (`Arc`) by every content manager that uses it.
#[derive(Default)]
pub struct ContentRegistry {
    importers_by_ext: HashMap<String, Vec<Arc<dyn AnyImporter>>>,
    processors: HashMap<(TypeId, TypeId), Arc<dyn AnyProcessor>>,
    processors_by_id: HashMap<Arc<str>, Arc<dyn AnyProcessor>>,
    asset_types: HashMap<String, AssetType>,
}

impl ContentRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_importer<T: Asset>(&mut self, importer: impl Importer<T>) {
        let importer: Arc<dyn AnyImporter> = Arc::new(ImporterBox::new(Box::new(importer)));
        let ty = importer.output_type();

        for ext in importer.supported_extensions() {
            let norm_ext = normalize_ext(ext);
            info!(
                target: "content",
                "importer.bind type='{}' ext='.{}'",
                ty.name(),
                norm_ext
            );
            self.importers_by_ext
                .entry(norm_ext)
                .or_default()
                .push(importer.clone());
        }
    }

    /// Registers a processor for `(I, O)`.
    ///
    /// `id` is written into preprocessed files and must stay stable across builds.
    pub fn register_processor<I: Asset, O: Asset>(
        &mut self,
        id: &str,
        processor: impl Processor<I, O>,
    ) {
        let id: Arc<str> = Arc::from(id);
        let p: Arc<dyn AnyProcessor> = Arc::new(ProcessorBox::new(id.clone(), Box::new(processor)));

        info!(
            target: "content",
            "processor.register id='{}' input='{}' output='{}' preprocess={}",
            id,
            p.input_type().name(),
            p.output_type().name(),
            p.supports_preprocessing()
        );

        if let Some(prev) = self
            .processors
            .insert((p.input_type().id(), p.output_type().id()), p.clone())
        {
            warn!(
                target: "content",
                "processor.replace input='{}' output='{}' old='{}' new='{}'",
                p.input_type().name(),
                p.output_type().name(),
                prev.id(),
                id
            );
        }
        if self.processors_by_id.insert(id.clone(), p).is_some() {
            warn!(target: "content", "processor.duplicate_id id='{}'", id);
        }
    }

    /// Makes `T` addressable by name from content manifests.
    pub fn register_asset_type<T: Asset>(&mut self, name: &str) {
        self.asset_types.insert(name.to_owned(), AssetType::of::<T>());
    }

    #[inline]
    pub fn asset_type(&self, name: &str) -> Option<AssetType> {
        self.asset_types.get(name).copied()
    }

    /// Importer for the extension; prefers one that produces `requested` directly.
    pub(crate) fn find_importer(
        &self,
        asset: &str,
        extension: Option<&str>,
        requested: AssetType,
    ) -> ContentResult<Arc<dyn AnyImporter>> {
        let Some(ext) = extension.map(normalize_ext).filter(|e| !e.is_empty()) else {
            return Err(AssetError::ImporterNeedsExtension {
                asset: asset.to_owned(),
            });
        };

        let list = self
            .importers_by_ext
            .get(&ext)
            .filter(|l| !l.is_empty())
            .ok_or_else(|| AssetError::NoValidImporter {
                asset: asset.to_owned(),
            })?;

        let pick = list
            .iter()
            .find(|i| i.output_type() == requested)
            .unwrap_or(&list[0]);
        Ok(pick.clone())
    }

    /// Processor for the exact pair, or the identity processor when the types match.
    pub(crate) fn find_processor(
        &self,
        asset: &str,
        input: AssetType,
        output: AssetType,
    ) -> ContentResult<Arc<dyn AnyProcessor>> {
        if let Some(p) = self.processors.get(&(input.id(), output.id())) {
            return Ok(p.clone());
        }
        if input == output {
            return Ok(Arc::new(Passthrough::new(output)));
        }
        Err(AssetError::NoValidProcessor {
            asset: asset.to_owned(),
            input: input.name(),
            output: output.name(),
        })
    }

    #[inline]
    pub(crate) fn processor_by_id(&self, id: &str) -> Option<Arc<dyn AnyProcessor>> {
        self.processors_by_id.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ContentManager;
    use crate::metadata::AssetMetadata;
    use std::io::Read;

    #[derive(Debug, PartialEq)]
    struct Text(String);

    #[derive(Debug, PartialEq)]
    struct Upper(String);

    struct TextImporter;

    impl Importer<Text> for TextImporter {
        fn supported_extensions(&self) -> &'static [&'static str] {
            &[".TXT", "md"]
        }

        fn import(&self, _m: &AssetMetadata, r: &mut dyn Read) -> Result<Text, AssetError> {
            let mut s = String::new();
            r.read_to_string(&mut s)
                .map_err(|e| AssetError::other(e.to_string()))?;
            Ok(Text(s))
        }
    }

    struct UpperProcessor;

    impl Processor<Text, Upper> for UpperProcessor {
        fn process(
            &self,
            _manager: &ContentManager,
            _metadata: &AssetMetadata,
            input: Text,
        ) -> Result<Upper, AssetError> {
            Ok(Upper(input.0.to_uppercase()))
        }
    }

    #[test]
    fn importer_lookup_normalizes_extensions() {
        let mut reg = ContentRegistry::new();
        reg.register_importer(TextImporter);

        assert!(reg.find_importer("a.txt", Some("txt"), AssetType::of::<Text>()).is_ok());
        assert!(reg.find_importer("a.md", Some(".MD"), AssetType::of::<Upper>()).is_ok());
        assert!(matches!(
            reg.find_importer("a.png", Some("png"), AssetType::of::<Text>()),
            Err(AssetError::NoValidImporter { .. })
        ));
        assert!(matches!(
            reg.find_importer("a", None, AssetType::of::<Text>()),
            Err(AssetError::ImporterNeedsExtension { .. })
        ));
    }

    #[test]
    fn processor_lookup_falls_back_to_passthrough() {
        let mut reg = ContentRegistry::new();
        reg.register_processor("test.upper", UpperProcessor);

        let p = reg
            .find_processor("a", AssetType::of::<Text>(), AssetType::of::<Upper>())
            .unwrap();
        assert_eq!(p.id(), "test.upper");
        assert!(reg.processor_by_id("test.upper").is_some());

        let p = reg
            .find_processor("a", AssetType::of::<Text>(), AssetType::of::<Text>())
            .unwrap();
        assert_eq!(p.id(), crate::processors::PASSTHROUGH_PROCESSOR_ID);

        assert!(matches!(
            reg.find_processor("a", AssetType::of::<Upper>(), AssetType::of::<Text>()),
            Err(AssetError::NoValidProcessor { .. })
        ));
    }
}
