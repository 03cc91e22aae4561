#![allow(dead_code)]

use anyhow::Result;
use newengine_content::{
    AssetError, AssetMetadata, ContentManager, ContentManagerConfig, ContentRegistry,
    DisplayDensities, Importer, PreprocessedReader, PreprocessedWriter, Processor,
    ScreenDensityBucket,
};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

pub const LABEL_PROCESSOR: &str = "test.label";
pub const DOCUMENT_PROCESSOR: &str = "test.document";

/// Raw text as read from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Text(pub String);

/// Trimmed, preprocessable text.
#[derive(Debug, Clone, PartialEq)]
pub struct Label(pub String);

/// Text whose `@include other/asset` lines are replaced by the included text.
#[derive(Debug, Clone, PartialEq)]
pub struct Document(pub String);

pub struct TextImporter;

impl Importer<Text> for TextImporter {
    fn supported_extensions(&self) -> &'static [&'static str] {
        &[".txt"]
    }

    fn import(&self, _metadata: &AssetMetadata, reader: &mut dyn Read) -> Result<Text, AssetError> {
        let mut s = String::new();
        reader
            .read_to_string(&mut s)
            .map_err(|e| AssetError::other(e.to_string()))?;
        if s.contains("#broken") {
            return Err(AssetError::other("text marked broken"));
        }
        Ok(Text(s))
    }
}

pub struct LabelProcessor;

impl Processor<Text, Label> for LabelProcessor {
    fn process(&self, _m: &ContentManager, _md: &AssetMetadata, input: Text) -> Result<Label, AssetError> {
        Ok(Label(input.0.trim().to_owned()))
    }

    fn supports_preprocessing(&self) -> bool {
        true
    }

    fn export_preprocessed(
        &self,
        _m: &ContentManager,
        _md: &AssetMetadata,
        writer: &mut PreprocessedWriter<'_>,
        input: &Text,
        _delete: bool,
    ) -> Result<(), AssetError> {
        writer.write_string(input.0.trim())?;
        writer.write_u32(input.0.len() as u32)
    }

    fn import_preprocessed(
        &self,
        _m: &ContentManager,
        _md: &AssetMetadata,
        reader: &mut PreprocessedReader<'_>,
    ) -> Result<Label, AssetError> {
        let text = reader.read_string()?;
        let _raw_len = reader.read_u32()?;
        Ok(Label(text))
    }
}

/// Counts how many documents it has produced.
pub struct DocumentProcessor {
    pub runs: Arc<AtomicUsize>,
}

impl Processor<Text, Document> for DocumentProcessor {
    fn process(&self, manager: &ContentManager, md: &AssetMetadata, input: Text) -> Result<Document, AssetError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let mut out = Vec::new();
        for line in input.0.lines() {
            match line.strip_prefix("@include ") {
                Some(dep) => {
                    let dep = dep.trim();
                    md.add_asset_dependency(dep);
                    let included = manager.import::<Text>(dep, Some(md.density()), true)?;
                    out.push(included.0.trim().to_owned());
                }
                None => out.push(line.to_owned()),
            }
        }
        Ok(Document(out.join("\n")))
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub manager: Arc<ContentManager>,
    pub densities: Arc<DisplayDensities>,
    pub document_runs: Arc<AtomicUsize>,
}

pub fn registry(document_runs: Arc<AtomicUsize>) -> ContentRegistry {
    let mut reg = ContentRegistry::new();
    reg.register_importer(TextImporter);
    reg.register_processor(LABEL_PROCESSOR, LabelProcessor);
    reg.register_processor(DOCUMENT_PROCESSOR, DocumentProcessor { runs: document_runs });
    reg.register_asset_type::<Text>("text");
    reg.register_asset_type::<Label>("label");
    reg.register_asset_type::<Document>("document");
    reg
}

impl Fixture {
    pub fn new() -> Result<Self> {
        Self::with_config(|c| c)
    }

    pub fn with_config(adjust: impl FnOnce(ContentManagerConfig) -> ContentManagerConfig) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().join("content");
        fs::create_dir_all(&root)?;

        let config = adjust(
            ContentManagerConfig::new(&root)
                .with_watch_content(true)
                .with_file_system_events(false),
        );

        let document_runs = Arc::new(AtomicUsize::new(0));
        let densities = Arc::new(DisplayDensities::single(ScreenDensityBucket::Desktop));
        let manager = ContentManager::builder(config)
            .with_registry(Arc::new(registry(document_runs.clone())))
            .with_density_provider(densities.clone())
            .build();

        Ok(Self {
            dir,
            manager,
            densities,
            document_runs,
        })
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("content")
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    /// Writes a file below the content root, creating parent directories.
    pub fn write(&self, rel: &str, contents: &str) -> Result<PathBuf> {
        write_file(&self.root(), rel, contents)
    }

    /// Rewrites a content file and reports the change the way the file watcher would.
    pub fn touch(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.write(rel, contents)?;
        self.manager.on_file_changed(&path);
        Ok(())
    }

    pub fn drain(&self) -> usize {
        self.manager.work_queue().drain()
    }
}

pub fn write_file(dir: &Path, rel: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, contents)?;
    Ok(path)
}
