use newengine_content::{
    AssetError, AssetMetadata, ContentManager, ContentRegistry, Importer, PreprocessedReader,
    PreprocessedWriter, Processor,
};
use std::io::Read;

pub const TEXT_PROCESSOR: &str = "content-tool.text";

/// Raw UTF-8 file contents.
#[derive(Debug, Clone)]
pub struct SourceText(pub String);

/// Text split into lines, the form the tool preprocesses and watches.
#[derive(Debug, Clone, PartialEq)]
pub struct TextDocument {
    pub lines: Vec<String>,
}

impl TextDocument {
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.lines.iter().map(|l| l.len() + 1).sum()
    }
}

pub struct SourceTextImporter;

impl Importer<SourceText> for SourceTextImporter {
    fn supported_extensions(&self) -> &'static [&'static str] {
        &["txt", "md", "json", "xml", "csv", "cfg", "ini", "toml"]
    }

    fn import(&self, metadata: &AssetMetadata, reader: &mut dyn Read) -> Result<SourceText, AssetError> {
        let mut s = String::new();
        reader.read_to_string(&mut s).map_err(|e| {
            AssetError::other(format!(
                "{}: {}",
                metadata.asset_file_path().display(),
                e
            ))
        })?;
        Ok(SourceText(s))
    }
}

pub struct TextDocumentProcessor;

impl Processor<SourceText, TextDocument> for TextDocumentProcessor {
    fn process(
        &self,
        _manager: &ContentManager,
        _metadata: &AssetMetadata,
        input: SourceText,
    ) -> Result<TextDocument, AssetError> {
        Ok(TextDocument {
            lines: input.0.lines().map(str::to_owned).collect(),
        })
    }

    fn supports_preprocessing(&self) -> bool {
        true
    }

    fn export_preprocessed(
        &self,
        _manager: &ContentManager,
        _metadata: &AssetMetadata,
        writer: &mut PreprocessedWriter<'_>,
        input: &SourceText,
        _delete: bool,
    ) -> Result<(), AssetError> {
        let lines: Vec<&str> = input.0.lines().collect();
        writer.write_len(lines.len())?;
        for line in lines {
            writer.write_string(line)?;
        }
        Ok(())
    }

    fn import_preprocessed(
        &self,
        _manager: &ContentManager,
        _metadata: &AssetMetadata,
        reader: &mut PreprocessedReader<'_>,
    ) -> Result<TextDocument, AssetError> {
        let count = reader.read_len()?;
        let lines = (0..count)
            .map(|_| reader.read_string())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TextDocument { lines })
    }
}

pub fn registry() -> ContentRegistry {
    let mut reg = ContentRegistry::new();
    reg.register_importer(SourceTextImporter);
    reg.register_processor(TEXT_PROCESSOR, TextDocumentProcessor);
    reg.register_asset_type::<SourceText>("source");
    reg.register_asset_type::<TextDocument>("text");
    reg
}
