use crate::density::ScreenDensityBucket;
use crate::error::{AssetError, ContentResult};
use crate::path::{asset_extension, extension_ascii_lower, logical_relative, normalize_asset_path};
use crate::resolver::{AssetOrigin, AssetResolutionFlags, PathResolver, ResolvedPath, PREPROCESSED_EXTENSION};
use log::debug;
use parking_lot::Mutex;
use quick_xml::events::Event;
use std::io::Read;
use std::path::{Path, PathBuf};

pub const METADATA_EXTENSION_XML: &str = "uvmeta";
pub const METADATA_EXTENSION_JSON: &str = "jsmeta";

/// File name reported for assets loaded from a stream.
pub const STREAM_FILE_NAME: &str = "__STREAM";

/// Opaque importer/processor configuration carried by a metadata wrapper.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataBlock {
    /// Raw inner XML of the element.
    Xml(String),
    Json(serde_json::Value),
}

impl MetadataBlock {
    #[inline]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            Self::Xml(_) => None,
        }
    }
}

/// Descriptor of one resolution of an asset. Immutable apart from the dependency recorder.
#[derive(Debug)]
pub struct AssetMetadata {
    override_directory: Option<PathBuf>,
    asset_path: String,
    asset_file_path: PathBuf,
    importer_metadata: Option<MetadataBlock>,
    processor_metadata: Option<MetadataBlock>,
    is_file: bool,
    is_stream: bool,
    is_json: bool,
    from_solution: bool,
    density: ScreenDensityBucket,
    dependencies: Mutex<Vec<String>>,
}

impl AssetMetadata {
    fn from_file(
        asset_path: &str,
        file: PathBuf,
        origin: &AssetOrigin,
        from_solution: bool,
        density: ScreenDensityBucket,
    ) -> Self {
        Self {
            override_directory: origin.override_directory().map(Path::to_path_buf),
            asset_path: asset_path.to_owned(),
            asset_file_path: file,
            importer_metadata: None,
            processor_metadata: None,
            is_file: true,
            is_stream: false,
            is_json: false,
            from_solution,
            density,
            dependencies: Mutex::new(Vec::new()),
        }
    }

    /// Metadata for data read from a stream; the file name is `__STREAM.<ext>`.
    pub fn for_stream(extension: &str, density: ScreenDensityBucket) -> Self {
        let name = format!("{}.{}", STREAM_FILE_NAME, crate::path::normalize_ext(extension));
        Self {
            override_directory: None,
            asset_path: name.clone(),
            asset_file_path: PathBuf::from(name),
            importer_metadata: None,
            processor_metadata: None,
            is_file: false,
            is_stream: true,
            is_json: false,
            from_solution: false,
            density,
            dependencies: Mutex::new(Vec::new()),
        }
    }

    /// Metadata for objects handed directly to a processor.
    pub fn in_memory(density: ScreenDensityBucket) -> Self {
        Self {
            override_directory: None,
            asset_path: String::new(),
            asset_file_path: PathBuf::new(),
            importer_metadata: None,
            processor_metadata: None,
            is_file: false,
            is_stream: false,
            is_json: false,
            from_solution: false,
            density,
            dependencies: Mutex::new(Vec::new()),
        }
    }

    #[inline]
    pub fn override_directory(&self) -> Option<&Path> {
        self.override_directory.as_deref()
    }

    /// Logical asset path as requested by the caller.
    #[inline]
    pub fn asset_path(&self) -> &str {
        &self.asset_path
    }

    /// Physical file the asset data is read from.
    #[inline]
    pub fn asset_file_path(&self) -> &Path {
        &self.asset_file_path
    }

    #[inline]
    pub fn extension(&self) -> Option<String> {
        extension_ascii_lower(&self.asset_file_path)
    }

    #[inline]
    pub fn importer_metadata(&self) -> Option<&MetadataBlock> {
        self.importer_metadata.as_ref()
    }

    #[inline]
    pub fn processor_metadata(&self) -> Option<&MetadataBlock> {
        self.processor_metadata.as_ref()
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        self.is_file
    }

    #[inline]
    pub fn is_stream(&self) -> bool {
        self.is_stream
    }

    #[inline]
    pub fn is_json(&self) -> bool {
        self.is_json
    }

    #[inline]
    pub fn is_preprocessed(&self) -> bool {
        self.extension().as_deref() == Some(PREPROCESSED_EXTENSION)
    }

    #[inline]
    pub fn from_solution(&self) -> bool {
        self.from_solution
    }

    #[inline]
    pub fn density(&self) -> ScreenDensityBucket {
        self.density
    }

    /// Records that the asset being loaded depends on another asset.
    ///
    /// Edges are added to the manager's dependency graph once the load commits.
    pub fn add_asset_dependency(&self, asset: impl Into<String>) {
        let asset = asset.into();
        let mut g = self.dependencies.lock();
        if !g.contains(&asset) {
            g.push(asset);
        }
    }

    #[inline]
    pub fn asset_dependencies(&self) -> Vec<String> {
        self.dependencies.lock().clone()
    }
}

#[inline]
fn flags_for(base: AssetResolutionFlags, from_solution: bool) -> AssetResolutionFlags {
    if from_solution {
        base | AssetResolutionFlags::LOAD_FROM_SOLUTION_DIRECTORY
    } else {
        base
    }
}

/// Builds the metadata for `asset`, trying explicit file, preprocessed, wrappers, then raw.
pub(crate) fn load_asset_metadata(
    resolver: &PathResolver,
    asset: &str,
    density: ScreenDensityBucket,
    include_preprocessed: bool,
    from_solution: bool,
) -> ContentResult<AssetMetadata> {
    if let Some(ext) = asset_extension(asset) {
        let flags = flags_for(AssetResolutionFlags::DEFAULT, from_solution);
        if let Some(found) = resolver.resolve(asset, Some(ext), density, flags)? {
            let preprocessed = ext.eq_ignore_ascii_case(PREPROCESSED_EXTENSION);
            if include_preprocessed || !preprocessed {
                return metadata_from_file(resolver, asset, found, from_solution, density);
            }
        }
        return Err(AssetError::not_found(asset));
    }

    if include_preprocessed {
        let flags = flags_for(AssetResolutionFlags::DEFAULT, from_solution);
        if let Some(found) = resolver.resolve(asset, Some(PREPROCESSED_EXTENSION), density, flags)? {
            return metadata_from_file(resolver, asset, found, from_solution, density);
        }
    }

    let flags = flags_for(AssetResolutionFlags::PERFORM_SUBSTITUTION, from_solution);
    for ext in [METADATA_EXTENSION_XML, METADATA_EXTENSION_JSON] {
        if let Some(found) = resolver.resolve(asset, Some(ext), density, flags)? {
            return metadata_from_file(resolver, asset, found, from_solution, density);
        }
    }

    if let Some(found) = resolver.resolve(asset, None, density, flags)? {
        return metadata_from_file(resolver, asset, found, from_solution, density);
    }

    Err(AssetError::not_found(asset))
}

fn metadata_from_file(
    resolver: &PathResolver,
    asset: &str,
    found: ResolvedPath,
    from_solution: bool,
    density: ScreenDensityBucket,
) -> ContentResult<AssetMetadata> {
    let is_json = match extension_ascii_lower(&found.file).as_deref() {
        Some(METADATA_EXTENSION_XML) => false,
        Some(METADATA_EXTENSION_JSON) => true,
        _ => {
            debug!(
                target: "content::resolve",
                "metadata.raw asset='{}' file='{}'",
                asset,
                found.file.display()
            );
            return Ok(AssetMetadata::from_file(
                asset,
                found.file,
                &found.origin,
                from_solution,
                density,
            ));
        }
    };

    let mut text = String::new();
    resolver
        .file_system()
        .open_read(&found.file)
        .and_then(|mut r| r.read_to_string(&mut text))
        .map_err(|e| AssetError::io(&found.file, e))?;

    let wrapper = if is_json {
        parse_json_wrapper(&text)
    } else {
        parse_xml_wrapper(&text)
    }
    .map_err(|reason| AssetError::InvalidMetadata {
        path: found.file.clone(),
        reason,
    })?;

    let wrapped = wrapper.asset.trim();
    if wrapped.is_empty() || asset_extension(wrapped).is_none() {
        return Err(AssetError::InvalidMetadata {
            path: found.file.clone(),
            reason: format!("invalid wrapped asset filename '{}'", wrapped),
        });
    }

    let parent = found.file.parent().unwrap_or(found.directory.as_path());
    let relative = logical_relative(&found.directory, parent)
        .map(|dir| if dir.is_empty() { wrapped.to_owned() } else { format!("{}/{}", dir, wrapped) })
        .ok_or_else(|| AssetError::MetadataFileNotFound {
            metadata: found.file.clone(),
            asset: wrapped.to_owned(),
        })?;
    let relative = normalize_asset_path(&relative)?;

    let flags = flags_for(AssetResolutionFlags::DEFAULT, from_solution);
    let target = resolver
        .resolve(&relative, asset_extension(&relative), density, flags)?
        .filter(|t| resolver.file_system().file_exists(&t.file))
        .ok_or_else(|| AssetError::MetadataFileNotFound {
            metadata: found.file.clone(),
            asset: relative.clone(),
        })?;

    debug!(
        target: "content::resolve",
        "metadata.wrapper asset='{}' wrapper='{}' file='{}' json={}",
        asset,
        found.file.display(),
        target.file.display(),
        is_json
    );

    let mut md = AssetMetadata::from_file(asset, target.file, &target.origin, from_solution, density);
    md.importer_metadata = wrapper.importer;
    md.processor_metadata = wrapper.processor;
    md.is_json = is_json;
    Ok(md)
}

#[derive(Debug, Default)]
struct WrapperFile {
    asset: String,
    importer: Option<MetadataBlock>,
    processor: Option<MetadataBlock>,
}

fn parse_json_wrapper(text: &str) -> Result<WrapperFile, String> {
    let v: serde_json::Value = serde_json::from_str(text).map_err(|e| format!("json: {e}"))?;
    if !v.is_object() {
        return Err("json: root is not an object".to_owned());
    }

    let asset = v
        .get("asset")
        .and_then(|x| x.as_str())
        .unwrap_or_default()
        .to_owned();
    let block = |key: &str| {
        v.get(key)
            .filter(|x| !x.is_null())
            .cloned()
            .map(MetadataBlock::Json)
    };

    Ok(WrapperFile {
        asset,
        importer: block("importerMetadata"),
        processor: block("processorMetadata"),
    })
}

fn parse_xml_wrapper(text: &str) -> Result<WrapperFile, String> {
    let mut r = quick_xml::Reader::from_str(text);
    let mut out = WrapperFile::default();
    let mut depth = 0usize;

    loop {
        match r.read_event() {
            Ok(Event::Start(e)) if depth == 1 => {
                let end = e.to_end().into_owned();
                let inner = r
                    .read_text(end.name())
                    .map_err(|err| format!("xml: {err}"))?
                    .into_owned();
                match e.local_name().as_ref() {
                    b"Asset" => {
                        out.asset = quick_xml::escape::unescape(inner.trim())
                            .map_err(|err| format!("xml: {err}"))?
                            .into_owned();
                    }
                    b"ImporterMetadata" => out.importer = Some(MetadataBlock::Xml(inner)),
                    b"ProcessorMetadata" => out.processor = Some(MetadataBlock::Xml(inner)),
                    _ => {}
                }
            }
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::Empty(e)) if depth == 1 => match e.local_name().as_ref() {
                b"ImporterMetadata" => out.importer = Some(MetadataBlock::Xml(String::new())),
                b"ProcessorMetadata" => out.processor = Some(MetadataBlock::Xml(String::new())),
                _ => {}
            },
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("xml: {e}")),
            _ => {}
        }
    }

    Ok(out)
}
