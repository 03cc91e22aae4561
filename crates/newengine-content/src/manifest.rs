use crate::error::{AssetError, ContentResult};
use crate::registry::ContentRegistry;
use crate::types::AssetType;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Named lists of assets, grouped by asset type.
///
/// ```json
/// { "name": "ui", "groups": [
///     { "name": "icons", "type": "texture", "directory": "textures/ui",
///       "assets": [ { "name": "close", "path": "close" } ] } ] }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ContentManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub groups: Vec<ContentManifestGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentManifestGroup {
    #[serde(default)]
    pub name: String,
    /// Name registered through [`ContentRegistry::register_asset_type`].
    #[serde(rename = "type")]
    pub asset_type: String,
    #[serde(default)]
    pub directory: String,
    #[serde(default)]
    pub assets: Vec<ContentManifestAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentManifestAsset {
    #[serde(default)]
    pub name: String,
    pub path: String,
}

impl ContentManifestGroup {
    /// Logical path of `asset` inside this group's directory.
    pub fn asset_path(&self, asset: &ContentManifestAsset) -> String {
        let dir = self.directory.trim_end_matches(['/', '\\']);
        if dir.is_empty() {
            asset.path.clone()
        } else {
            format!("{}/{}", dir, asset.path)
        }
    }

    pub fn resolve_type(&self, registry: &ContentRegistry) -> ContentResult<AssetType> {
        registry
            .asset_type(&self.asset_type)
            .ok_or_else(|| AssetError::UnknownAssetType(self.asset_type.clone()))
    }
}

impl ContentManifest {
    pub fn from_json_str(text: &str) -> ContentResult<Self> {
        Self::parse(text, Path::new(""))
    }

    pub fn load_file(path: &Path) -> ContentResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| AssetError::io(path, e))?;
        Self::parse(&text, path)
    }

    fn parse(text: &str, path: &Path) -> ContentResult<Self> {
        serde_json::from_str(text).map_err(|e| AssetError::InvalidManifest {
            path: PathBuf::from(path),
            reason: e.to_string(),
        })
    }

    /// Every `(logical path, asset type)` pair, in manifest order.
    ///
    /// Fails on the first group whose type name is not registered.
    pub fn resolve_assets(&self, registry: &ContentRegistry) -> ContentResult<Vec<(String, AssetType)>> {
        let mut out = Vec::new();
        for group in &self.groups {
            let ty = group.resolve_type(registry)?;
            out.extend(group.assets.iter().map(|a| (group.asset_path(a), ty)));
        }
        Ok(out)
    }

    #[inline]
    pub fn asset_count(&self) -> usize {
        self.groups.iter().map(|g| g.assets.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "name": "ui",
        "groups": [
            { "name": "labels", "type": "text", "directory": "strings/",
              "assets": [ { "name": "title", "path": "title" }, { "path": "nested/body" } ] },
            { "type": "text", "assets": [ { "path": "root_file" } ] }
        ]
    }"#;

    #[test]
    fn asset_paths_join_group_directory() {
        let mut reg = ContentRegistry::new();
        reg.register_asset_type::<String>("text");

        let m = ContentManifest::from_json_str(MANIFEST).unwrap();
        assert_eq!(m.asset_count(), 3);

        let assets = m.resolve_assets(&reg).unwrap();
        let paths: Vec<_> = assets.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["strings/title", "strings/nested/body", "root_file"]);
        assert!(assets.iter().all(|(_, t)| *t == AssetType::of::<String>()));
    }

    #[test]
    fn unknown_type_and_bad_json_fail() {
        let m = ContentManifest::from_json_str(MANIFEST).unwrap();
        assert!(matches!(
            m.resolve_assets(&ContentRegistry::new()),
            Err(AssetError::UnknownAssetType(name)) if name == "text"
        ));
        assert!(matches!(
            ContentManifest::from_json_str("[1, 2"),
            Err(AssetError::InvalidManifest { .. })
        ));
    }
}
