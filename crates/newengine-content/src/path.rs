use crate::error::{AssetError, ContentResult};
use std::path::{Component, Path, PathBuf};

/// Canonical logical form of an asset path.
///
/// Accepts both separators, drops `.` and empty segments, resolves `..` against the
/// segments seen so far. The result is always joined with `/`.
pub fn normalize_asset_path(asset: &str) -> ContentResult<String> {
    if is_rooted(asset) {
        return Err(AssetError::AssetPathNotRelative(asset.to_owned()));
    }

    let mut stack: Vec<&str> = Vec::new();
    for part in asset.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                if stack.pop().is_none() {
                    return Err(AssetError::AssetPathEscapesRoot(asset.to_owned()));
                }
            }
            other => stack.push(other),
        }
    }

    Ok(stack.join("/"))
}

#[inline]
fn is_rooted(asset: &str) -> bool {
    if asset.starts_with(['/', '\\']) {
        return true;
    }
    let p = Path::new(asset);
    p.has_root() || matches!(p.components().next(), Some(Component::Prefix(_)))
}

/// Extension of the last segment, without the dot. `None` for `"a.b/c"`.
#[inline]
pub fn asset_extension(asset: &str) -> Option<&str> {
    let name = file_name(asset);
    let dot = name.rfind('.')?;
    if dot == 0 || dot + 1 == name.len() {
        return None;
    }
    Some(&name[dot + 1..])
}

#[inline]
pub(crate) fn file_name(asset: &str) -> &str {
    asset.rsplit(['/', '\\']).next().unwrap_or(asset)
}

#[inline]
pub(crate) fn normalize_ext(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

#[inline]
pub(crate) fn extension_ascii_lower(p: &Path) -> Option<String> {
    let ext = p.extension()?.to_string_lossy();
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Joins a logical path onto a physical directory, segment by segment.
pub(crate) fn join_logical(dir: &Path, asset: &str) -> PathBuf {
    let mut out = dir.to_path_buf();
    for part in asset.split(['/', '\\']).filter(|p| !p.is_empty() && *p != ".") {
        out.push(part);
    }
    out
}

/// `path` relative to `root` as a `/`-joined logical path, if `path` lies under `root`.
pub(crate) fn logical_relative(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Some(parts.join("/"))
}

/// Lexical cleanup of an absolute path: drops `.`, folds `..`.
pub(crate) fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for c in path.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_dot_segments() {
        assert_eq!(normalize_asset_path("a/./b/../c").unwrap(), "a/c");
        assert_eq!(normalize_asset_path("a\\b//c").unwrap(), "a/b/c");
        assert_eq!(normalize_asset_path("a/..").unwrap(), "");
    }

    #[test]
    fn rejects_escape_and_rooted() {
        assert!(matches!(
            normalize_asset_path("../x"),
            Err(AssetError::AssetPathEscapesRoot(_))
        ));
        assert!(matches!(
            normalize_asset_path("a/../../x"),
            Err(AssetError::AssetPathEscapesRoot(_))
        ));
        assert!(matches!(
            normalize_asset_path("/etc/passwd"),
            Err(AssetError::AssetPathNotRelative(_))
        ));
    }

    #[test]
    fn extension_of_last_segment_only() {
        assert_eq!(asset_extension("textures/player.png"), Some("png"));
        assert_eq!(asset_extension("dir.v2/player"), None);
        assert_eq!(asset_extension("fonts/.hidden"), None);
        assert_eq!(file_name("a\\b/c.txt"), "c.txt");
    }

    #[test]
    fn relative_paths_use_forward_slashes() {
        let root = Path::new("/content");
        let file = root.join("ui").join("icons").join("x.png");
        assert_eq!(logical_relative(root, &file).as_deref(), Some("ui/icons/x.png"));
        assert_eq!(logical_relative(Path::new("/other"), &file), None);
        assert_eq!(clean_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
    }
}
