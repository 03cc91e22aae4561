use crate::density::ScreenDensityBucket;
use crate::error::{AssetError, ContentResult};
use crate::path::{
    asset_extension, extension_ascii_lower, file_name, join_logical, logical_relative, normalize_ext,
};
use crate::source::FileSystem;
use bitflags::bitflags;
use log::debug;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Extension of preprocessed asset files.
pub const PREPROCESSED_EXTENSION: &str = "uvc";

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AssetResolutionFlags: u8 {
        const INCLUDE_PREPROCESSED = 1 << 0;
        const PERFORM_SUBSTITUTION = 1 << 1;
        const LOAD_FROM_SOLUTION_DIRECTORY = 1 << 2;

        const DEFAULT = Self::INCLUDE_PREPROCESSED.bits() | Self::PERFORM_SUBSTITUTION.bits();
    }
}

/// Which search root satisfied a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOrigin {
    Root,
    Solution,
    Override(PathBuf),
}

impl AssetOrigin {
    #[inline]
    pub fn override_directory(&self) -> Option<&Path> {
        match self {
            Self::Override(dir) => Some(dir),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Absolute path of the matched file.
    pub file: PathBuf,
    /// Search root the file was found under.
    pub directory: PathBuf,
    pub origin: AssetOrigin,
}

/// Maps logical asset paths onto the root, solution and override directories.
pub struct PathResolver {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    solution: Option<PathBuf>,
    overrides: RwLock<Vec<PathBuf>>,
}

impl PathResolver {
    pub fn new(fs: Arc<dyn FileSystem>, root: &Path, solution: Option<&Path>) -> Self {
        let root = fs.full_path(root);
        let solution = solution
            .map(|s| fs.full_path(s))
            .filter(|s| fs.directory_exists(s));
        Self {
            fs,
            root,
            solution,
            overrides: RwLock::new(Vec::new()),
        }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn solution_directory(&self) -> Option<&Path> {
        self.solution.as_deref()
    }

    #[inline]
    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Appends an override directory (highest priority so far). Returns `None` if already present.
    pub fn add_override_directory(&self, dir: &Path) -> Option<PathBuf> {
        let full = self.fs.full_path(dir);
        let mut g = self.overrides.write();
        if g.contains(&full) {
            return None;
        }
        g.push(full.clone());
        Some(full)
    }

    pub fn remove_override_directory(&self, dir: &Path) -> bool {
        let full = self.fs.full_path(dir);
        let mut g = self.overrides.write();
        let before = g.len();
        g.retain(|d| *d != full);
        g.len() != before
    }

    #[inline]
    pub fn override_directories(&self) -> Vec<PathBuf> {
        self.overrides.read().clone()
    }

    /// Directories a changed file may live under: the solution (or root) plus overrides.
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        let mut out = vec![self.solution.clone().unwrap_or_else(|| self.root.clone())];
        out.extend(self.override_directories());
        out
    }

    /// Finds the single physical file for `asset`.
    ///
    /// Roots are searched in order (root, then overrides ascending) and later matches win.
    pub fn resolve(
        &self,
        asset: &str,
        extension: Option<&str>,
        density: ScreenDensityBucket,
        flags: AssetResolutionFlags,
    ) -> ContentResult<Option<ResolvedPath>> {
        let mut extension = extension
            .or_else(|| asset_extension(asset))
            .map(normalize_ext);

        let from_sln = flags.contains(AssetResolutionFlags::LOAD_FROM_SOLUTION_DIRECTORY);
        let (base_dir, base_origin) = match (&self.solution, from_sln) {
            (Some(sln), true) => (sln.clone(), AssetOrigin::Solution),
            _ => (self.root.clone(), AssetOrigin::Root),
        };

        let mut found = self
            .find_in_directory(&base_dir, asset, &mut extension, flags)?
            .map(|file| ResolvedPath {
                file,
                directory: base_dir.clone(),
                origin: base_origin,
            });

        for dir in self.override_directories() {
            if let Some(file) = self.find_in_directory(&dir, asset, &mut extension, flags)? {
                found = Some(ResolvedPath {
                    file,
                    directory: dir.clone(),
                    origin: AssetOrigin::Override(dir),
                });
            }
        }

        if flags.contains(AssetResolutionFlags::PERFORM_SUBSTITUTION) && asset_extension(asset).is_none() {
            if let Some(base) = found.take() {
                let sub = self
                    .list_possible_substitutions(
                        &base.directory,
                        &base.file,
                        ScreenDensityBucket::Desktop,
                        density,
                    )
                    .into_iter()
                    .next();

                found = match sub {
                    Some(sub) => {
                        debug!(
                            target: "content::resolve",
                            "resolve.substitute asset='{}' density={} with='{}'",
                            asset,
                            density,
                            sub
                        );
                        let flags = flags - AssetResolutionFlags::PERFORM_SUBSTITUTION;
                        self.find_in_directory(&base.directory, &sub, &mut extension, flags)?
                            .map(|file| ResolvedPath { file, ..base })
                    }
                    None => Some(base),
                };
            }
        }

        if from_sln && found.is_none() {
            return self.resolve(
                asset,
                extension.as_deref(),
                density,
                flags - AssetResolutionFlags::LOAD_FROM_SOLUTION_DIRECTORY,
            );
        }

        Ok(found)
    }

    /// Matches `asset` inside one search root. A match pins `extension` for the remaining roots.
    fn find_in_directory(
        &self,
        root: &Path,
        asset: &str,
        extension: &mut Option<String>,
        flags: AssetResolutionFlags,
    ) -> ContentResult<Option<PathBuf>> {
        let target = join_logical(root, asset);
        let Some(dir) = target.parent() else {
            return Ok(None);
        };
        if !self.fs.directory_exists(dir) {
            return Ok(None);
        }

        let name = file_name(asset);
        let stem = match asset_extension(asset) {
            Some(ext) => &name[..name.len() - ext.len() - 1],
            None => name,
        };
        let include_preprocessed = flags.contains(AssetResolutionFlags::INCLUDE_PREPROCESSED);

        let files = self.fs.list_files(dir).map_err(|e| AssetError::io(dir, e))?;
        let matches: Vec<PathBuf> = files
            .into_iter()
            .filter(|f| f.file_stem().is_some_and(|s| s.to_string_lossy() == stem))
            .filter(|f| {
                let ext = extension_ascii_lower(f);
                if !include_preprocessed && ext.as_deref() == Some(PREPROCESSED_EXTENSION) {
                    return false;
                }
                match extension.as_deref() {
                    Some(want) => ext.as_deref() == Some(want),
                    None => true,
                }
            })
            .collect();

        if matches.len() > 1 {
            return Err(AssetError::FileAmbiguous {
                asset: asset.to_owned(),
                candidates: matches.len(),
            });
        }

        let hit = matches.into_iter().next();
        if let Some(file) = &hit {
            *extension = extension_ascii_lower(file);
        }
        Ok(hit)
    }

    /// Existing `name-<bucket>.ext` variants of `file`, highest bucket first, relative to `directory`.
    pub fn list_possible_substitutions(
        &self,
        directory: &Path,
        file: &Path,
        min: ScreenDensityBucket,
        max: ScreenDensityBucket,
    ) -> Vec<String> {
        let Some(parent) = file.parent() else {
            return Vec::new();
        };
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = file
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        ScreenDensityBucket::descending(min, max)
            .map(|bucket| parent.join(format!("{}-{}{}", stem, bucket.name(), ext)))
            .filter(|candidate| self.fs.file_exists(candidate))
            .filter_map(|candidate| logical_relative(directory, &candidate))
            .collect()
    }

    /// Files (or subdirectories) of a logical directory across every search root.
    ///
    /// Keyed by path relative to its root; later roots overwrite earlier entries.
    pub fn list_directory(
        &self,
        path: &str,
        pattern: &glob::Pattern,
        directories: bool,
    ) -> ContentResult<BTreeMap<String, PathBuf>> {
        let mut roots = vec![self.root.clone()];
        roots.extend(self.override_directories());

        let mut out = BTreeMap::new();
        for root in roots {
            let dir = join_logical(&root, path);
            if !self.fs.directory_exists(&dir) {
                continue;
            }

            let entries = if directories {
                self.fs.list_directories(&dir)
            } else {
                self.fs.list_files(&dir)
            }
            .map_err(|e| AssetError::io(&dir, e))?;

            for entry in entries {
                let matched = entry
                    .file_name()
                    .is_some_and(|n| pattern.matches(&n.to_string_lossy()));
                if !matched {
                    continue;
                }
                if let Some(rel) = logical_relative(&root, &entry) {
                    out.insert(rel, entry);
                }
            }
        }
        Ok(out)
    }
}

/// Looks for a cargo project directory above the running executable that holds the same
/// relative content root. Only used by debug builds.
pub fn detect_solution_directory(root: &Path) -> Option<PathBuf> {
    if !cfg!(debug_assertions) || root.is_absolute() {
        return None;
    }
    let exe = std::env::current_exe().ok()?;
    exe.ancestors().skip(1).find_map(|dir| {
        let candidate = dir.join(root);
        (dir.join("Cargo.toml").is_file() && candidate.is_dir()).then_some(candidate)
    })
}
