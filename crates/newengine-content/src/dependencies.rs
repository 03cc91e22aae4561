use crate::density::ScreenDensityBucket;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

static GLOBAL_SUPPRESS_DEPENDENCY_TRACKING: AtomicBool = AtomicBool::new(false);

/// Process-wide switch that turns dependency tracking off for every content manager.
///
/// Set it before the first load; edges recorded earlier are kept.
#[inline]
pub fn set_globally_suppress_dependency_tracking(suppress: bool) {
    GLOBAL_SUPPRESS_DEPENDENCY_TRACKING.store(suppress, Ordering::Relaxed);
}

#[inline]
pub fn globally_suppress_dependency_tracking() -> bool {
    GLOBAL_SUPPRESS_DEPENDENCY_TRACKING.load(Ordering::Relaxed)
}

/// Dependents of one dependency file.
///
/// Each dependent is scoped to the density bucket it was loaded at.
#[derive(Debug, Clone)]
pub(crate) struct AssetDependencyCollection {
    asset_path: String,
    dependents: Vec<(String, ScreenDensityBucket)>,
}

impl AssetDependencyCollection {
    #[inline]
    pub fn asset_path(&self) -> &str {
        &self.asset_path
    }

    #[inline]
    pub fn dependents(&self) -> &[(String, ScreenDensityBucket)] {
        &self.dependents
    }
}

/// Directed edges `dependency file -> dependent assets`.
#[derive(Debug, Default)]
pub(crate) struct DependencyGraph {
    by_file: HashMap<PathBuf, AssetDependencyCollection>,
}

impl DependencyGraph {
    /// Returns false if the edge already existed.
    pub fn add(
        &mut self,
        file: PathBuf,
        dependency: &str,
        density: ScreenDensityBucket,
        dependent: &str,
    ) -> bool {
        let c = self
            .by_file
            .entry(file)
            .or_insert_with(|| AssetDependencyCollection {
                asset_path: dependency.to_owned(),
                dependents: Vec::new(),
            });
        if c.dependents.iter().any(|(d, b)| d == dependent && *b == density) {
            return false;
        }
        c.dependents.push((dependent.to_owned(), density));
        true
    }

    /// Removes `dependent` from `file` at every density.
    pub fn remove(&mut self, file: &Path, dependent: &str) -> bool {
        let Some(c) = self.by_file.get_mut(file) else {
            return false;
        };
        let before = c.dependents.len();
        c.dependents.retain(|(d, _)| d != dependent);
        let removed = c.dependents.len() != before;
        if c.dependents.is_empty() {
            self.by_file.remove(file);
        }
        removed
    }

    #[inline]
    pub fn contains(&self, file: &Path, dependent: &str) -> bool {
        self.by_file
            .get(file)
            .is_some_and(|c| c.dependents.iter().any(|(d, _)| d == dependent))
    }

    #[inline]
    pub fn get(&self, file: &Path) -> Option<&AssetDependencyCollection> {
        self.by_file.get(file)
    }

    /// Removes every edge whose dependent is `asset`.
    pub fn clear_dependent(&mut self, asset: &str) {
        self.retain(|d, _| d != asset);
    }

    /// Removes the edges `asset` recorded while loaded at `density`.
    pub fn clear_dependent_at(&mut self, asset: &str, density: ScreenDensityBucket) {
        self.retain(|d, b| d != asset || b != density);
    }

    fn retain(&mut self, mut keep: impl FnMut(&str, ScreenDensityBucket) -> bool) {
        self.by_file.retain(|_, c| {
            c.dependents.retain(|(d, b)| keep(d, *b));
            !c.dependents.is_empty()
        });
    }

    #[inline]
    pub fn clear(&mut self) {
        self.by_file.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_deduplicated_and_cleared() {
        let mut g = DependencyGraph::default();
        let f = PathBuf::from("/c/shared.png");

        assert!(g.add(f.clone(), "shared", ScreenDensityBucket::Desktop, "a"));
        assert!(!g.add(f.clone(), "shared", ScreenDensityBucket::Desktop, "a"));
        assert!(g.add(f.clone(), "shared", ScreenDensityBucket::Desktop, "b"));
        assert_eq!(g.get(&f).map(|c| c.dependents().len()), Some(2));

        g.clear_dependent("a");
        assert!(!g.contains(&f, "a"));
        assert!(g.contains(&f, "b"));

        assert!(g.remove(&f, "b"));
        assert!(g.get(&f).is_none());
    }

    #[test]
    fn clearing_one_density_keeps_the_others() {
        let mut g = DependencyGraph::default();
        let low = PathBuf::from("/c/icon.png");
        let high = PathBuf::from("/c/icon-hdpi.png");

        g.add(low.clone(), "icon", ScreenDensityBucket::Desktop, "menu");
        g.add(high.clone(), "icon", ScreenDensityBucket::High, "menu");
        assert!(g.add(low.clone(), "icon", ScreenDensityBucket::Low, "menu"));

        g.clear_dependent_at("menu", ScreenDensityBucket::Desktop);
        assert!(g.contains(&low, "menu"));
        assert!(g.contains(&high, "menu"));
        assert_eq!(
            g.get(&low).map(|c| c.dependents().to_vec()),
            Some(vec![("menu".to_owned(), ScreenDensityBucket::Low)])
        );

        g.clear_dependent_at("menu", ScreenDensityBucket::Low);
        assert!(g.get(&low).is_none());
        assert!(g.contains(&high, "menu"));
    }
}
