use crate::density::ScreenDensityBucket;
use crate::resolver::AssetOrigin;
use crate::types::{AnyAsset, AssetType};

#[derive(Clone)]
pub(crate) struct AssetVersion {
    pub instance: AnyAsset,
    pub origin: AssetOrigin,
}

/// Cached versions of one logical asset, one slot per density bucket.
pub(crate) struct AssetCacheEntry {
    asset_type: AssetType,
    versions: [Option<AssetVersion>; ScreenDensityBucket::COUNT],
}

impl AssetCacheEntry {
    #[inline]
    pub fn new(asset_type: AssetType) -> Self {
        Self {
            asset_type,
            versions: Default::default(),
        }
    }

    #[inline]
    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    #[inline]
    pub fn get(&self, density: ScreenDensityBucket) -> Option<&AssetVersion> {
        self.versions[density.index()].as_ref()
    }

    /// Stores `instance` unless a version is already committed; returns the committed one.
    pub fn get_or_insert(
        &mut self,
        density: ScreenDensityBucket,
        instance: AnyAsset,
        origin: AssetOrigin,
    ) -> AnyAsset {
        let slot = &mut self.versions[density.index()];
        match slot {
            Some(v) => v.instance.clone(),
            None => {
                *slot = Some(AssetVersion {
                    instance: instance.clone(),
                    origin,
                });
                instance
            }
        }
    }

    /// Replaces the version for `density`, returning the previous one.
    pub fn replace(
        &mut self,
        density: ScreenDensityBucket,
        instance: AnyAsset,
        origin: AssetOrigin,
    ) -> Option<AssetVersion> {
        self.versions[density.index()].replace(AssetVersion { instance, origin })
    }

    /// Snapshot of every committed `(density, version)`.
    pub fn versions(&self) -> Vec<(ScreenDensityBucket, AssetVersion)> {
        ScreenDensityBucket::ALL
            .into_iter()
            .filter_map(|b| self.get(b).map(|v| (b, v.clone())))
            .collect()
    }

    /// Drops versions whose bucket is not in `in_use`. Returns true if the entry is now empty.
    pub fn purge_unused_versions(&mut self, in_use: &[ScreenDensityBucket]) -> bool {
        for b in ScreenDensityBucket::ALL {
            if !in_use.contains(&b) {
                self.versions[b.index()] = None;
            }
        }
        self.is_empty()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.versions.iter().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn inst(v: u32) -> AnyAsset {
        Arc::new(v)
    }

    #[test]
    fn first_committed_version_wins() {
        let mut e = AssetCacheEntry::new(AssetType::of::<u32>());
        let a = inst(1);
        let got = e.get_or_insert(ScreenDensityBucket::High, a.clone(), AssetOrigin::Root);
        assert!(Arc::ptr_eq(&got, &a));

        let got = e.get_or_insert(ScreenDensityBucket::High, inst(2), AssetOrigin::Root);
        assert!(Arc::ptr_eq(&got, &a));
        assert!(Arc::ptr_eq(&e.get(ScreenDensityBucket::High).unwrap().instance, &a));
        assert!(e.get(ScreenDensityBucket::Desktop).is_none());
    }

    #[test]
    fn purge_unused_reports_empty() {
        let mut e = AssetCacheEntry::new(AssetType::of::<u32>());
        e.replace(ScreenDensityBucket::Desktop, inst(1), AssetOrigin::Root);
        e.replace(ScreenDensityBucket::High, inst(2), AssetOrigin::Root);

        assert!(!e.purge_unused_versions(&[ScreenDensityBucket::High]));
        assert_eq!(e.versions().len(), 1);
        assert!(e.purge_unused_versions(&[ScreenDensityBucket::Low]));
    }
}
