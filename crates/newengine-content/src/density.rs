use parking_lot::RwLock;

/// Display-resolution class used to pick density-specific asset variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ScreenDensityBucket {
    Desktop = 0,
    Low,
    Medium,
    High,
    ExtraHigh,
    ExtraExtraHigh,
    ExtraExtraExtraHigh,
}

impl Default for ScreenDensityBucket {
    #[inline]
    fn default() -> Self {
        Self::Desktop
    }
}

impl ScreenDensityBucket {
    pub const COUNT: usize = 7;

    /// All buckets, ascending.
    pub const ALL: [ScreenDensityBucket; Self::COUNT] = [
        Self::Desktop,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::ExtraHigh,
        Self::ExtraExtraHigh,
        Self::ExtraExtraExtraHigh,
    ];

    /// Filename suffix used by `name-<bucket>.ext` variants.
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Low => "ldpi",
            Self::Medium => "mdpi",
            Self::High => "hdpi",
            Self::ExtraHigh => "xhdpi",
            Self::ExtraExtraHigh => "xxhdpi",
            Self::ExtraExtraExtraHigh => "xxxhdpi",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.name().eq_ignore_ascii_case(name))
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Buckets in `[min, max]`, highest first.
    pub fn descending(min: Self, max: Self) -> impl Iterator<Item = Self> {
        Self::ALL
            .into_iter()
            .rev()
            .filter(move |b| *b >= min && *b <= max)
    }
}

impl std::fmt::Display for ScreenDensityBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Display density service consumed by the content manager.
pub trait DensityProvider: Send + Sync + 'static {
    /// Density of the primary display, if one is connected.
    fn primary_density(&self) -> Option<ScreenDensityBucket>;

    /// Buckets of every connected display.
    fn densities_in_use(&self) -> Vec<ScreenDensityBucket> {
        vec![self.primary_density().unwrap_or_default()]
    }
}

/// Density list set by the host (or tests). The first entry is the primary display.
#[derive(Debug, Default)]
pub struct DisplayDensities {
    buckets: RwLock<Vec<ScreenDensityBucket>>,
}

impl DisplayDensities {
    #[inline]
    pub fn new(buckets: impl Into<Vec<ScreenDensityBucket>>) -> Self {
        Self {
            buckets: RwLock::new(buckets.into()),
        }
    }

    #[inline]
    pub fn single(bucket: ScreenDensityBucket) -> Self {
        Self::new(vec![bucket])
    }

    #[inline]
    pub fn set(&self, buckets: impl Into<Vec<ScreenDensityBucket>>) {
        *self.buckets.write() = buckets.into();
    }
}

impl DensityProvider for DisplayDensities {
    #[inline]
    fn primary_density(&self) -> Option<ScreenDensityBucket> {
        self.buckets.read().first().copied()
    }

    fn densities_in_use(&self) -> Vec<ScreenDensityBucket> {
        let g = self.buckets.read();
        if g.is_empty() {
            return vec![ScreenDensityBucket::Desktop];
        }
        g.clone()
    }
}
