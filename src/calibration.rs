//! Distance ranges and the display configuration derived from them

use serde::{Deserialize, Serialize};

/// Pixels between minor graticule and scale ticks
pub const SIZE: f32 = 20.0;

/// Display units per metre on the distance scale
pub const SCALE: f32 = 20.0;

/// Range selected on first run
pub const DEFAULT_RANGE: usize = 3;

const VALUES: [f32; 7] = [0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0];

const COUNTS: [usize; 7] = [256, 512, 1024, 2048, 4096, 8192, 16384];

const LABELS: [&str; 7] = ["10m", "20m", "50m", "100m", "200m", "500m", "1000m"];

/// Index into the calibration tables, always in bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "usize", into = "usize")]
pub struct RangeSetting(usize);

impl RangeSetting {
    pub const COUNT: usize = VALUES.len();

    /// `None` for an index outside the table
    pub fn new(index: usize) -> Option<Self> {
        (index < Self::COUNT).then_some(Self(index))
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT).map(Self)
    }

    pub fn index(&self) -> usize {
        self.0
    }

    /// Scale factor, display units per pixel
    pub fn value(&self) -> f32 {
        VALUES[self.0]
    }

    /// Samples spread across the scope
    pub fn count(&self) -> usize {
        COUNTS[self.0]
    }

    pub fn label(&self) -> &'static str {
        LABELS[self.0]
    }

    /// The shortest range draws individual samples
    pub fn points(&self) -> bool {
        self.0 == 0
    }
}

impl Default for RangeSetting {
    fn default() -> Self {
        Self(DEFAULT_RANGE)
    }
}

impl From<usize> for RangeSetting {
    /// Out-of-range values from old settings files fall back to the default
    fn from(index: usize) -> Self {
        Self::new(index).unwrap_or_default()
    }
}

impl From<RangeSetting> for usize {
    fn from(range: RangeSetting) -> Self {
        range.0
    }
}

/// Everything the scope and scales need to draw, re-derived rather than
/// mutated in place
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewConfig {
    pub range: RangeSetting,
    /// Scope scale factor
    pub scale: f32,
    /// Distance scale step
    pub step: f32,
    /// Samples across the scope
    pub count: usize,
    /// Draw dots instead of a trace
    pub points: bool,
    /// Scope scroll offset, in pixels
    pub scope_start: f32,
    /// Distance scale scroll offset, in display units
    pub xscale_start: f32,
    pub dark: bool,
}

impl ViewConfig {
    pub fn new(range: RangeSetting, dark: bool) -> Self {
        Self {
            range,
            scale: range.value(),
            step: 1000.0 * range.value(),
            count: range.count(),
            points: range.points(),
            scope_start: 0.0,
            xscale_start: 0.0,
            dark,
        }
    }

    /// Switch range; both scroll offsets go back to the start
    pub fn with_range(self, range: RangeSetting) -> Self {
        Self::new(range, self.dark)
    }

    /// Change theme only; range and scroll position are kept
    pub fn with_dark(self, dark: bool) -> Self {
        Self { dark, ..self }
    }

    /// Scroll by `pixels` (positive looks further back), never before the start
    /// or past `max_pixels`
    pub fn scrolled(self, pixels: f32, max_pixels: f32) -> Self {
        let scope_start = (self.scope_start + pixels).clamp(0.0, max_pixels.max(0.0));
        Self {
            scope_start,
            xscale_start: scope_start * self.scale,
            ..self
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self::new(RangeSetting::default(), false)
    }
}
