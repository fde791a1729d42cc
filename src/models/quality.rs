//! Review quality on the 0-5 SM-2 scale.
use serde::{Deserialize, Serialize};

/// Lowest quality that counts as a successful recall.
pub const PASSING_QUALITY: u8 = 3;

/// Quality of a single review. Out-of-range input is clamped, never rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub struct Quality(u8);

impl Quality {
    pub const MIN: Quality = Quality(0);
    pub const MAX: Quality = Quality(5);

    pub fn new(raw: i32) -> Self {
        Self(raw.clamp(0, 5) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_lapse(self) -> bool {
        self.0 < PASSING_QUALITY
    }

    /// All six grades, worst first.
    pub fn all() -> impl Iterator<Item = Quality> {
        (0..=5).map(Quality)
    }
}

impl From<i32> for Quality {
    fn from(raw: i32) -> Self {
        Self::new(raw)
    }
}

impl From<Quality> for i32 {
    fn from(quality: Quality) -> Self {
        quality.0 as i32
    }
}
