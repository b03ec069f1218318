//! Just the `XY` type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A position or size, with an X and a Y component.
///
/// When used as a position, `XY(0, 0)` is at the top left of the display, and `XY(0, 1)` is just below it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct XY(pub usize, pub usize);

impl XY {
    /// The X component
    pub const fn x(&self) -> usize {
        self.0
    }

    /// The Y component
    pub const fn y(&self) -> usize {
        self.1
    }

    /// Whether this position falls inside an area of the given size anchored at the origin.
    pub fn within(&self, size: XY) -> bool {
        self.0 < size.0 && self.1 < size.1
    }
}

impl fmt::Display for XY {
    #[cfg_attr(coverage, no_coverage)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

impl fmt::Debug for XY {
    #[cfg_attr(coverage, no_coverage)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XY({}, {})", self.0, self.1)
    }
}

impl From<(usize, usize)> for XY {
    #[cfg_attr(coverage, no_coverage)]
    fn from(f: (usize, usize)) -> XY {
        XY(f.0, f.1)
    }
}
