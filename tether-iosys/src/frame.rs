//! The `Frame`, a text rendering of the current UI which backends put on the display.

use crate::XY;

/// A block of text lines, sized to fit the display.
///
/// Widgets draw into a frame by pushing lines, bottom of the widget stack first. Lines wider than the frame are
/// clipped, and lines past the bottom edge are discarded (with [`Self::push_line`] reporting that).
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Frame {
    size: XY,
    lines: Vec<String>,
}

impl Frame {
    /// Create an empty frame of the given size.
    pub fn new(size: XY) -> Self {
        Self {
            size,
            lines: Vec::with_capacity(size.y()),
        }
    }

    /// The size of the frame, in characters.
    pub fn size(&self) -> XY {
        self.size
    }

    /// Empty the frame and change its size, reusing the allocation.
    pub fn resize(&mut self, size: XY) {
        self.size = size;
        self.lines.clear();
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Add a line of text to the bottom. Returns whether it fit at all.
    pub fn push_line(&mut self, text: impl AsRef<str>) -> bool {
        if self.lines.len() >= self.size.y() {
            return false;
        }
        let clipped: String = text.as_ref().chars().take(self.size.x()).collect();
        self.lines.push(clipped);
        true
    }

    /// All of the lines drawn so far, top to bottom.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Whether any line contains the given text. Mostly useful for checking what got drawn in tests.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lines_are_clipped_to_width() {
        let mut f = Frame::new(XY(5, 3));
        assert!(f.push_line("hello world"));
        assert_eq!(f.lines(), &["hello".to_owned()]);
    }

    #[test]
    fn overflowing_lines_are_rejected() {
        let mut f = Frame::new(XY(10, 2));
        assert!(f.push_line("one"));
        assert!(f.push_line("two"));
        assert!(!f.push_line("three"));
        assert_eq!(f.lines().len(), 2);
        assert!(!f.contains("three"));
    }

    #[test]
    fn resize_clears() {
        let mut f = Frame::new(XY(10, 2));
        f.push_line("gone soon");
        f.resize(XY(20, 4));
        assert_eq!(f.size(), XY(20, 4));
        assert!(f.lines().is_empty());
    }
}
