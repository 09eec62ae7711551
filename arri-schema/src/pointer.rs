//! JSON pointer building for diagnostics.

/// A growable '/'-delimited JSON pointer.
///
/// Segments are escaped per RFC 6901 (`~` → `~0`, `/` → `~1`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Pointer(String);

impl Pointer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_segments(segments: &[&str]) -> Self {
        let mut pointer = Self::new();
        for segment in segments {
            pointer.push(segment);
        }
        pointer
    }

    /// Append one segment and return the previous length for [`truncate`](Self::truncate).
    pub(crate) fn push(&mut self, segment: &str) -> usize {
        let len = self.0.len();
        self.0.push('/');
        for c in segment.chars() {
            match c {
                '~' => self.0.push_str("~0"),
                '/' => self.0.push_str("~1"),
                c => self.0.push(c),
            }
        }
        len
    }

    pub(crate) fn push_index(&mut self, index: usize) -> usize {
        let len = self.0.len();
        self.0.push('/');
        self.0.push_str(&index.to_string());
        len
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    /// Swap in another pointer, returning the old one.
    pub(crate) fn replace(&mut self, other: Pointer) -> Pointer {
        std::mem::replace(self, other)
    }

    /// This pointer with extra segments appended, without mutating it.
    pub(crate) fn with(&self, segments: &[&str]) -> String {
        let mut copy = self.clone();
        for segment in segments {
            copy.push(segment);
        }
        copy.0
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_truncate() {
        let mut pointer = Pointer::new();
        let root = pointer.push("properties");
        pointer.push("date");
        assert_eq!(pointer.as_str(), "/properties/date");
        pointer.truncate(root);
        assert_eq!(pointer.as_str(), "");
    }

    #[test]
    fn test_escaping() {
        let mut pointer = Pointer::new();
        pointer.push("a/b~c");
        assert_eq!(pointer.as_str(), "/a~1b~0c");
    }

    #[test]
    fn test_with_does_not_mutate() {
        let pointer = Pointer::from_segments(&["mapping", "A"]);
        assert_eq!(pointer.with(&["properties", "x"]), "/mapping/A/properties/x");
        assert_eq!(pointer.as_str(), "/mapping/A");
    }

    #[test]
    fn test_index() {
        let mut pointer = Pointer::new();
        pointer.push_index(3);
        assert_eq!(pointer.as_str(), "/3");
    }
}
