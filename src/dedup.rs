use std::collections::HashSet;

/// Labels already given a position in the current session.
///
/// The key is the exact cleaned label: two listings that only differ in case or
/// punctuation are different entries here. Fuzzy identity belongs to the matcher.
#[derive(Debug, Default)]
pub struct SeenSet {
    seen: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time `label` is offered, false on every repeat.
    pub fn admit(&mut self, label: &str) -> bool {
        if self.seen.contains(label) {
            return false;
        }
        self.seen.insert(label.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}
