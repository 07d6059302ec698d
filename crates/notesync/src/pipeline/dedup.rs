use std::collections::HashSet;

/// Set-backed duplicate filter for one batch.
///
/// The first candidate carrying a name is admitted; every later one with the
/// same name is rejected, whatever happened to the first.
#[derive(Debug, Default)]
pub struct NameDedup {
    seen: HashSet<String>,
}

impl NameDedup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time `name` is offered.
    pub fn admit(&mut self, name: &str) -> bool {
        self.seen.insert(name.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
