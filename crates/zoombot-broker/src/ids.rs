//! Synthetic order identifiers.

/// Monotonic order ids rendered as 12-digit zero-padded strings.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next identifier, starting at `000000000001`.
    pub fn next_id(&mut self) -> String {
        self.last += 1;
        format!("{:012}", self.last)
    }
}
