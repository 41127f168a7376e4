use serde::Serialize;

/// Counters collected by a trimming merge.
///
/// # Fields
///
/// * `total` - Every read pair considered, including rejected pairs
/// * `short` - Pairs dropped because a trimmed mate fell below the minimum length
/// * `trim1` - Written pairs where read 1 was shortened
/// * `trim2` - Written pairs where read 2 was shortened
#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeMetrics {
    pub total: usize,
    pub short: usize,
    pub trim1: usize,
    pub trim2: usize,
}

impl MergeMetrics {
    /// Pairs that made it to the output.
    pub fn written(&self) -> usize {
        self.total - self.short
    }
}

impl std::fmt::Display for MergeMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} pairs, {} too short, {} read 1 trimmed, {} read 2 trimmed",
            self.total, self.short, self.trim1, self.trim2
        )
    }
}
