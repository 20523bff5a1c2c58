use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One narrative unit extracted from the script.
///
/// Scene numbers are 1-based and strictly increasing in parse order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub number: u32,
    pub location: String,
    pub time_of_day: String,
    pub dialogue: String,
    /// Deduplicated character names mentioned in the dialogue. The set is
    /// best-effort (see the segmenter's uppercase-run heuristic).
    pub characters: BTreeSet<String>,
}

impl std::fmt::Display for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Scene {}: {} - {}",
            self.number, self.location, self.time_of_day
        )
    }
}
