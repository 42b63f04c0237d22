//! Branch models

use serde::{Deserialize, Serialize};

/// Ahead/behind counts of a local branch against the two default baselines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalBranchDistances {
    pub behind_master: u32,
    pub ahead_master: u32,
    pub behind_origin: u32,
    pub ahead_origin: u32,
}

/// Result of one `rev-list --left-right --count` comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Comparison {
    Available { behind: u32, ahead: u32 },
    /// The baseline does not exist or git refused the comparison
    Unavailable,
}

impl Comparison {
    /// Parse the `<behind>\t<ahead>` pair printed by git
    pub fn parse(output: &str) -> Self {
        let mut counts = output.split_whitespace().map(str::parse::<u32>);

        match (counts.next(), counts.next(), counts.next()) {
            (Some(Ok(behind)), Some(Ok(ahead)), None) => Comparison::Available { behind, ahead },
            _ => Comparison::Unavailable,
        }
    }
}

impl LocalBranchDistances {
    /// Combine the comparison against the local default branch with the one
    /// against the remote default branch. Unavailable sides stay at zero.
    pub fn from_comparisons(master: Comparison, origin: Comparison) -> Self {
        let mut distances = Self::default();

        if let Comparison::Available { behind, ahead } = master {
            distances.behind_master = behind;
            distances.ahead_master = ahead;
        }

        if let Comparison::Available { behind, ahead } = origin {
            distances.behind_origin = behind;
            distances.ahead_origin = ahead;
        }

        distances
    }
}
