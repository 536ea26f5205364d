//! Cluster version gate.

use serde::{Deserialize, Serialize};

/// Oldest cluster version the capability modules are known to work against.
pub const MINIMUM_VERSION: &str = "1.328.0";

/// Body of `/api/v1/config/clusterversion`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterVersion {
    pub version: String,
}

/// Whether `candidate` is at least `minimum`.
///
/// Both are dot-separated integer tuples compared left to right. Missing
/// trailing components and non-numeric components count as 0, so equal
/// versions pass.
pub fn meets_minimum(candidate: &str, minimum: &str) -> bool {
    let candidate = components(candidate);
    let minimum = components(minimum);

    for i in 0..candidate.len().max(minimum.len()) {
        let current = candidate.get(i).copied().unwrap_or(0);
        let required = minimum.get(i).copied().unwrap_or(0);

        if current > required {
            return true;
        }
        if current < required {
            return false;
        }
    }

    true
}

fn components(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|part| part.trim().parse().unwrap_or(0))
        .collect()
}
