//! Run profiles
//!
//! Named iteration/cache settings, built in or declared in the config file.

use serde::{Deserialize, Serialize};

use crate::models::CacheRule;

/// Iteration count, pause and cache rule under a name
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub iterations: u32,
    #[serde(default)]
    pub pause_secs: u64,
    #[serde(default)]
    pub cache_rule: CacheRule,
}

impl RunProfile {
    /// Two cached passes, then one with the cache bypassed
    pub fn reference() -> Self {
        Self {
            name: "reference".to_string(),
            description: "3 iterations, cache disabled on the 3rd".to_string(),
            iterations: 3,
            pause_secs: 5,
            cache_rule: CacheRule::default(),
        }
    }

    /// One cached pass without pausing
    pub fn smoke() -> Self {
        Self {
            name: "smoke".to_string(),
            description: "Single iteration, no pause".to_string(),
            iterations: 1,
            pause_secs: 0,
            cache_rule: CacheRule::always_enabled(),
        }
    }

    /// Alternate cached and uncached passes
    pub fn cache_sweep() -> Self {
        Self {
            name: "cache-sweep".to_string(),
            description: "4 iterations alternating cached and uncached".to_string(),
            iterations: 4,
            pause_secs: 5,
            cache_rule: CacheRule::disable_on([2, 4]),
        }
    }

    pub fn builtin() -> Vec<RunProfile> {
        vec![Self::reference(), Self::smoke(), Self::cache_sweep()]
    }
}
