//! Per-group rules.

use serde::{Deserialize, Serialize};

/// Group used when nothing else has been selected, or after the active group is deleted.
pub const DEFAULT_GROUP: &str = "General";

pub const DEFAULT_TEAM_SIZE: usize = 6;
pub const DEFAULT_VICTORY_LIMIT: u32 = 3;

/// Rules for one group; keyed by group name.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub group: String,
    /// Players per side.
    pub team_size: usize,
    /// Consecutive wins before the winning roster is broken up.
    pub victory_limit: u32,
    /// Require female representation on each side when one is available.
    pub gender_priority: bool,
}

impl GroupConfig {
    /// Defaults: 6 per side, 3 wins, gender priority on.
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            team_size: DEFAULT_TEAM_SIZE,
            victory_limit: DEFAULT_VICTORY_LIMIT,
            gender_priority: true,
        }
    }

    /// Present players needed to start an automatic match.
    pub fn players_required(&self) -> usize {
        self.team_size * 2
    }
}
