//! Team model.

use super::user::TeamMember;
use serde::{Deserialize, Serialize};

/// A named group of users sharing a review pool.
///
/// Members are ordered by username when read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub team_name: String,
    #[serde(default)]
    pub members: Vec<TeamMember>,
}
