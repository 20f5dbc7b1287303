use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(UserId);
id_newtype!(TodoId);

/// Gamified achievement tiers, ordered lowest to highest. Thresholds live in
/// the task/progression service; the client never computes tier transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankTier {
    Iron,
    Silver,
    Gold,
    Diamond,
    Platinum,
    TodoMaster,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub todo_id: TodoId,
    pub task: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Current tier plus cumulative completed-task count, as computed server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankSnapshot {
    pub current: RankTier,
    pub display_name: String,
    pub total_completed: u64,
}

/// Progress toward the next tier. When `is_max_rank` is set, `current` is 100
/// and `next_rank` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub current: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_rank: Option<RankTier>,
    pub tasks_to_next: u32,
    pub is_max_rank: bool,
}

/// One-shot tier-transition notification delivered alongside a task update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankUpgrade {
    #[serde(default)]
    pub upgraded: bool,
    pub from_rank: RankTier,
    pub to_rank: RankTier,
    pub rank_info: RankSnapshot,
}
