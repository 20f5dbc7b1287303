use serde::{Deserialize, Serialize};

use crate::domain::{ProgressSnapshot, RankSnapshot, RankUpgrade, Task, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTodoRequest {
    pub task: String,
}

/// The two legal update payload shapes. Untagged so the wire carries exactly
/// `{"task": …}` or `{"completed": …}`, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskPatch {
    Text { task: String },
    Completed { completed: bool },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<RankSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoListResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub todos: Vec<Task>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todo: Option<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_upgrade: Option<RankUpgrade>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTodoResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankInfoResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<RankSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RankTier, TodoId};

    #[test]
    fn text_patch_serializes_to_single_task_field() {
        let patch = TaskPatch::Text {
            task: "Buy milk".to_string(),
        };
        let json = serde_json::to_value(&patch).expect("serialize");
        assert_eq!(json, serde_json::json!({ "task": "Buy milk" }));
    }

    #[test]
    fn completed_patch_serializes_to_single_completed_field() {
        let patch = TaskPatch::Completed { completed: true };
        let json = serde_json::to_value(&patch).expect("serialize");
        assert_eq!(json, serde_json::json!({ "completed": true }));
    }

    #[test]
    fn todo_response_parses_camel_case_upgrade_payload() {
        let raw = serde_json::json!({
            "success": true,
            "todo": { "todo_id": 1, "task": "Buy milk", "completed": true },
            "rankUpgrade": {
                "upgraded": true,
                "fromRank": "iron",
                "toRank": "silver",
                "rankInfo": {
                    "current": "silver",
                    "displayName": "Silver",
                    "totalCompleted": 10
                }
            }
        });
        let parsed: TodoResponse = serde_json::from_value(raw).expect("parse");
        assert!(parsed.success);
        assert_eq!(parsed.todo.expect("todo").todo_id, TodoId(1));
        let upgrade = parsed.rank_upgrade.expect("upgrade");
        assert_eq!(upgrade.from_rank, RankTier::Iron);
        assert_eq!(upgrade.to_rank, RankTier::Silver);
        assert_eq!(upgrade.rank_info.display_name, "Silver");
    }

    #[test]
    fn failure_envelope_parses_without_payload_fields() {
        let raw = serde_json::json!({ "success": false, "message": "Invalid credentials" });
        let parsed: LoginResponse = serde_json::from_value(raw).expect("parse");
        assert!(!parsed.success);
        assert_eq!(parsed.message.as_deref(), Some("Invalid credentials"));
        assert!(parsed.token.is_none());
    }
}
