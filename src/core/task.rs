use serde::{Deserialize, Serialize};

/// A scheduled action on one field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    /// `None` when the backend record carried no field reference.
    pub field_id: Option<i64>,
    pub description: String,
    /// Raw due date as sent by the backend (ISO-8601 or `YYYY-MM-DD`).
    pub due_date: String,
}

impl Task {
    pub fn new(id: i64, field_id: i64, description: impl Into<String>, due_date: impl Into<String>) -> Self {
        Self {
            id,
            field_id: Some(field_id),
            description: description.into(),
            due_date: due_date.into(),
        }
    }
}

/// Body sent to the backend when creating or updating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub field_id: i64,
    pub description: String,
    pub due_date: String,
}
