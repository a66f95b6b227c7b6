use serde::{Deserialize, Serialize};

/// Last recorded care dates for a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub id: i64,
    pub watered: String,
    pub fertilized: String,
    pub pests: String,
}
