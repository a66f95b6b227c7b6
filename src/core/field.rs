use serde::{Deserialize, Serialize};

/// A user-owned plot. Read-only inside this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub id: i64,
    pub name: String,
    pub image_url: String,
    pub user_id: Option<i64>,
    pub size: String,
    pub product: String,
    pub location: String,
    /// Id of the progress-history record attached to this field, if any.
    pub progress_history_id: Option<i64>,
}

impl Field {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }
}
