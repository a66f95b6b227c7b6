//! Scripted in-memory backend for pipeline and mutation tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use reqwest::StatusCode;
use tokio::sync::Notify;

use crate::core::crop::Crop;
use crate::core::field::Field;
use crate::core::progress::ProgressEntry;
use crate::core::task::{Task, TaskPayload};

use super::backend::Backend;
use super::error::{Result, SyncError};

/// An operation the mock should fail with a 503.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fail {
    ListFields,
    GetField(i64),
    Crop(i64),
    Tasks(i64),
    Progress(i64),
    CreateTask,
    UpdateTask(i64),
    DeleteTask(i64),
    UpdateCrop(i64),
    DeleteCrop(i64),
}

#[derive(Default)]
pub struct MockBackend {
    fields: Vec<Field>,
    crops: HashMap<i64, Crop>,
    tasks: HashMap<i64, Vec<Task>>,
    progress: HashMap<i64, ProgressEntry>,
    failing: HashSet<Fail>,
    fail_once: Mutex<HashSet<Fail>>,
    holds: Mutex<HashMap<Fail, Arc<Notify>>>,
    calls: Mutex<Vec<String>>,
    next_task_id: AtomicI64,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            next_task_id: AtomicI64::new(100),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_crop(mut self, field_id: i64, mut crop: Crop) -> Self {
        crop.field_id = Some(field_id);
        self.crops.insert(field_id, crop);
        self
    }

    pub fn with_task(self, task: Task) -> Self {
        let field_id = task.field_id.unwrap_or_default();
        self.with_task_for(field_id, task)
    }

    /// File `task` under `field_id` regardless of what the task itself says.
    pub fn with_task_for(mut self, field_id: i64, task: Task) -> Self {
        self.tasks.entry(field_id).or_default().push(task);
        self
    }

    pub fn with_progress(mut self, entry: ProgressEntry) -> Self {
        self.progress.insert(entry.id, entry);
        self
    }

    pub fn failing(mut self, op: Fail) -> Self {
        self.failing.insert(op);
        self
    }

    /// Fail only the next call of `op`.
    pub fn failing_once(self, op: Fail) -> Self {
        self.fail_once.lock().unwrap().insert(op);
        self
    }

    /// Park the next call of `op` until `release` is notified. Its outcome is
    /// decided when the call arrives, not when it is released.
    pub fn holding(self, op: Fail, release: Arc<Notify>) -> Self {
        self.holds.lock().unwrap().insert(op, release);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn call(&self, call: String, op: Fail) -> Result<()> {
        let hold = self.holds.lock().unwrap().remove(&op);
        self.calls.lock().unwrap().push(call.clone());
        let fails = self.failing.contains(&op) || self.fail_once.lock().unwrap().remove(&op);
        if let Some(release) = hold {
            release.notified().await;
        }
        if fails {
            return Err(SyncError::status(call, StatusCode::SERVICE_UNAVAILABLE));
        }
        Ok(())
    }
}

/// The mock "server" canonicalizes bare dates to midnight timestamps.
fn server_date(raw: &str) -> String {
    if raw.len() == 10 {
        format!("{}T00:00:00", raw)
    } else {
        raw.to_string()
    }
}

impl Backend for MockBackend {
    async fn list_fields_by_user(&self, user_id: i64) -> Result<Vec<Field>> {
        self.call(format!("fields:{}", user_id), Fail::ListFields).await?;
        Ok(self.fields.clone())
    }

    async fn get_field(&self, field_id: i64) -> Result<Field> {
        self.call(format!("field:{}", field_id), Fail::GetField(field_id)).await?;
        self.fields
            .iter()
            .find(|f| f.id == field_id)
            .cloned()
            .ok_or_else(|| SyncError::status(format!("field:{}", field_id), StatusCode::NOT_FOUND))
    }

    async fn get_crop_by_field(&self, field_id: i64) -> Result<Option<Crop>> {
        self.call(format!("crop:{}", field_id), Fail::Crop(field_id)).await?;
        Ok(self.crops.get(&field_id).cloned())
    }

    async fn list_tasks_by_field(&self, field_id: i64) -> Result<Vec<Task>> {
        self.call(format!("tasks:{}", field_id), Fail::Tasks(field_id)).await?;
        Ok(self.tasks.get(&field_id).cloned().unwrap_or_default())
    }

    async fn get_progress(&self, progress_id: i64) -> Result<Option<ProgressEntry>> {
        self.call(format!("progress:{}", progress_id), Fail::Progress(progress_id)).await?;
        Ok(self.progress.get(&progress_id).cloned())
    }

    async fn create_task(&self, payload: &TaskPayload) -> Result<Task> {
        self.call("create_task".to_string(), Fail::CreateTask).await?;
        let id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
        Ok(Task::new(
            id,
            payload.field_id,
            payload.description.trim(),
            server_date(&payload.due_date),
        ))
    }

    async fn update_task(&self, id: i64, payload: &TaskPayload) -> Result<Task> {
        self.call(format!("update_task:{}", id), Fail::UpdateTask(id)).await?;
        Ok(Task::new(
            id,
            payload.field_id,
            payload.description.trim(),
            server_date(&payload.due_date),
        ))
    }

    async fn delete_task(&self, id: i64) -> Result<()> {
        self.call(format!("delete_task:{}", id), Fail::DeleteTask(id)).await
    }

    async fn update_crop(&self, crop: &Crop) -> Result<Crop> {
        self.call(format!("update_crop:{}", crop.id), Fail::UpdateCrop(crop.id)).await?;
        let mut echoed = crop.clone();
        echoed.harvest_date = server_date(&crop.harvest_date);
        Ok(echoed)
    }

    async fn delete_crop(&self, id: i64) -> Result<()> {
        self.call(format!("delete_crop:{}", id), Fail::DeleteCrop(id)).await
    }
}
