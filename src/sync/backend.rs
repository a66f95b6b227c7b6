use std::future::Future;

use crate::core::crop::Crop;
use crate::core::field::Field;
use crate::core::progress::ProgressEntry;
use crate::core::task::{Task, TaskPayload};

use super::error::Result;

/// Single-resource operations the aggregation layer is built on.
///
/// Implementations return canonical (already normalized) entities.
/// `get_crop_by_field` and `get_progress` report absence as `Ok(None)`.
pub trait Backend: Send + Sync {
    fn list_fields_by_user(&self, user_id: i64) -> impl Future<Output = Result<Vec<Field>>> + Send;

    fn get_field(&self, field_id: i64) -> impl Future<Output = Result<Field>> + Send;

    fn get_crop_by_field(&self, field_id: i64) -> impl Future<Output = Result<Option<Crop>>> + Send;

    fn list_tasks_by_field(&self, field_id: i64) -> impl Future<Output = Result<Vec<Task>>> + Send;

    fn get_progress(&self, progress_id: i64) -> impl Future<Output = Result<Option<ProgressEntry>>> + Send;

    fn create_task(&self, payload: &TaskPayload) -> impl Future<Output = Result<Task>> + Send;

    fn update_task(&self, id: i64, payload: &TaskPayload) -> impl Future<Output = Result<Task>> + Send;

    fn delete_task(&self, id: i64) -> impl Future<Output = Result<()>> + Send;

    fn update_crop(&self, crop: &Crop) -> impl Future<Output = Result<Crop>> + Send;

    fn delete_crop(&self, id: i64) -> impl Future<Output = Result<()>> + Send;
}
