//! Fan-out joins that turn a user's fields into view models.
//!
//! Every join starts from the field list. Per-field crop, task and progress
//! lookups then run concurrently and are all awaited before merging. A
//! failed field-list or task fetch fails the whole join once every branch
//! has settled; a failed crop or progress lookup is logged and treated as
//! "no crop" / "no progress" for that field.

use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::join_all;

use crate::core::crop::Crop;
use crate::core::dates::{days_until, format_display_date};
use crate::core::field::Field;
use crate::core::progress::ProgressEntry;
use crate::core::task::Task;
use crate::core::view::{
    CombinedField, DashboardViewModel, FieldCrop, FieldDetail, UpcomingHarvest, UpcomingTask,
};
use crate::core::window::{HARVEST_WINDOW, TASK_WINDOW, select_upcoming, select_upcoming_dated};

use super::backend::Backend;
use super::error::Result;

pub struct JoinPipeline<B> {
    backend: Arc<B>,
}

impl<B> Clone for JoinPipeline<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: Backend> JoinPipeline<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Dashboard: the two nearest upcoming harvests and three nearest
    /// upcoming tasks across all of the user's fields.
    pub async fn join_user_fields(&self, user_id: i64, today: NaiveDate) -> Result<DashboardViewModel> {
        let fields = self.backend.list_fields_by_user(user_id).await?;
        let mut dashboard = DashboardViewModel::empty(today);
        if fields.is_empty() {
            log::debug!("User {} has no fields", user_id);
            return Ok(dashboard);
        }

        let (crops, tasks) = futures::join!(self.crops_for(&fields), self.tasks_for(&fields));
        let tasks = tasks?;

        dashboard.harvests = harvest_window(&fields, &crops, today);
        dashboard.tasks = select_upcoming(
            task_rows(&fields, tasks, today),
            |t| Some(t.due_date.as_str()),
            today,
            TASK_WINDOW,
        );

        log::info!(
            "Dashboard for user {}: {} fields, {} harvests, {} tasks",
            user_id,
            fields.len(),
            dashboard.harvests.len(),
            dashboard.tasks.len()
        );
        Ok(dashboard)
    }

    /// Field list: every field with its crop status and days to harvest.
    pub async fn join_fields_with_crops(&self, user_id: i64, today: NaiveDate) -> Result<Vec<CombinedField>> {
        let fields = self.backend.list_fields_by_user(user_id).await?;
        if fields.is_empty() {
            return Ok(Vec::new());
        }

        let crops = self.crops_for(&fields).await;
        Ok(fields
            .iter()
            .zip(&crops)
            .map(|(field, crop)| CombinedField::build(field, crop.as_ref(), today))
            .collect())
    }

    /// Task list: every task of every field in fetch order, unwindowed.
    pub async fn join_fields_with_tasks(&self, user_id: i64, today: NaiveDate) -> Result<Vec<UpcomingTask>> {
        let fields = self.backend.list_fields_by_user(user_id).await?;
        if fields.is_empty() {
            return Ok(Vec::new());
        }

        let tasks = self.tasks_for(&fields).await?;
        Ok(task_rows(&fields, tasks, today))
    }

    /// Crop list: the crop of each field that has one, tagged with the
    /// field's name.
    pub async fn join_crops_with_fields(&self, user_id: i64) -> Result<Vec<FieldCrop>> {
        let fields = self.backend.list_fields_by_user(user_id).await?;
        if fields.is_empty() {
            return Ok(Vec::new());
        }

        let crops = self.crops_for(&fields).await;
        Ok(fields
            .iter()
            .zip(crops)
            .filter_map(|(field, crop)| {
                crop.map(|crop| FieldCrop {
                    crop,
                    field_name: field.name.clone(),
                })
            })
            .collect())
    }

    /// One field with its crop, tasks and progress entry.
    pub async fn field_detail(&self, field_id: i64, today: NaiveDate) -> Result<FieldDetail> {
        let field = self.backend.get_field(field_id).await?;

        let (crop, tasks, progress) = futures::join!(
            self.crop_or_none(&field),
            self.tasks_of(&field),
            self.progress_or_none(field.progress_history_id),
        );
        let tasks = tasks?;

        let days_until_harvest = crop
            .as_ref()
            .and_then(|c| days_until(today, &c.harvest_date));

        Ok(FieldDetail {
            field,
            crop,
            tasks,
            progress,
            days_until_harvest,
        })
    }

    async fn crops_for(&self, fields: &[Field]) -> Vec<Option<Crop>> {
        join_all(fields.iter().map(|f| self.crop_or_none(f))).await
    }

    /// Every branch runs to completion before the first error is returned.
    async fn tasks_for(&self, fields: &[Field]) -> Result<Vec<Vec<Task>>> {
        join_all(fields.iter().map(|f| self.tasks_of(f)))
            .await
            .into_iter()
            .collect()
    }

    async fn crop_or_none(&self, field: &Field) -> Option<Crop> {
        match self.backend.get_crop_by_field(field.id).await {
            Ok(crop) => crop,
            Err(e) => {
                log::warn!("Crop lookup for field {} failed, treating as none: {}", field.id, e);
                None
            }
        }
    }

    async fn tasks_of(&self, field: &Field) -> Result<Vec<Task>> {
        let mut tasks = self.backend.list_tasks_by_field(field.id).await.inspect_err(|e| {
            log::warn!("Task lookup for field {} failed: {}", field.id, e);
        })?;
        for task in &mut tasks {
            task.field_id.get_or_insert(field.id);
        }
        Ok(tasks)
    }

    async fn progress_or_none(&self, progress_id: Option<i64>) -> Option<ProgressEntry> {
        let id = progress_id?;
        match self.backend.get_progress(id).await {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Progress lookup {} failed, treating as none: {}", id, e);
                None
            }
        }
    }
}

fn harvest_window(fields: &[Field], crops: &[Option<Crop>], today: NaiveDate) -> Vec<UpcomingHarvest> {
    let with_crop = fields
        .iter()
        .zip(crops)
        .filter_map(|(field, crop)| crop.as_ref().map(|crop| (field, crop)));

    select_upcoming_dated(with_crop, |(_, crop)| Some(crop.harvest_date.as_str()), today, HARVEST_WINDOW)
        .into_iter()
        .map(|(date, (field, crop))| UpcomingHarvest {
            when_display: format_display_date(date),
            field_name: field.name.clone(),
            crop_title: crop.title.clone(),
        })
        .collect()
}

fn task_rows(fields: &[Field], tasks: Vec<Vec<Task>>, today: NaiveDate) -> Vec<UpcomingTask> {
    fields
        .iter()
        .zip(tasks)
        .flat_map(|(field, tasks)| {
            tasks
                .into_iter()
                .map(move |task| UpcomingTask::build(&task, &field.name, today))
        })
        .collect()
}
