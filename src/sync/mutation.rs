//! Optimistic edits and deletes against the task and crop list stores.
//!
//! Each mutation moves `Idle -> Applied -> Committed | RolledBack`. The local
//! change is written to the store before the request leaves; the request
//! then runs on a spawned task. On success the server's copy is merged over
//! the optimistic one (non-empty server values win). On failure the entity's
//! pre-mutation snapshot is put back as-is and a notice is raised. Nothing
//! is retried.
//!
//! Mutations on the same id are not serialized: whichever response lands
//! last decides the final state.

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::crop::{Crop, CropStatus};
use crate::core::dates::{self, display_to_storage};
use crate::core::field::Field;
use crate::core::task::TaskPayload;
use crate::core::view::{FieldCrop, UpcomingTask};

use super::backend::Backend;
use super::notice::{Notice, Notifier};
use super::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    /// Nothing was applied (unknown id, failed precondition).
    Idle,
    /// Applied locally, server response pending.
    Applied,
    Committed,
    RolledBack,
}

/// Handle to a mutation in flight. Dropping it doesn't cancel anything.
#[derive(Debug)]
pub struct Mutation {
    state: watch::Receiver<MutationState>,
    handle: Option<JoinHandle<MutationState>>,
}

impl Mutation {
    fn idle() -> Self {
        let (_, state) = watch::channel(MutationState::Idle);
        Self { state, handle: None }
    }

    fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = MutationState> + Send + 'static,
    {
        let (tx, state) = watch::channel(MutationState::Applied);
        let handle = tokio::spawn(async move {
            let outcome = fut.await;
            tx.send_replace(outcome);
            outcome
        });
        Self {
            state,
            handle: Some(handle),
        }
    }

    /// Current state: `Applied` until the server response has been handled,
    /// then `Committed` or `RolledBack`.
    pub fn state(&self) -> MutationState {
        *self.state.borrow()
    }

    /// Wait for the server response to be reconciled or rolled back.
    pub async fn settled(self) -> MutationState {
        let Some(handle) = self.handle else {
            return MutationState::Idle;
        };
        match handle.await {
            Ok(state) => state,
            Err(e) => {
                log::error!("Mutation task did not finish: {}", e);
                MutationState::Applied
            }
        }
    }
}

/// New values for a task. Blank fields keep the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    pub description: String,
    pub due_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropEdit {
    pub title: String,
    pub status: CropStatus,
}

pub struct MutationController<B> {
    backend: Arc<B>,
    tasks: Store<Vec<UpcomingTask>>,
    crops: Store<Vec<FieldCrop>>,
    notifier: Notifier,
    reference_date: Option<NaiveDate>,
}

impl<B: Backend + 'static> MutationController<B> {
    pub fn new(
        backend: Arc<B>,
        tasks: Store<Vec<UpcomingTask>>,
        crops: Store<Vec<FieldCrop>>,
        notifier: Notifier,
    ) -> Self {
        Self {
            backend,
            tasks,
            crops,
            notifier,
            reference_date: None,
        }
    }

    /// Pin "today" instead of reading the clock.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    fn today(&self) -> NaiveDate {
        self.reference_date.unwrap_or_else(dates::today)
    }

    pub fn edit_task(&self, id: i64, edit: TaskEdit) -> Mutation {
        let rows = self.tasks.get();
        let Some(snapshot) = rows.iter().find(|t| t.id == id).cloned() else {
            log::warn!("Edit for unknown task {}", id);
            return Mutation::idle();
        };
        let Some(field_id) = snapshot.field_id else {
            self.notifier.notify(Notice::TaskHasNoField);
            return Mutation::idle();
        };

        let payload = TaskPayload {
            field_id,
            description: keep_if_blank(edit.description.trim(), &snapshot.description),
            due_date: keep_if_blank(edit.due_date.trim(), &snapshot.due_date),
        };

        let today = self.today();
        self.tasks.update(|rows| {
            if let Some(row) = rows.iter_mut().find(|t| t.id == id) {
                row.set_content(&payload.description, &payload.due_date, today);
            }
        });
        log::debug!("Task {} edit applied locally", id);

        let backend = Arc::clone(&self.backend);
        let tasks = self.tasks.clone();
        let notifier = self.notifier.clone();
        Mutation::spawn(async move {
            match backend.update_task(id, &payload).await {
                Ok(server) => {
                    tasks.update(|rows| {
                        if let Some(row) = rows.iter_mut().find(|t| t.id == id) {
                            let description = keep_if_blank(&server.description, &payload.description);
                            let due_date = keep_if_blank(&server.due_date, &payload.due_date);
                            row.set_content(&description, &due_date, today);
                            if server.field_id.is_some() {
                                row.field_id = server.field_id;
                            }
                        }
                    });
                    notifier.notify(Notice::TaskUpdated);
                    MutationState::Committed
                }
                Err(e) => {
                    log::error!("Updating task {} failed, rolling back: {}", id, e);
                    tasks.update(|rows| {
                        if let Some(row) = rows.iter_mut().find(|t| t.id == id) {
                            *row = snapshot;
                        }
                    });
                    notifier.notify(Notice::TaskUpdateFailed);
                    MutationState::RolledBack
                }
            }
        })
    }

    /// Edit with a user-entered `DD/MM/YYYY` due date. A blank date keeps the
    /// current due date; one that doesn't convert does too, after raising a
    /// notice.
    pub fn edit_task_with_display_date(&self, id: i64, description: &str, display_date: &str) -> Mutation {
        let display_date = display_date.trim();
        let due_date = if display_date.is_empty() {
            String::new()
        } else {
            match display_to_storage(display_date) {
                Ok(stored) => stored,
                Err(e) => {
                    self.notifier.notify(Notice::BadDate(e));
                    String::new()
                }
            }
        };
        self.edit_task(
            id,
            TaskEdit {
                description: description.to_string(),
                due_date,
            },
        )
    }

    pub fn delete_task(&self, id: i64) -> Mutation {
        let rows = self.tasks.get();
        let Some(index) = rows.iter().position(|t| t.id == id) else {
            log::warn!("Delete for unknown task {}", id);
            return Mutation::idle();
        };
        let snapshot = rows[index].clone();

        self.tasks.update(|rows| rows.retain(|t| t.id != id));
        log::debug!("Task {} removed locally", id);

        let backend = Arc::clone(&self.backend);
        let tasks = self.tasks.clone();
        let notifier = self.notifier.clone();
        Mutation::spawn(async move {
            match backend.delete_task(id).await {
                Ok(()) => {
                    notifier.notify(Notice::TaskDeleted);
                    MutationState::Committed
                }
                Err(e) => {
                    log::error!("Deleting task {} failed, restoring: {}", id, e);
                    tasks.update(|rows| reinsert(rows, index, snapshot, |t| t.id == id));
                    notifier.notify(Notice::TaskDeleteFailed);
                    MutationState::RolledBack
                }
            }
        })
    }

    /// Create a task on `field`. Not optimistic: the row appears once the
    /// server confirms it, so a failure leaves the store untouched.
    pub fn create_task(&self, field: &Field, description: &str, due_date: &str) -> Mutation {
        let payload = TaskPayload {
            field_id: field.id,
            description: description.trim().to_string(),
            due_date: due_date.to_string(),
        };
        let field_name = field.name.clone();
        let today = self.today();

        let backend = Arc::clone(&self.backend);
        let tasks = self.tasks.clone();
        let notifier = self.notifier.clone();
        Mutation::spawn(async move {
            match backend.create_task(&payload).await {
                Ok(mut created) => {
                    created.field_id.get_or_insert(payload.field_id);
                    if created.description.is_empty() {
                        created.description = payload.description.clone();
                    }
                    if created.due_date.is_empty() {
                        created.due_date = payload.due_date.clone();
                    }
                    let row = UpcomingTask::build(&created, &field_name, today);
                    tasks.update(|rows| rows.push(row));
                    notifier.notify(Notice::TaskCreated);
                    MutationState::Committed
                }
                Err(e) => {
                    log::error!("Creating task on field {} failed: {}", payload.field_id, e);
                    notifier.notify(Notice::TaskCreateFailed);
                    MutationState::RolledBack
                }
            }
        })
    }

    pub fn edit_crop(&self, crop_id: i64, edit: CropEdit) -> Mutation {
        let rows = self.crops.get();
        let Some(snapshot) = rows.iter().find(|c| c.crop.id == crop_id).cloned() else {
            log::warn!("Edit for unknown crop {}", crop_id);
            return Mutation::idle();
        };

        let mut updated: Crop = snapshot.crop.clone();
        updated.title = keep_if_blank(edit.title.trim(), &snapshot.crop.title);
        updated.status = edit.status;

        let local = updated.clone();
        self.crops.update(|rows| {
            if let Some(row) = rows.iter_mut().find(|c| c.crop.id == crop_id) {
                row.crop = local;
            }
        });
        log::debug!("Crop {} edit applied locally", crop_id);

        let backend = Arc::clone(&self.backend);
        let crops = self.crops.clone();
        let notifier = self.notifier.clone();
        Mutation::spawn(async move {
            match backend.update_crop(&updated).await {
                Ok(server) => {
                    crops.update(|rows| {
                        if let Some(row) = rows.iter_mut().find(|c| c.crop.id == crop_id) {
                            row.crop.reconcile(&server);
                        }
                    });
                    notifier.notify(Notice::CropUpdated);
                    MutationState::Committed
                }
                Err(e) => {
                    log::error!("Updating crop {} failed, rolling back: {}", crop_id, e);
                    crops.update(|rows| {
                        if let Some(row) = rows.iter_mut().find(|c| c.crop.id == crop_id) {
                            *row = snapshot;
                        }
                    });
                    notifier.notify(Notice::CropUpdateFailed);
                    MutationState::RolledBack
                }
            }
        })
    }

    pub fn delete_crop(&self, crop_id: i64) -> Mutation {
        let rows = self.crops.get();
        let Some(index) = rows.iter().position(|c| c.crop.id == crop_id) else {
            log::warn!("Delete for unknown crop {}", crop_id);
            return Mutation::idle();
        };
        let snapshot = rows[index].clone();

        self.crops.update(|rows| rows.retain(|c| c.crop.id != crop_id));
        log::debug!("Crop {} removed locally", crop_id);

        let backend = Arc::clone(&self.backend);
        let crops = self.crops.clone();
        let notifier = self.notifier.clone();
        Mutation::spawn(async move {
            match backend.delete_crop(crop_id).await {
                Ok(()) => {
                    notifier.notify(Notice::CropDeleted);
                    MutationState::Committed
                }
                Err(e) => {
                    log::error!("Deleting crop {} failed, restoring: {}", crop_id, e);
                    crops.update(|rows| reinsert(rows, index, snapshot, |c| c.crop.id == crop_id));
                    notifier.notify(Notice::CropDeleteFailed);
                    MutationState::RolledBack
                }
            }
        })
    }
}

fn keep_if_blank(new: &str, current: &str) -> String {
    if new.is_empty() { current } else { new }.to_string()
}

/// Put a deleted row back where it was, unless something with the same id
/// has reappeared in the meantime.
fn reinsert<T>(rows: &mut Vec<T>, index: usize, row: T, same: impl Fn(&T) -> bool) {
    if rows.iter().any(same) {
        return;
    }
    let index = index.min(rows.len());
    rows.insert(index, row);
}
