pub mod backend;
pub mod error;
pub mod http;
pub mod join;
pub mod mutation;
pub mod notice;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use chrono::NaiveDate;

use crate::core::dates;
use crate::core::view::DashboardViewModel;
use backend::Backend;
use error::Result;
use join::JoinPipeline;
use mutation::MutationController;
use notice::{Notice, Notifier, View};
use store::ViewModels;

/// Ties a backend to the view stores: reloads publish fresh view models,
/// mutations go through the optimistic controller, and failures surface as
/// notices.
pub struct Fieldbook<B> {
    pipeline: JoinPipeline<B>,
    views: ViewModels,
    notifier: Notifier,
    mutations: MutationController<B>,
    reference_date: Option<NaiveDate>,
}

impl<B: Backend + 'static> Fieldbook<B> {
    pub fn new(backend: B) -> Self {
        let backend = Arc::new(backend);
        let views = ViewModels::default();
        let notifier = Notifier::new();
        let mutations = MutationController::new(
            Arc::clone(&backend),
            views.tasks.clone(),
            views.crops.clone(),
            notifier.clone(),
        );
        Self {
            pipeline: JoinPipeline::new(backend),
            views,
            notifier,
            mutations,
            reference_date: None,
        }
    }

    /// Compute every view relative to `date` instead of the local clock.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self.mutations = self.mutations.with_reference_date(date);
        self.views.dashboard.set(DashboardViewModel::empty(date));
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.reference_date.unwrap_or_else(dates::today)
    }

    pub fn views(&self) -> &ViewModels {
        &self.views
    }

    pub fn notices(&self) -> &Notifier {
        &self.notifier
    }

    pub fn mutations(&self) -> &MutationController<B> {
        &self.mutations
    }

    pub async fn reload_dashboard(&self, user_id: i64) -> Result<()> {
        let today = self.today();
        match self.pipeline.join_user_fields(user_id, today).await {
            Ok(dashboard) => {
                self.views.dashboard.set(dashboard);
                Ok(())
            }
            Err(e) => {
                self.views.dashboard.set(DashboardViewModel::empty(today));
                Err(self.load_failed(View::Dashboard, e))
            }
        }
    }

    pub async fn reload_fields(&self, user_id: i64) -> Result<()> {
        match self.pipeline.join_fields_with_crops(user_id, self.today()).await {
            Ok(fields) => {
                log::info!("Loaded {} fields for user {}", fields.len(), user_id);
                self.views.fields.set(fields);
                Ok(())
            }
            Err(e) => {
                self.views.fields.set(Vec::new());
                Err(self.load_failed(View::Fields, e))
            }
        }
    }

    pub async fn reload_tasks(&self, user_id: i64) -> Result<()> {
        match self.pipeline.join_fields_with_tasks(user_id, self.today()).await {
            Ok(tasks) => {
                log::info!("Loaded {} tasks for user {}", tasks.len(), user_id);
                self.views.tasks.set(tasks);
                Ok(())
            }
            Err(e) => {
                self.views.tasks.set(Vec::new());
                Err(self.load_failed(View::Tasks, e))
            }
        }
    }

    pub async fn reload_crops(&self, user_id: i64) -> Result<()> {
        match self.pipeline.join_crops_with_fields(user_id).await {
            Ok(crops) => {
                log::info!("Loaded {} crops for user {}", crops.len(), user_id);
                self.views.crops.set(crops);
                Ok(())
            }
            Err(e) => {
                self.views.crops.set(Vec::new());
                Err(self.load_failed(View::Crops, e))
            }
        }
    }

    pub async fn load_field_detail(&self, field_id: i64) -> Result<()> {
        match self.pipeline.field_detail(field_id, self.today()).await {
            Ok(detail) => {
                self.views.field_detail.set(Some(detail));
                Ok(())
            }
            Err(e) => {
                self.views.field_detail.set(None);
                Err(self.load_failed(View::FieldDetail, e))
            }
        }
    }

    fn load_failed(&self, view: View, e: error::SyncError) -> error::SyncError {
        log::error!("Loading {:?} failed: {}", view, e);
        self.notifier.notify(Notice::LoadFailed(view));
        e
    }
}
