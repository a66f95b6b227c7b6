use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::crop::{Crop, CropStatus};
use super::dates::{day_name, days_until, is_on_day};
use super::field::Field;
use super::progress::ProgressEntry;
use super::task::Task;

/// A field merged with its (possibly absent) crop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedField {
    pub id: i64,
    pub title: String,
    pub image_url: String,
    pub status: CropStatus,
    pub crop_name: String,
    /// Zero when there is no crop or its harvest date doesn't parse.
    pub days_until_harvest: i64,
}

impl CombinedField {
    pub fn build(field: &Field, crop: Option<&Crop>, today: NaiveDate) -> Self {
        Self {
            id: field.id,
            title: field.name.clone(),
            image_url: field.image_url.clone(),
            status: crop.map(|c| c.status).unwrap_or(CropStatus::Unknown),
            crop_name: crop.map(|c| c.title.clone()).unwrap_or_default(),
            days_until_harvest: crop
                .and_then(|c| days_until(today, &c.harvest_date))
                .unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingHarvest {
    /// Harvest day as `DD/MM/YYYY`.
    pub when_display: String,
    pub field_name: String,
    pub crop_title: String,
}

/// A task tagged with the name of the field it belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingTask {
    pub id: i64,
    pub field_id: Option<i64>,
    pub description: String,
    pub field_name: String,
    pub due_date: String,
    pub is_today: bool,
}

impl UpcomingTask {
    pub fn build(task: &Task, field_name: &str, today: NaiveDate) -> Self {
        Self {
            id: task.id,
            field_id: task.field_id,
            description: task.description.clone(),
            field_name: field_name.to_string(),
            due_date: task.due_date.clone(),
            is_today: is_on_day(&task.due_date, today),
        }
    }

    /// Overwrite description and due date, recomputing the today flag.
    pub fn set_content(&mut self, description: &str, due_date: &str, today: NaiveDate) {
        self.description = description.to_string();
        self.due_date = due_date.to_string();
        self.is_today = is_on_day(due_date, today);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardViewModel {
    pub reference_day_name: String,
    pub reference_day_number: u32,
    pub harvests: Vec<UpcomingHarvest>,
    pub tasks: Vec<UpcomingTask>,
}

impl DashboardViewModel {
    /// A dashboard for `today` with nothing in either window.
    pub fn empty(today: NaiveDate) -> Self {
        Self {
            reference_day_name: day_name(today).to_string(),
            reference_day_number: today.day(),
            harvests: Vec::new(),
            tasks: Vec::new(),
        }
    }
}

/// A crop tagged with the name of its field, for the crop list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCrop {
    pub crop: Crop,
    pub field_name: String,
}

/// Everything shown on a single field's page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDetail {
    pub field: Field,
    pub crop: Option<Crop>,
    pub tasks: Vec<Task>,
    pub progress: Option<ProgressEntry>,
    pub days_until_harvest: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn field_without_crop_is_unknown() {
        let field = Field::new(1, "North");
        let combined = CombinedField::build(&field, None, ymd(2024, 5, 30));
        assert_eq!(combined.status, CropStatus::Unknown);
        assert_eq!(combined.crop_name, "");
        assert_eq!(combined.days_until_harvest, 0);
    }

    #[test]
    fn field_with_crop_gets_days_remaining() {
        let field = Field::new(1, "North");
        let mut crop = Crop::new(9, "Wheat", "2024-06-09");
        crop.status = CropStatus::Healthy;
        let combined = CombinedField::build(&field, Some(&crop), ymd(2024, 5, 30));
        assert_eq!(combined.status, CropStatus::Healthy);
        assert_eq!(combined.crop_name, "Wheat");
        assert_eq!(combined.days_until_harvest, 10);
    }

    #[test]
    fn upcoming_task_flags_today() {
        let today = ymd(2024, 6, 1);
        let mut row = UpcomingTask::build(&Task::new(5, 2, "Water", "2024-06-01T10:00:00"), "East", today);
        assert!(row.is_today);
        assert_eq!(row.field_name, "East");

        row.set_content("Fertilize", "2024-06-02", today);
        assert!(!row.is_today);
        assert_eq!(row.description, "Fertilize");
    }

    #[test]
    fn empty_dashboard_names_the_day() {
        let vm = DashboardViewModel::empty(ymd(2024, 5, 30));
        assert_eq!(vm.reference_day_name, "Thursday");
        assert_eq!(vm.reference_day_number, 30);
        assert!(vm.harvests.is_empty() && vm.tasks.is_empty());
    }
}
