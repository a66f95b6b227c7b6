//! Maps raw backend records onto canonical entities.
//!
//! The backend is inconsistent about key spelling (`dueDate` vs `due_date`,
//! `crop` vs `title`, ...). Each entity kind has a fixed priority list of
//! accepted keys per attribute; the first key holding a usable value wins.
//! Normalization never fails: missing values become empty strings, `None`
//! or an id of `0`, and later stages filter on dates and ids.

use serde_json::Value;

use super::crop::{Crop, CropStatus};
use super::field::Field;
use super::progress::ProgressEntry;
use super::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Field,
    Crop,
    Task,
    Progress,
}

/// A normalized record of any supported kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Field(Field),
    Crop(Crop),
    Task(Task),
    Progress(ProgressEntry),
}

pub fn normalize(kind: ResourceKind, raw: &Value) -> Resource {
    match kind {
        ResourceKind::Field => Resource::Field(normalize_field(raw)),
        ResourceKind::Crop => Resource::Crop(normalize_crop(raw)),
        ResourceKind::Task => Resource::Task(normalize_task(raw)),
        ResourceKind::Progress => Resource::Progress(normalize_progress(raw)),
    }
}

pub fn normalize_field(raw: &Value) -> Field {
    Field {
        id: first_id(raw, &["id"]).unwrap_or(0),
        name: first_str(raw, &["name", "title"]),
        image_url: first_str(raw, &["imageUrl", "image_url"]),
        user_id: first_id(raw, &["userId", "user_id"]),
        size: first_str(raw, &["fieldSize", "field_size"]),
        product: first_str(raw, &["product", "mainProduct"]),
        location: first_str(raw, &["location"]),
        progress_history_id: first_id(raw, &["progressHistoryId", "progress_history_id"]),
    }
}

pub fn normalize_crop(raw: &Value) -> Crop {
    Crop {
        id: first_id(raw, &["id"]).unwrap_or(0),
        field_id: first_id(raw, &["fieldId", "field"]),
        title: first_str(raw, &["crop", "title"]),
        planting_date: first_str(raw, &["plantingDate", "planting_date"]),
        harvest_date: first_str(raw, &["harvestDate", "harvest_date"]),
        status: CropStatus::from_label(&first_str(raw, &["status"])),
        soil_type: non_empty(first_str(raw, &["soilType", "soil_type"])),
        sunlight: non_empty(first_str(raw, &["sunlight", "sunlightExposure"])),
        watering: non_empty(first_str(raw, &["watering", "wateringPlan"])),
    }
}

pub fn normalize_task(raw: &Value) -> Task {
    Task {
        id: first_id(raw, &["id"]).unwrap_or(0),
        field_id: first_id(raw, &["fieldId", "field_id", "field"]),
        description: first_str(raw, &["description", "task", "name"]),
        due_date: first_str(raw, &["dueDate", "due_date"]),
    }
}

pub fn normalize_progress(raw: &Value) -> ProgressEntry {
    ProgressEntry {
        id: first_id(raw, &["id"]).unwrap_or(0),
        watered: first_str(raw, &["watered", "wateredDate"]),
        fertilized: first_str(raw, &["fertilized", "fertilizedDate"]),
        pests: first_str(raw, &["pests", "pestInspection"]),
    }
}

/// Normalize every element of a JSON array. Anything that isn't an array
/// yields an empty list.
pub fn normalize_list<T>(raw: &Value, f: impl Fn(&Value) -> T) -> Vec<T> {
    raw.as_array()
        .map(|items| items.iter().map(f).collect())
        .unwrap_or_default()
}

fn first_str(raw: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| match raw.get(*k)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .next()
        .unwrap_or_default()
}

fn first_id(raw: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter()
        .filter_map(|k| match raw.get(*k)? {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        })
        .find(|id| *id != 0)
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}
