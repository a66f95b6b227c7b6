use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CropStatus {
    Healthy,
    Attention,
    Critical,
    /// No crop joined, or the backend sent a label we don't know.
    #[default]
    Unknown,
}

impl CropStatus {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::Attention => "Attention",
            Self::Critical => "Critical",
            Self::Unknown => "Unknown",
        }
    }

    pub fn from_label(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "healthy" => Self::Healthy,
            "attention" => Self::Attention,
            "critical" => Self::Critical,
            _ => Self::Unknown,
        }
    }
}

/// A planting/harvest record tied to one field.
///
/// Dates are kept as the raw strings the backend sent so that a record with
/// an unparsable date still shows up in unwindowed views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crop {
    pub id: i64,
    pub field_id: Option<i64>,
    pub title: String,
    pub planting_date: String,
    pub harvest_date: String,
    pub status: CropStatus,
    pub soil_type: Option<String>,
    pub sunlight: Option<String>,
    pub watering: Option<String>,
}

impl Crop {
    pub fn new(id: i64, title: impl Into<String>, harvest_date: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            harvest_date: harvest_date.into(),
            ..Self::default()
        }
    }

    /// Apply server-confirmed values over this crop. Non-empty server values
    /// win; empty ones keep what we already had.
    pub fn reconcile(&mut self, server: &Crop) {
        if server.id != 0 {
            self.id = server.id;
        }
        if server.field_id.is_some() {
            self.field_id = server.field_id;
        }
        if !server.title.is_empty() {
            self.title = server.title.clone();
        }
        if !server.planting_date.is_empty() {
            self.planting_date = server.planting_date.clone();
        }
        if !server.harvest_date.is_empty() {
            self.harvest_date = server.harvest_date.clone();
        }
        if server.status != CropStatus::Unknown {
            self.status = server.status;
        }
        if server.soil_type.is_some() {
            self.soil_type = server.soil_type.clone();
        }
        if server.sunlight.is_some() {
            self.sunlight = server.sunlight.clone();
        }
        if server.watering.is_some() {
            self.watering = server.watering.clone();
        }
    }
}
