use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::{Value, json};

use crate::config::FieldbookConfig;
use crate::core::crop::Crop;
use crate::core::field::Field;
use crate::core::normalize::{
    normalize_crop, normalize_field, normalize_list, normalize_progress, normalize_task,
};
use crate::core::progress::ProgressEntry;
use crate::core::task::{Task, TaskPayload};

use super::backend::Backend;
use super::error::{Result, SyncError};

/// REST client for the fields/crops/tasks backend.
#[derive(Clone)]
pub struct HttpBackend {
    fields_url: String,
    crops_url: String,
    tasks_url: String,
    progress_url: String,
    token: Option<String>,
    http: Client,
}

impl HttpBackend {
    pub fn new(config: &FieldbookConfig) -> Result<Self> {
        let http = Client::builder().build().map_err(SyncError::Client)?;
        Ok(Self {
            fields_url: config.fields_url(),
            crops_url: config.crops_url(),
            tasks_url: config.tasks_url(),
            progress_url: config.progress_url(),
            token: config.api_token.clone().filter(|t| !t.is_empty()),
            http,
        })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, url: &str) -> Result<Response> {
        log::debug!("Backend request: {}", url);
        builder.send().await.map_err(|source| SyncError::Request {
            url: url.to_string(),
            source,
        })
    }

    /// Read a JSON body. An empty body reads as `null`.
    async fn read_json(resp: Response, url: &str) -> Result<Value> {
        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::status(url, status));
        }
        let text = resp.text().await.map_err(|source| SyncError::Request {
            url: url.to_string(),
            source,
        })?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|source| SyncError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let resp = self.send(self.request(Method::GET, url), url).await?;
        Self::read_json(resp, url).await
    }

    /// GET where 404 and an empty body both mean "nothing there".
    async fn get_optional_json(&self, url: &str) -> Result<Option<Value>> {
        let resp = self.send(self.request(Method::GET, url), url).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let value = Self::read_json(resp, url).await?;
        Ok((!value.is_null()).then_some(value))
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let resp = self.send(self.request(Method::DELETE, url), url).await?;
        if !resp.status().is_success() {
            return Err(SyncError::status(url, resp.status()));
        }
        Ok(())
    }
}

/// Body for `PUT /crop-fields/{id}`.
fn crop_payload(crop: &Crop) -> Value {
    json!({
        "crop": crop.title,
        "status": crop.status.as_label(),
        "plantingDate": crop.planting_date,
        "harvestDate": crop.harvest_date,
        "soilType": crop.soil_type,
        "sunlight": crop.sunlight,
        "watering": crop.watering,
    })
}

impl Backend for HttpBackend {
    async fn list_fields_by_user(&self, user_id: i64) -> Result<Vec<Field>> {
        let url = format!("{}/user/{}", self.fields_url, user_id);
        let raw = self.get_json(&url).await?;
        Ok(normalize_list(&raw, normalize_field))
    }

    async fn get_field(&self, field_id: i64) -> Result<Field> {
        let url = format!("{}/{}", self.fields_url, field_id);
        let raw = self.get_json(&url).await?;
        Ok(normalize_field(&raw))
    }

    async fn get_crop_by_field(&self, field_id: i64) -> Result<Option<Crop>> {
        let url = format!("{}/field/{}", self.crops_url, field_id);
        let Some(raw) = self.get_optional_json(&url).await? else {
            return Ok(None);
        };
        // At most one active crop per field; if the backend sends a list we
        // take the first entry.
        let crop = match &raw {
            Value::Array(items) => {
                if items.len() > 1 {
                    log::debug!("Field {} has {} crops, using the first", field_id, items.len());
                }
                items.first().map(normalize_crop)
            }
            other => Some(normalize_crop(other)),
        };
        Ok(crop)
    }

    async fn list_tasks_by_field(&self, field_id: i64) -> Result<Vec<Task>> {
        let url = format!("{}/field/{}", self.tasks_url, field_id);
        let raw = self.get_json(&url).await?;
        Ok(normalize_list(&raw, normalize_task))
    }

    async fn get_progress(&self, progress_id: i64) -> Result<Option<ProgressEntry>> {
        let url = format!("{}/{}", self.progress_url, progress_id);
        let raw = self.get_optional_json(&url).await?;
        Ok(raw.as_ref().map(normalize_progress))
    }

    async fn create_task(&self, payload: &TaskPayload) -> Result<Task> {
        let url = self.tasks_url.clone();
        let resp = self
            .send(self.request(Method::POST, &url).json(payload), &url)
            .await?;
        let raw = Self::read_json(resp, &url).await?;
        Ok(normalize_task(&raw))
    }

    async fn update_task(&self, id: i64, payload: &TaskPayload) -> Result<Task> {
        let url = format!("{}/{}", self.tasks_url, id);
        let resp = self
            .send(self.request(Method::PUT, &url).json(payload), &url)
            .await?;
        let raw = Self::read_json(resp, &url).await?;
        Ok(normalize_task(&raw))
    }

    async fn delete_task(&self, id: i64) -> Result<()> {
        self.delete(&format!("{}/{}", self.tasks_url, id)).await
    }

    async fn update_crop(&self, crop: &Crop) -> Result<Crop> {
        let url = format!("{}/{}", self.crops_url, crop.id);
        let resp = self
            .send(self.request(Method::PUT, &url).json(&crop_payload(crop)), &url)
            .await?;
        let raw = Self::read_json(resp, &url).await?;
        Ok(normalize_crop(&raw))
    }

    async fn delete_crop(&self, id: i64) -> Result<()> {
        self.delete(&format!("{}/{}", self.crops_url, id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::crop::CropStatus;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer, token: Option<&str>) -> HttpBackend {
        let config = FieldbookConfig {
            base_url: format!("{}/api/v1", server.uri()),
            api_token: token.map(str::to_string),
            ..FieldbookConfig::default()
        };
        HttpBackend::new(&config).unwrap()
    }

    #[tokio::test]
    async fn lists_fields_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/fields/user/7"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "name": "North", "imageUrl": "n.png", "userId": 7 },
                { "id": 2, "name": "South", "image_url": "s.png" }
            ])))
            .mount(&server)
            .await;

        let fields = backend_for(&server, Some("secret"))
            .list_fields_by_user(7)
            .await
            .unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].image_url, "n.png");
        assert_eq!(fields[1].image_url, "s.png");
    }

    #[tokio::test]
    async fn missing_crop_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/crop-fields/field/3"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/crop-fields/field/4"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let backend = backend_for(&server, None);
        assert_eq!(backend.get_crop_by_field(3).await.unwrap(), None);
        assert_eq!(backend.get_crop_by_field(4).await.unwrap(), None);
    }

    #[tokio::test]
    async fn crop_list_response_takes_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/crop-fields/field/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 10, "crop": "Beans", "harvestDate": "2024-07-01", "status": "Healthy" },
                { "id": 11, "crop": "Peas", "harvestDate": "2024-08-01" }
            ])))
            .mount(&server)
            .await;

        let crop = backend_for(&server, None).get_crop_by_field(5).await.unwrap().unwrap();
        assert_eq!(crop.id, 10);
        assert_eq!(crop.title, "Beans");
        assert_eq!(crop.status, CropStatus::Healthy);
    }

    #[tokio::test]
    async fn server_error_is_reported_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/tasks/field/2"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = backend_for(&server, None).list_tasks_by_field(2).await.unwrap_err();
        assert!(matches!(err, SyncError::Status { status, .. } if status == StatusCode::SERVICE_UNAVAILABLE));
    }

    #[tokio::test]
    async fn update_task_sends_camel_case_payload() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/v1/tasks/5"))
            .and(body_json(json!({
                "fieldId": 2,
                "description": "Fertilize",
                "dueDate": "2024-06-01T00:00:00"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 5, "fieldId": 2, "description": "Fertilize", "due_date": "2024-06-01T00:00:00"
            })))
            .mount(&server)
            .await;

        let payload = TaskPayload {
            field_id: 2,
            description: "Fertilize".into(),
            due_date: "2024-06-01T00:00:00".into(),
        };
        let task = backend_for(&server, None).update_task(5, &payload).await.unwrap();
        assert_eq!(task.due_date, "2024-06-01T00:00:00");
        assert_eq!(task.field_id, Some(2));
    }

    #[tokio::test]
    async fn update_crop_sends_crop_payload() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/v1/crop-fields/9"))
            .and(body_json(json!({
                "crop": "Rye",
                "status": "Attention",
                "plantingDate": "2024-03-01",
                "harvestDate": "2024-09-01",
                "soilType": null,
                "sunlight": "Partial",
                "watering": null
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 9, "crop": "Rye", "status": "Attention", "harvestDate": "2024-09-01"
            })))
            .mount(&server)
            .await;

        let mut crop = Crop::new(9, "Rye", "2024-09-01");
        crop.planting_date = "2024-03-01".into();
        crop.status = CropStatus::Attention;
        crop.sunlight = Some("Partial".into());

        let updated = backend_for(&server, None).update_crop(&crop).await.unwrap();
        assert_eq!(updated.title, "Rye");
        assert_eq!(updated.status, CropStatus::Attention);
    }

    #[tokio::test]
    async fn delete_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/tasks/5"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/crop-fields/9"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let backend = backend_for(&server, None);
        assert!(backend.delete_task(5).await.is_err());
        assert!(backend.delete_crop(9).await.is_ok());
    }
}
