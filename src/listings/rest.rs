use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::json;

use super::domain::{Listing, ListingId, PhotoCaption};
use super::repository::{ListingPatch, ListingRepository, NewListing, RepositoryError};
use super::storage::{PhotoStore, PhotoStoreError};

/// Shared connection details for the managed backend's row and object
/// endpoints. Each call authenticates with the service key; the backend
/// enforces row ownership on its side.
pub struct RestBackend {
    base_url: String,
    service_key: String,
    client: reqwest::Client,
}

impl RestBackend {
    pub fn new(base_url: String, service_key: String) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            client,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, key)
    }

    fn bucket_url(&self, bucket: &str) -> String {
        format!("{}/storage/v1/object/{}", self.base_url, bucket)
    }

    fn public_object_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, key
        )
    }
}

/// Listing and caption rows accessed through the backend's REST surface.
pub struct RestDataStore {
    backend: Arc<RestBackend>,
}

impl RestDataStore {
    pub fn new(backend: Arc<RestBackend>) -> Self {
        Self { backend }
    }

    async fn expect_rows<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Vec<T>, RepositoryError> {
        let status = response.status();
        if status == StatusCode::CONFLICT {
            return Err(RepositoryError::Conflict);
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RepositoryError::Unavailable(format!(
                "status {status}: {detail}"
            )));
        }

        response
            .json()
            .await
            .map_err(|err| RepositoryError::Unavailable(err.to_string()))
    }

    async fn expect_ok(response: reqwest::Response) -> Result<(), RepositoryError> {
        let status = response.status();
        if status == StatusCode::CONFLICT {
            return Err(RepositoryError::Conflict);
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RepositoryError::Unavailable(format!(
                "status {status}: {detail}"
            )));
        }
        Ok(())
    }

    fn in_filter(values: &[String]) -> String {
        let quoted: Vec<String> = values.iter().map(|value| format!("\"{value}\"")).collect();
        format!("in.({})", quoted.join(","))
    }

    fn send_error(err: reqwest::Error) -> RepositoryError {
        RepositoryError::Unavailable(err.to_string())
    }
}

#[async_trait]
impl ListingRepository for RestDataStore {
    async fn insert_listing(&self, listing: NewListing) -> Result<Listing, RepositoryError> {
        let response = self
            .backend
            .authorize(self.backend.client.post(self.backend.table_url("listings")))
            .header("Prefer", "return=representation")
            .json(&listing)
            .send()
            .await
            .map_err(Self::send_error)?;

        let mut rows: Vec<Listing> = Self::expect_rows(response).await?;
        rows.pop()
            .ok_or_else(|| RepositoryError::Unavailable("insert returned no row".to_string()))
    }

    async fn update_listing(
        &self,
        id: &ListingId,
        patch: ListingPatch,
    ) -> Result<(), RepositoryError> {
        let response = self
            .backend
            .authorize(self.backend.client.patch(self.backend.table_url("listings")))
            .query(&[("id", format!("eq.{}", id.0))])
            .json(&patch)
            .send()
            .await
            .map_err(Self::send_error)?;

        Self::expect_ok(response).await
    }

    async fn fetch_listing(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        let response = self
            .backend
            .authorize(self.backend.client.get(self.backend.table_url("listings")))
            .query(&[("id", format!("eq.{}", id.0)), ("select", "*".to_string())])
            .send()
            .await
            .map_err(Self::send_error)?;

        let mut rows: Vec<Listing> = Self::expect_rows(response).await?;
        Ok(rows.pop())
    }

    async fn set_archived(&self, id: &ListingId, archived: bool) -> Result<(), RepositoryError> {
        let response = self
            .backend
            .authorize(self.backend.client.patch(self.backend.table_url("listings")))
            .query(&[("id", format!("eq.{}", id.0))])
            .json(&json!({ "archived": archived }))
            .send()
            .await
            .map_err(Self::send_error)?;

        Self::expect_ok(response).await
    }

    async fn delete_listing(&self, id: &ListingId) -> Result<(), RepositoryError> {
        let response = self
            .backend
            .authorize(self.backend.client.delete(self.backend.table_url("listings")))
            .query(&[("id", format!("eq.{}", id.0))])
            .send()
            .await
            .map_err(Self::send_error)?;

        Self::expect_ok(response).await
    }

    async fn insert_captions(&self, captions: Vec<PhotoCaption>) -> Result<(), RepositoryError> {
        if captions.is_empty() {
            return Ok(());
        }

        let response = self
            .backend
            .authorize(
                self.backend
                    .client
                    .post(self.backend.table_url("photo_captions")),
            )
            .json(&captions)
            .send()
            .await
            .map_err(Self::send_error)?;

        Self::expect_ok(response).await
    }

    async fn delete_captions(&self, image_paths: &[String]) -> Result<(), RepositoryError> {
        if image_paths.is_empty() {
            return Ok(());
        }

        let response = self
            .backend
            .authorize(
                self.backend
                    .client
                    .delete(self.backend.table_url("photo_captions")),
            )
            .query(&[("image_path", Self::in_filter(image_paths))])
            .send()
            .await
            .map_err(Self::send_error)?;

        Self::expect_ok(response).await
    }

    async fn captions_for(
        &self,
        image_paths: &[String],
    ) -> Result<Vec<PhotoCaption>, RepositoryError> {
        if image_paths.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .backend
            .authorize(
                self.backend
                    .client
                    .get(self.backend.table_url("photo_captions")),
            )
            .query(&[
                ("image_path", Self::in_filter(image_paths)),
                ("select", "*".to_string()),
            ])
            .send()
            .await
            .map_err(Self::send_error)?;

        Self::expect_rows(response).await
    }
}

/// Listing photos stored in the backend's object storage bucket.
pub struct RestPhotoStore {
    backend: Arc<RestBackend>,
    bucket: String,
}

impl RestPhotoStore {
    pub fn new(backend: Arc<RestBackend>, bucket: String) -> Self {
        Self { backend, bucket }
    }
}

#[async_trait]
impl PhotoStore for RestPhotoStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<String, PhotoStoreError> {
        let response = self
            .backend
            .authorize(
                self.backend
                    .client
                    .post(self.backend.object_url(&self.bucket, key)),
            )
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|err| PhotoStoreError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PhotoStoreError::Rejected(format!(
                "status {status}: {detail}"
            )));
        }

        Ok(key.to_string())
    }

    async fn remove(&self, keys: &[String]) -> Result<(), PhotoStoreError> {
        if keys.is_empty() {
            return Ok(());
        }

        let response = self
            .backend
            .authorize(
                self.backend
                    .client
                    .delete(self.backend.bucket_url(&self.bucket)),
            )
            .json(&json!({ "prefixes": keys }))
            .send()
            .await
            .map_err(|err| PhotoStoreError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PhotoStoreError::Transport(format!("status {status}")));
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        self.backend.public_object_url(&self.bucket, key)
    }
}
