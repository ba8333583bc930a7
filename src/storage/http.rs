//! HTTP-backed document store
//!
//! Talks to an object-storage HTTP API: `POST {base}/object/{bucket}/{path}`
//! with the raw bytes, public URLs under `{base}/object/public/...`.

use async_trait::async_trait;
use reqwest::Client;

use super::{DocumentStore, StorageError};

pub struct HttpDocumentStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpDocumentStore {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/object/public/{}/{}", self.base_url, bucket, path)
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let url = format!("{}/object/{}/{}", self.base_url, bucket, path);
        let mut request = self
            .client
            .post(&url)
            .header("content-type", content_type)
            .header("x-upsert", "true")
            .body(bytes);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;
        if !response.status().is_success() {
            return Err(StorageError::Upload(format!(
                "storage API returned {} for {}",
                response.status(),
                url
            )));
        }
        Ok(self.public_url(bucket, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_shape() {
        let store = HttpDocumentStore::new("https://store.example.com/".to_string(), None);
        assert_eq!(
            store.public_url("loan-documents", "abc/id_document"),
            "https://store.example.com/object/public/loan-documents/abc/id_document"
        );
    }
}
