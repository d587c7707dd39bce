//! Webform delivery of mapped records.

use super::http_client::HttpClient;
use crate::error::{RelayError, Result};
use crate::extraction::field_mapper::MappedRecord;
use async_trait::async_trait;
use tracing::{info, warn};

/// Destination for mapped records.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Deliver one record. `Ok` means the destination accepted it.
    async fn post(&self, record: &MappedRecord) -> Result<()>;
}

/// Posts records as form-encoded bodies; only HTTP 200 counts as accepted.
#[derive(Debug, Clone)]
pub struct WebformClient {
    client: HttpClient,
    webform_url: String,
}

impl WebformClient {
    pub fn new(client: HttpClient, webform_url: &str) -> Self {
        Self {
            client,
            webform_url: webform_url.to_string(),
        }
    }
}

#[async_trait]
impl RecordSink for WebformClient {
    async fn post(&self, record: &MappedRecord) -> Result<()> {
        let resp = match self
            .client
            .post_form(&self.webform_url, &record.form_pairs())
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!("webform post failed: {e}");
                return Err(e);
            }
        };

        if resp.status == 200 {
            info!("record posted: {}", resp.text());
            Ok(())
        } else {
            let body = resp.text();
            warn!("webform returned {}: {body}", resp.status);
            Err(RelayError::PostFailure {
                status: resp.status,
                body,
            })
        }
    }
}
