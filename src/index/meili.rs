//! Meilisearch REST client

use crate::config::{IndexConfig, IndexCredentials};
use crate::index::{IndexService, IndexSettings, TaskHandle, TaskOutcome};
use crate::record::Record;
use crate::{IndexError, IndexResult};
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;
use url::Url;

/// [`IndexService`] speaking the Meilisearch HTTP API
#[derive(Debug, Clone)]
pub struct MeiliClient {
    client: Client,
    base: Url,
    api_key: String,
    poll_interval: Duration,
    task_timeout: Duration,
}

impl MeiliClient {
    /// Creates a client for the instance at `credentials.host`
    ///
    /// # Errors
    ///
    /// [`IndexError::Url`] when the host is not an absolute http(s) URL,
    /// [`IndexError::Http`] when the HTTP client cannot be built.
    pub fn new(credentials: &IndexCredentials, config: &IndexConfig) -> IndexResult<Self> {
        let base = Url::parse(&credentials.host)?;
        if base.cannot_be_a_base() {
            return Err(IndexError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base,
            api_key: credentials.api_key.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            task_timeout: Duration::from_millis(config.task_timeout_ms),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_task(&self, task_uid: u64) -> IndexResult<TaskOutcome> {
        let url = self.endpoint(&["tasks", &task_uid.to_string()]);
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Ok(check_status(&url, response).await?.json().await?)
    }
}

async fn check_status(url: &Url, response: Response) -> IndexResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(IndexError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl IndexService for MeiliClient {
    async fn submit_documents(&self, index_id: &str, records: &[Record]) -> IndexResult<TaskHandle> {
        let mut url = self.endpoint(&["indexes", index_id, "documents"]);
        url.query_pairs_mut().append_pair("primaryKey", "id");
        tracing::debug!("Submitting {} records to index '{}'", records.len(), index_id);

        let response = self
            .client
            .post(url.clone())
            .bearer_auth(&self.api_key)
            .json(records)
            .send()
            .await?;
        Ok(check_status(&url, response).await?.json().await?)
    }

    async fn await_task(&self, handle: TaskHandle) -> IndexResult<TaskOutcome> {
        let poll = async {
            loop {
                let outcome = self.get_task(handle.task_uid).await?;
                if outcome.status.is_terminal() {
                    return Ok::<_, IndexError>(outcome);
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        match tokio::time::timeout(self.task_timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(IndexError::TaskTimeout {
                task_uid: handle.task_uid,
                after: self.task_timeout,
            }),
        }
    }

    async fn configure_index(&self, index_id: &str, settings: &IndexSettings) -> IndexResult<TaskHandle> {
        let url = self.endpoint(&["indexes", index_id, "settings"]);
        let response = self
            .client
            .patch(url.clone())
            .bearer_auth(&self.api_key)
            .json(settings)
            .send()
            .await?;
        Ok(check_status(&url, response).await?.json().await?)
    }
}
