//! HTTP access for pages and images.
//!
//! A single [`HttpClient`] is built per run and cloned into every task; the
//! underlying `reqwest::Client` shares its connection pool across clones.

use crate::config::FetchConfig;
use crate::error::{HarvestError, Result};
use crate::models::FetchTask;
use reqwest::{Client, Response};
use std::time::Duration;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: u64,
}

impl HttpClient {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client, timeout: config.timeout_secs })
    }

    /// GET `url` and return the body as text.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.get(url).await?;
        let body = response.text().await.map_err(|e| self.classify(url, e))?;
        debug!(bytes = body.len(), "Fetched page");
        Ok(body)
    }

    /// Stream `task.target_url` into `task.save_path`, returning the byte count.
    ///
    /// If the transfer fails midway the partial file is removed.
    #[instrument(level = "debug", skip_all, fields(task = task.id, url = %task.target_url))]
    pub async fn download(&self, task: &FetchTask) -> Result<u64> {
        let response = self.get(&task.target_url).await?;
        match self.write_body(response, task).await {
            Ok(written) => {
                debug!(bytes = written, path = %task.save_path.display(), "Saved media");
                Ok(written)
            }
            Err(e) => {
                if let Err(rm) = fs::remove_file(&task.save_path).await {
                    warn!(path = %task.save_path.display(), error = %rm, "Could not remove partial file");
                }
                Err(e)
            }
        }
    }

    async fn write_body(&self, mut response: Response, task: &FetchTask) -> Result<u64> {
        let mut file = File::create(&task.save_path).await?;
        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.classify(&task.target_url, e))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }

    async fn get(&self, url: &str) -> Result<Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Status { url: url.to_string(), status: status.as_u16() });
        }
        Ok(response)
    }

    fn classify(&self, url: &str, err: reqwest::Error) -> HarvestError {
        if err.is_timeout() {
            HarvestError::Timeout { url: url.to_string(), timeout: self.timeout }
        } else {
            HarvestError::Http(err)
        }
    }
}
