//! HTTP collaborator: confirmed thresholds and period-scoped history.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::{
    domain::{HistoricalPoint, Period, ThresholdSet},
    error::ApiError,
    protocol::HistoryResponse,
};
use tracing::debug;
use url::Url;

#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn fetch_thresholds(&self) -> Result<ThresholdSet>;
    async fn fetch_history(&self, period: Period) -> Result<Vec<HistoricalPoint>>;
}

pub struct HttpDashboardApi {
    http: Client,
    base_url: Url,
}

impl HttpDashboardApi {
    pub fn new(server_url: &str) -> Result<Self> {
        let mut base_url =
            Url::parse(server_url).with_context(|| format!("invalid server url '{server_url}'"))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = self
            .base_url
            .join(path)
            .with_context(|| format!("invalid endpoint path '{path}'"))?;
        debug!(%url, ?query, "http: GET");
        let res = self
            .http
            .get(url.clone())
            .query(query)
            .send()
            .await
            .with_context(|| format!("failed to reach {url}"))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|err| err.error)
                .unwrap_or(body);
            return Err(anyhow!("GET {url} failed with {status}: {message}"));
        }

        res.json::<T>()
            .await
            .with_context(|| format!("invalid response body from {url}"))
    }
}

#[async_trait]
impl DashboardApi for HttpDashboardApi {
    async fn fetch_thresholds(&self) -> Result<ThresholdSet> {
        self.get_json("api/thresholds", &[]).await
    }

    async fn fetch_history(&self, period: Period) -> Result<Vec<HistoricalPoint>> {
        let body: HistoryResponse = self
            .get_json(
                "api/history",
                &[("period", period.as_str()), ("type", "all")],
            )
            .await?;
        Ok(body.data.unwrap_or_default())
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
