use std::time::Duration;

use leadgen_core::error::AppError;
use leadgen_core::traits::SheetSink;
use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::fetcher::classify;

const DEFAULT_SHEET_TIMEOUT: Duration = Duration::from_secs(60);

/// Posts result files to a Google Apps Script web app, one sheet per file.
///
/// Only a 2xx answer counts as delivered; anything else leaves the file
/// for the next sync cycle.
#[derive(Clone)]
pub struct AppsScriptSink {
    client: Client,
    url: Url,
    timeout_secs: u64,
}

impl AppsScriptSink {
    pub fn new(url: Url) -> Result<Self, AppError> {
        Self::with_timeout(url, DEFAULT_SHEET_TIMEOUT)
    }

    pub fn with_timeout(url: Url, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            url,
            timeout_secs: timeout.as_secs(),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SheetPayload<'a> {
    sheet_name: &'a str,
    data: &'a serde_json::Value,
}

impl SheetSink for AppsScriptSink {
    async fn forward(&self, sheet_name: &str, data: &serde_json::Value) -> Result<(), AppError> {
        let payload = SheetPayload { sheet_name, data };

        let response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| classify(e, self.timeout_secs))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(AppError::SheetError(format!(
                "HTTP {} for sheet {}: {}",
                status.as_u16(),
                sheet_name,
                body.chars().take(200).collect::<String>()
            )));
        }

        tracing::debug!(sheet = %sheet_name, response = %body, "Sheet endpoint answered");
        Ok(())
    }
}
