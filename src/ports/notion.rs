//! Document-store read port: the Notion database query API.

use anyhow::{Context, Result};
use serde_json::Value;

const NOTION_VERSION: &str = "2022-06-28";

pub struct NotionClient {
    client: reqwest::Client,
    api_key: String,
    database_id: String,
}

impl NotionClient {
    pub fn new(api_key: String, database_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            database_id,
        }
    }

    /// Query every row of the configured database, returned raw.
    pub async fn query_database(&self) -> Result<Vec<Value>> {
        let url = format!(
            "https://api.notion.com/v1/databases/{}/query",
            self.database_id
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await
            .context("Failed to query Notion database")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Notion query failed: HTTP {} - {}", status, body);
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to parse Notion response")?;

        let results = body
            .get("results")
            .and_then(Value::as_array)
            .context("No results in Notion response")?;

        Ok(results.to_vec())
    }
}
