//! Calendar read/write port: the Google Calendar v3 events API.

use anyhow::{Context, Result};
use serde_json::Value;

use crate::project::EventPayload;
use crate::sync::CalendarOps;

pub struct GcalClient {
    client: reqwest::Client,
    access_token: String,
    calendar_id: String,
}

impl GcalClient {
    pub fn new(access_token: String, calendar_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token,
            calendar_id,
        }
    }

    fn events_url(&self) -> String {
        format!(
            "https://www.googleapis.com/calendar/v3/calendars/{}/events",
            self.calendar_id
        )
    }

    /// List raw events on the calendar since the given RFC 3339 lower bound.
    pub async fn list_events(&self, since: &str) -> Result<Vec<Value>> {
        let response = self
            .client
            .get(self.events_url())
            .bearer_auth(&self.access_token)
            .query(&[("timeMin", since)])
            .send()
            .await
            .context("Failed to fetch calendar events")?;
        let response = error_for_status(response, "Event listing failed").await?;

        let body: Value = response
            .json()
            .await
            .context("Failed to parse events response")?;

        Ok(body
            .get("items")
            .and_then(Value::as_array)
            .map(|items| items.to_vec())
            .unwrap_or_default())
    }
}

impl CalendarOps for GcalClient {
    async fn create(&self, payload: &EventPayload) -> Result<()> {
        let response = self
            .client
            .post(self.events_url())
            .bearer_auth(&self.access_token)
            .json(payload)
            .send()
            .await
            .context("Failed to send create request")?;
        let response = error_for_status(response, "Event creation failed").await?;

        let body: Value = response.json().await.unwrap_or(Value::Null);
        if let Some(link) = body.get("htmlLink").and_then(Value::as_str) {
            tracing::debug!(%link, "event created on calendar");
        }
        Ok(())
    }

    async fn update(&self, event_id: &str, payload: &EventPayload) -> Result<()> {
        let response = self
            .client
            .put(format!("{}/{}", self.events_url(), event_id))
            .bearer_auth(&self.access_token)
            .json(payload)
            .send()
            .await
            .context("Failed to send update request")?;
        error_for_status(response, "Event update failed").await?;
        Ok(())
    }

    async fn delete(&self, event_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/{}", self.events_url(), event_id))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("Failed to send delete request")?;
        error_for_status(response, "Event deletion failed").await?;
        Ok(())
    }
}

async fn error_for_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    anyhow::bail!("{}: HTTP {} - {}", what, status, body)
}
