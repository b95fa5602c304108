//! Google Calendar adapter — shared-calendar ACL management.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::CalendarConfig;
use crate::error::CalendarError;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Access level on a shared calendar. Closed set; the workflow only
/// ever grants from this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Can see event details.
    Reader,
    /// Can create, edit, and delete events.
    Writer,
    /// Full control.
    Owner,
}

impl Permission {
    pub fn as_role(&self) -> &'static str {
        match self {
            Self::Reader => "reader",
            Self::Writer => "writer",
            Self::Owner => "owner",
        }
    }

    /// Human wording used in admin-facing messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Reader => "Read-only",
            Self::Writer => "Edit",
            Self::Owner => "Owner",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_role())
    }
}

/// Shared-calendar ACL operations the workflow needs.
#[async_trait]
pub trait CalendarAdapter: Send + Sync {
    /// Grant `email` the given permission on a named calendar.
    async fn share(
        &self,
        calendar: &str,
        email: &str,
        permission: Permission,
    ) -> Result<(), CalendarError>;

    /// Remove `email`'s access to a named calendar. Removing an absent
    /// grant is a no-op, not an error.
    async fn revoke(&self, calendar: &str, email: &str) -> Result<(), CalendarError>;
}

/// Share several calendars with one address. Each calendar is attempted
/// independently; one failure never blocks the others.
pub async fn share_many(
    adapter: &dyn CalendarAdapter,
    email: &str,
    grants: &[(String, Permission)],
) -> Vec<(String, Result<(), CalendarError>)> {
    let attempts = grants.iter().map(|(name, permission)| async move {
        let result = adapter.share(name, email, *permission).await;
        (name.clone(), result)
    });
    join_all(attempts).await
}

/// Google Calendar v3 implementation over the ACL endpoints.
pub struct GoogleCalendar {
    api_token: SecretString,
    /// Calendar name -> calendar id.
    calendars: HashMap<String, String>,
    client: reqwest::Client,
}

impl GoogleCalendar {
    pub fn new(config: &CalendarConfig) -> Self {
        Self {
            api_token: config.api_token.clone(),
            calendars: config.calendars.iter().cloned().collect(),
            client: reqwest::Client::new(),
        }
    }

    fn calendar_id(&self, name: &str) -> Result<&str, CalendarError> {
        self.calendars
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| CalendarError::NotConfigured(name.to_string()))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{CALENDAR_API_BASE}{path}"))
            .bearer_auth(self.api_token.expose_secret())
            .timeout(CALL_TIMEOUT)
    }
}

#[derive(Debug, Deserialize)]
struct AclRule {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    scope: Option<AclScope>,
}

#[derive(Debug, Deserialize)]
struct AclScope {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AclList {
    #[serde(default)]
    items: Vec<AclRule>,
}

#[async_trait]
impl CalendarAdapter for GoogleCalendar {
    async fn share(
        &self,
        calendar: &str,
        email: &str,
        permission: Permission,
    ) -> Result<(), CalendarError> {
        let calendar_id = self.calendar_id(calendar)?;

        let resp = self
            .request(
                reqwest::Method::POST,
                &format!("/calendars/{calendar_id}/acl?sendNotifications=true"),
            )
            .json(&serde_json::json!({
                "role": permission.as_role(),
                "scope": { "type": "user", "value": email },
            }))
            .send()
            .await
            .map_err(|e| CalendarError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CalendarError::Api {
                calendar: calendar.to_string(),
                reason: format!("{status}: {body}"),
            });
        }

        tracing::info!(calendar = %calendar, email = %email, role = %permission, "Shared calendar");
        Ok(())
    }

    async fn revoke(&self, calendar: &str, email: &str) -> Result<(), CalendarError> {
        let calendar_id = self.calendar_id(calendar)?;

        // Find the ACL rule id for this address first.
        let resp = self
            .request(
                reqwest::Method::GET,
                &format!("/calendars/{calendar_id}/acl"),
            )
            .send()
            .await
            .map_err(|e| CalendarError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CalendarError::Api {
                calendar: calendar.to_string(),
                reason: format!("{status}: {body}"),
            });
        }

        let acl: AclList = resp
            .json()
            .await
            .map_err(|e| CalendarError::Http(e.to_string()))?;

        let rule_id = acl.items.into_iter().find_map(|rule| {
            let scope = rule.scope?;
            (scope.kind == "user" && scope.value == email).then_some(rule.id).flatten()
        });

        // No grant means nothing to remove.
        let Some(rule_id) = rule_id else {
            return Ok(());
        };

        let resp = self
            .request(
                reqwest::Method::DELETE,
                &format!("/calendars/{calendar_id}/acl/{rule_id}"),
            )
            .send()
            .await
            .map_err(|e| CalendarError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CalendarError::Api {
                calendar: calendar.to_string(),
                reason: format!("{status}: {body}"),
            });
        }

        tracing::info!(calendar = %calendar, email = %email, "Revoked calendar access");
        Ok(())
    }
}
