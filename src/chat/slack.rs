//! Slack channel — calls the Web API over HTTPS.
//!
//! Uses plain `reqwest` against the Web API methods the bot needs
//! (chat.postMessage, chat.update, conversations.open, users.info,
//! files.upload). Slack reports failures in-band via the `ok` field,
//! so every call checks both the HTTP status and the envelope.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};

use crate::chat::{ChatClient, UserInfo};
use crate::error::ChatError;

const SLACK_API_BASE: &str = "https://slack.com/api";

/// Conservative per-call timeout; the Web API has none specified, and a
/// hung call would otherwise stall the whole event task.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Slack Web API client.
pub struct SlackClient {
    bot_token: SecretString,
    client: reqwest::Client,
}

impl SlackClient {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{SLACK_API_BASE}/{method}")
    }

    /// POST a JSON body to a Web API method and return the parsed
    /// envelope after checking `ok`.
    async fn call(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, ChatError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .bearer_auth(self.bot_token.expose_secret())
            .timeout(CALL_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Http(e.to_string()))?;

        let status = resp.status();
        let envelope: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ChatError::Api {
                method: method.to_string(),
                reason: format!("invalid response body ({status}): {e}"),
            })?;

        if !envelope["ok"].as_bool().unwrap_or(false) {
            let reason = envelope["error"].as_str().unwrap_or("unknown error");
            return Err(ChatError::Api {
                method: method.to_string(),
                reason: reason.to_string(),
            });
        }

        Ok(envelope)
    }
}

#[async_trait]
impl ChatClient for SlackClient {
    async fn post_message(&self, channel: &str, text: &str) -> Result<String, ChatError> {
        let envelope = self
            .call(
                "chat.postMessage",
                serde_json::json!({
                    "channel": channel,
                    "text": text,
                    "mrkdwn": true,
                }),
            )
            .await?;
        Ok(envelope["ts"].as_str().unwrap_or_default().to_string())
    }

    async fn update_message(
        &self,
        channel: &str,
        message_ts: &str,
        text: &str,
    ) -> Result<(), ChatError> {
        self.call(
            "chat.update",
            serde_json::json!({
                "channel": channel,
                "ts": message_ts,
                "text": text,
            }),
        )
        .await?;
        Ok(())
    }

    async fn open_dm(&self, user_id: &str) -> Result<String, ChatError> {
        let envelope = self
            .call(
                "conversations.open",
                serde_json::json!({ "users": user_id }),
            )
            .await?;
        envelope["channel"]["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ChatError::Api {
                method: "conversations.open".to_string(),
                reason: "response missing channel id".to_string(),
            })
    }

    async fn user_info(&self, user_id: &str) -> Result<UserInfo, ChatError> {
        let envelope = self
            .call("users.info", serde_json::json!({ "user": user_id }))
            .await?;

        let user = &envelope["user"];
        let name = user["real_name"]
            .as_str()
            .filter(|s| !s.is_empty())
            .or_else(|| user["name"].as_str())
            .unwrap_or_default()
            .to_string();
        let email = user["profile"]["email"].as_str().unwrap_or_default();

        Ok(UserInfo {
            id: user_id.to_string(),
            name,
            email: email.to_string(),
        })
    }

    async fn upload_file(
        &self,
        channel: &str,
        filename: &str,
        bytes: Vec<u8>,
        comment: &str,
    ) -> Result<(), ChatError> {
        let part = Part::bytes(bytes).file_name(filename.to_string());
        let form = Form::new()
            .part("file", part)
            .text("channels", channel.to_string())
            .text("initial_comment", comment.to_string());

        let resp = self
            .client
            .post(self.api_url("files.upload"))
            .bearer_auth(self.bot_token.expose_secret())
            .timeout(CALL_TIMEOUT)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ChatError::SendFailed {
                method: "files.upload".to_string(),
                reason: e.to_string(),
            })?;

        let envelope: serde_json::Value =
            resp.json().await.map_err(|e| ChatError::SendFailed {
                method: "files.upload".to_string(),
                reason: e.to_string(),
            })?;

        if !envelope["ok"].as_bool().unwrap_or(false) {
            return Err(ChatError::SendFailed {
                method: "files.upload".to_string(),
                reason: envelope["error"]
                    .as_str()
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        Ok(())
    }
}
