//! GitHub organization adapter — membership, teams, and invitations.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::OrgConfig;
use crate::error::OrgError;

const GITHUB_API_BASE: &str = "https://api.github.com";

/// Per-call timeout; none is specified by the API contract.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// A team in the organization.
#[derive(Debug, Clone, Deserialize)]
pub struct Team {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A pending organization invitation.
#[derive(Debug, Clone, Deserialize)]
pub struct PendingInvitation {
    pub id: u64,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Membership role granted on invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgRole {
    DirectMember,
    Admin,
}

impl OrgRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectMember => "direct_member",
            Self::Admin => "admin",
        }
    }
}

/// Organization-membership operations the workflow needs.
#[async_trait]
pub trait OrgAdapter: Send + Sync {
    /// Check that a handle exists on the platform.
    async fn validate_handle(&self, handle: &str) -> Result<(), OrgError>;

    /// List the organization's teams.
    async fn list_teams(&self) -> Result<Vec<Team>, OrgError>;

    /// Whether the handle is already an org member.
    async fn is_member(&self, handle: &str) -> Result<bool, OrgError>;

    /// Invite a handle to the org and the given teams.
    ///
    /// Idempotent for existing members: they are added to the teams
    /// instead of a second invitation erroring out.
    async fn invite(&self, handle: &str, team_ids: &[u64], role: OrgRole) -> Result<(), OrgError>;

    /// Remove a member from the organization.
    async fn remove(&self, handle: &str) -> Result<(), OrgError>;

    /// List invitations that have not been accepted yet.
    async fn pending_invitations(&self) -> Result<Vec<PendingInvitation>, OrgError>;
}

/// GitHub REST implementation.
pub struct GithubOrg {
    token: SecretString,
    org: String,
    client: reqwest::Client,
}

impl GithubOrg {
    pub fn new(config: &OrgConfig) -> Self {
        Self {
            token: config.token.clone(),
            org: config.org.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{GITHUB_API_BASE}{path}"))
            .bearer_auth(self.token.expose_secret())
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "lab-concierge")
            .timeout(CALL_TIMEOUT)
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, OrgError> {
        builder
            .send()
            .await
            .map_err(|e| OrgError::Http(e.to_string()))
    }

    /// Look up a user's numeric id (needed by the invitations endpoint).
    async fn user_id(&self, handle: &str) -> Result<u64, OrgError> {
        let resp = self
            .send(self.request(reqwest::Method::GET, &format!("/users/{handle}")))
            .await?;

        if resp.status().as_u16() == 404 {
            return Err(OrgError::HandleNotFound(handle.to_string()));
        }
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }

        #[derive(Deserialize)]
        struct User {
            id: u64,
        }
        let user: User = resp
            .json()
            .await
            .map_err(|e| OrgError::Http(e.to_string()))?;
        Ok(user.id)
    }

    /// Resolve team ids to slugs via the team listing.
    async fn team_slugs(&self, team_ids: &[u64]) -> Result<Vec<String>, OrgError> {
        let teams = self.list_teams().await?;
        Ok(teams
            .into_iter()
            .filter(|t| team_ids.contains(&t.id))
            .map(|t| t.slug)
            .collect())
    }
}

async fn api_error(resp: reqwest::Response) -> OrgError {
    let status = resp.status().as_u16();
    let reason = resp.text().await.unwrap_or_default();
    OrgError::Api { status, reason }
}

#[async_trait]
impl OrgAdapter for GithubOrg {
    async fn validate_handle(&self, handle: &str) -> Result<(), OrgError> {
        self.user_id(handle).await?;
        tracing::info!(handle = %handle, "Validated GitHub handle");
        Ok(())
    }

    async fn list_teams(&self) -> Result<Vec<Team>, OrgError> {
        let org = &self.org;
        let resp = self
            .send(self.request(
                reqwest::Method::GET,
                &format!("/orgs/{org}/teams?per_page=100"),
            ))
            .await?;

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        resp.json().await.map_err(|e| OrgError::Http(e.to_string()))
    }

    async fn is_member(&self, handle: &str) -> Result<bool, OrgError> {
        let org = &self.org;
        let resp = self
            .send(self.request(
                reqwest::Method::GET,
                &format!("/orgs/{org}/members/{handle}"),
            ))
            .await?;

        match resp.status().as_u16() {
            204 => Ok(true),
            302 | 404 => Ok(false),
            _ => Err(api_error(resp).await),
        }
    }

    async fn invite(&self, handle: &str, team_ids: &[u64], role: OrgRole) -> Result<(), OrgError> {
        let org = &self.org;

        // Existing members just get added to the selected teams.
        if self.is_member(handle).await? {
            tracing::info!(handle = %handle, org = %org, "Already a member; adding to teams");
            for slug in self.team_slugs(team_ids).await? {
                let resp = self
                    .send(
                        self.request(
                            reqwest::Method::PUT,
                            &format!("/orgs/{org}/teams/{slug}/memberships/{handle}"),
                        )
                        .json(&serde_json::json!({ "role": "member" })),
                    )
                    .await?;
                if !resp.status().is_success() {
                    return Err(api_error(resp).await);
                }
                tracing::info!(handle = %handle, team = %slug, "Added to team");
            }
            return Ok(());
        }

        let invitee_id = self.user_id(handle).await?;
        let resp = self
            .send(
                self.request(
                    reqwest::Method::POST,
                    &format!("/orgs/{org}/invitations"),
                )
                .json(&serde_json::json!({
                    "invitee_id": invitee_id,
                    "role": role.as_str(),
                    "team_ids": team_ids,
                })),
            )
            .await?;

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        tracing::info!(handle = %handle, org = %org, "Sent organization invitation");
        Ok(())
    }

    async fn remove(&self, handle: &str) -> Result<(), OrgError> {
        let org = &self.org;
        let resp = self
            .send(self.request(
                reqwest::Method::DELETE,
                &format!("/orgs/{org}/members/{handle}"),
            ))
            .await?;

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        tracing::info!(handle = %handle, org = %org, "Removed from organization");
        Ok(())
    }

    async fn pending_invitations(&self) -> Result<Vec<PendingInvitation>, OrgError> {
        let org = &self.org;
        let resp = self
            .send(self.request(
                reqwest::Method::GET,
                &format!("/orgs/{org}/invitations"),
            ))
            .await?;

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        resp.json().await.map_err(|e| OrgError::Http(e.to_string()))
    }
}
