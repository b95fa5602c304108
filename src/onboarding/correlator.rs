//! Workflow-submission correlator.
//!
//! The workflow-builder tool posts the subject's answers as two
//! independently-timed free-text messages: one with the GitHub handle
//! and email, one with the name, bio, and website. This module parses
//! each message heuristically, holds partial field sets keyed by
//! subject, and promotes a completed pair into a real onboarding
//! request through the same path as the structured form.
//!
//! The parsing is inherently fragile pattern-matching over free text;
//! it is isolated behind `parse_submission` so a structured submission
//! path can replace it without touching the state machine.

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::Error;

use super::model::{OnboardingRequest, OnboardingStatus};
use super::service::OnboardingService;

/// Fields recovered from one workflow message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionFields {
    pub github_handle: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub website_url: Option<String>,
}

impl SubmissionFields {
    pub fn is_empty(&self) -> bool {
        self.github_handle.is_none()
            && self.email.is_none()
            && self.name.is_none()
            && self.bio.is_none()
            && self.website_url.is_none()
    }

    /// Merge `newer` over `self`; present fields win.
    pub fn merge(&mut self, newer: SubmissionFields) {
        if newer.github_handle.is_some() {
            self.github_handle = newer.github_handle;
        }
        if newer.email.is_some() {
            self.email = newer.email;
        }
        if newer.name.is_some() {
            self.name = newer.name;
        }
        if newer.bio.is_some() {
            self.bio = newer.bio;
        }
        if newer.website_url.is_some() {
            self.website_url = newer.website_url;
        }
    }
}

/// Which half of the two-message submission a parse looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    /// GitHub handle (and usually email), no bio or name yet.
    First,
    /// Carries a bio or name; completes the pair.
    Second,
    /// Unrecognized shape; stored as-is awaiting a later message.
    Unknown,
}

/// Classify a parsed field set.
pub fn classify(fields: &SubmissionFields) -> SubmissionKind {
    let has_handle = fields.github_handle.is_some();
    let has_bio_or_name = fields.bio.is_some() || fields.name.is_some();
    if has_handle && !has_bio_or_name {
        SubmissionKind::First
    } else if has_bio_or_name {
        SubmissionKind::Second
    } else {
        SubmissionKind::Unknown
    }
}

/// A not-yet-complete submission, keyed by subject id in its store.
#[derive(Debug, Clone)]
pub struct PartialSubmission {
    pub subject_id: String,
    pub fields: SubmissionFields,
    pub received_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PartialSubmission {
    pub fn new(subject_id: impl Into<String>, fields: SubmissionFields) -> Self {
        let now = Utc::now();
        Self {
            subject_id: subject_id.into(),
            fields,
            received_at: now,
            updated_at: now,
        }
    }
}

/// Pull the submitting user's id out of the message header
/// ("... submission from <@U12345|name>").
pub fn extract_subject_id(text: &str) -> Option<String> {
    let re = Regex::new(r"submission from\s+<@([A-Z0-9]+)").unwrap();
    re.captures(text)
        .map(|caps| caps[1].to_string())
}

/// Whether a line echoes a question label rather than an answer.
fn looks_like_label(line: &str) -> bool {
    line.starts_with("Answer")
        || line.starts_with("What")
        || line.starts_with("Please")
        || line.starts_with("Do you")
        || line.starts_with("How do")
}

/// Scan the few lines after a label for the first plausible answer.
fn answer_after<'a>(
    lines: &[&'a str],
    label_idx: usize,
    accept: impl Fn(&str) -> bool,
) -> Option<&'a str> {
    lines
        .iter()
        .skip(label_idx + 1)
        .take(2)
        .map(|l| l.trim())
        .find(|l| !l.is_empty() && !looks_like_label(l) && accept(l))
}

/// Heuristic extraction of form fields from a workflow message.
///
/// Strategy: find each question-label substring, then take the next
/// non-empty, non-label-echoing line as the answer; fall back to regex
/// patterns keyed to expected formats (email shape, handle charset).
pub fn parse_submission(text: &str) -> SubmissionFields {
    let mut fields = SubmissionFields::default();
    let lines: Vec<&str> = text.lines().collect();

    for (i, line) in lines.iter().enumerate() {
        let lower = line.trim().to_lowercase();

        if lower.contains("github username")
            && let Some(answer) = answer_after(&lines, i, |l| !l.contains('?'))
            && fields.github_handle.is_none()
        {
            fields.github_handle = Some(answer.to_string());
        }

        if (lower.contains("gmail") || lower.contains("email"))
            && let Some(answer) = answer_after(&lines, i, |l| l.contains('@'))
            && fields.email.is_none()
        {
            fields.email = Some(answer.to_string());
        }

        if (lower.contains("name listed on the lab website")
            || lower.contains("how do you want your name"))
            && let Some(answer) = answer_after(&lines, i, |_| true)
            && fields.name.is_none()
        {
            fields.name = Some(answer.to_string());
        }

        if lower.contains("bio")
            && lower.contains("sentence")
            && let Some(answer) = answer_after(&lines, i, |l| l.len() > 20)
            && fields.bio.is_none()
        {
            fields.bio = Some(answer.to_string());
        }

        if lower.contains("personal website")
            && let Some(answer) =
                answer_after(&lines, i, |l| l.contains("http") || l.contains("www"))
            && fields.website_url.is_none()
        {
            fields.website_url = Some(answer.to_string());
        }
    }

    // Regex fallbacks for the formats we can recognize outright.
    if fields.github_handle.is_none() {
        let re = Regex::new(r"(?i)GitHub username[?\s:]*\n*([A-Za-z0-9_-]+)").unwrap();
        if let Some(caps) = re.captures(text) {
            fields.github_handle = Some(caps[1].trim().to_string());
        }
    }
    if fields.email.is_none() {
        let re = Regex::new(r"([\w.+-]+@[\w.-]+\.\w+)").unwrap();
        if let Some(caps) = re.captures(text) {
            fields.email = Some(caps[1].trim().to_string());
        }
    }

    fields
}

impl OnboardingService {
    /// Process one forwarded workflow message.
    ///
    /// First-half messages accumulate in the partial store; a
    /// second-half message completes the pair and promotes it. An
    /// unrecognized shape is stored as-is under the subject, awaiting
    /// whatever arrives next.
    pub async fn handle_workflow_message(
        &self,
        channel_id: &str,
        text: &str,
        from_bot: bool,
    ) -> Result<(), Error> {
        // Workflow posts arrive from the tool's bot identity only.
        if !from_bot || !text.contains("submission from") {
            return Ok(());
        }

        let Some(subject_id) = extract_subject_id(text) else {
            tracing::debug!("Could not extract subject id from workflow message");
            return Ok(());
        };

        let fields = parse_submission(text);
        if fields.is_empty() {
            tracing::warn!(subject = %subject_id, "Could not parse workflow message fields");
            return Ok(());
        }

        match classify(&fields) {
            SubmissionKind::First => {
                self.merge_partial(&subject_id, fields).await;
                self.dm(
                    channel_id,
                    &format!(
                        ":white_check_mark: Received GitHub info for <@{subject_id}>. \
                         Waiting for website info..."
                    ),
                )
                .await;
                tracing::info!(subject = %subject_id, "Stored first workflow submission");
            }
            SubmissionKind::Second => {
                let mut merged = self
                    .partials
                    .get(&subject_id)
                    .await
                    .map(|p| p.fields)
                    .unwrap_or_default();
                merged.merge(fields);

                self.promote_submission(&subject_id, merged, channel_id)
                    .await?;
                self.partials.remove(&subject_id).await;
            }
            SubmissionKind::Unknown => {
                tracing::warn!(subject = %subject_id, "Unrecognized workflow message; storing");
                self.merge_partial(&subject_id, fields).await;
            }
        }

        Ok(())
    }

    async fn merge_partial(&self, subject_id: &str, fields: SubmissionFields) {
        match self.partials.get(subject_id).await {
            Some(mut partial) => {
                partial.fields.merge(fields);
                partial.updated_at = Utc::now();
                self.partials.upsert(subject_id, partial).await;
            }
            None => {
                self.partials
                    .upsert(subject_id, PartialSubmission::new(subject_id, fields))
                    .await;
            }
        }
    }

    /// Build a full request from a completed field set and run it
    /// through the same `PendingInfo -> PendingApproval` transition as
    /// the structured form path.
    async fn promote_submission(
        &self,
        subject_id: &str,
        fields: SubmissionFields,
        admin_channel: &str,
    ) -> Result<(), Error> {
        let mut name = fields.name.clone().unwrap_or_default();
        let mut email = fields.email.clone().unwrap_or_default();

        // Fill gaps from the chat profile.
        if name.is_empty() || email.is_empty() {
            match self.chat.user_info(subject_id).await {
                Ok(info) => {
                    if name.is_empty() {
                        name = info.name;
                    }
                    if email.is_empty() {
                        email = info.email;
                    }
                }
                Err(e) => tracing::warn!("Could not fetch user info for {subject_id}: {e}"),
            }
        }

        let github_handle = fields.github_handle.clone().unwrap_or_default();
        if !github_handle.is_empty()
            && let Err(e) = self.org.validate_handle(&github_handle).await
        {
            // Flag it for the admin but keep going; they can fix it.
            self.dm(
                admin_channel,
                &format!(
                    ":warning: GitHub username `{github_handle}` for <@{subject_id}> \
                     is invalid: {e}"
                ),
            )
            .await;
        }

        let reply_channel = match self.chat.open_dm(subject_id).await {
            Ok(channel) => channel,
            Err(e) => {
                tracing::error!("Could not open DM with {subject_id}: {e}");
                admin_channel.to_string()
            }
        };

        let mut request = OnboardingRequest::new(subject_id, &reply_channel);
        request.name = name.clone();
        request.email = email;
        request.github_handle = github_handle;
        request.raw_bio = fields.bio.clone().unwrap_or_default();
        request.website_url = fields.website_url.clone().unwrap_or_default();

        if let Some(rewriter) = &self.rewriter
            && !request.raw_bio.trim().is_empty()
        {
            match rewriter.rewrite(&request.raw_bio, &name).await {
                Ok(edited) => request.edited_bio = edited,
                Err(e) => tracing::warn!("Bio rewrite failed: {e}"),
            }
        }

        request.set_status(OnboardingStatus::PendingApproval);

        if self.requests.insert_new(subject_id, request.clone()).await.is_err() {
            // An active request exists; never overwrite it.
            self.dm(
                admin_channel,
                &format!("<@{subject_id}> already has an active onboarding request."),
            )
            .await;
            return Ok(());
        }

        self.send_approval_prompt(&request).await;
        tracing::info!(subject = %subject_id, "Promoted workflow submission to request");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIRST_MESSAGE: &str = "\
Onboarding submission from <@U0TESTUSER|octo>

What's your GitHub username?
octocat

What's your GMail address (include the full address)?
octo@example.edu";

    const SECOND_MESSAGE: &str = "\
Onboarding submission from <@U0TESTUSER|octo>

How do you want your name listed on the lab website?
Octo Cat

Please write a 3-4 sentence bio:
Octo studies distributed systems and enjoys long walks on the beach.

Do you have a personal website?
https://octo.example";

    #[test]
    fn extracts_subject_id() {
        assert_eq!(
            extract_subject_id(FIRST_MESSAGE).as_deref(),
            Some("U0TESTUSER")
        );
        assert!(extract_subject_id("unrelated text").is_none());
    }

    #[test]
    fn parses_first_message() {
        let fields = parse_submission(FIRST_MESSAGE);
        assert_eq!(fields.github_handle.as_deref(), Some("octocat"));
        assert_eq!(fields.email.as_deref(), Some("octo@example.edu"));
        assert!(fields.bio.is_none());
        assert!(fields.name.is_none());
        assert_eq!(classify(&fields), SubmissionKind::First);
    }

    #[test]
    fn parses_second_message() {
        let fields = parse_submission(SECOND_MESSAGE);
        assert_eq!(fields.name.as_deref(), Some("Octo Cat"));
        assert!(
            fields
                .bio
                .as_deref()
                .is_some_and(|b| b.contains("distributed systems"))
        );
        assert_eq!(fields.website_url.as_deref(), Some("https://octo.example"));
        assert_eq!(classify(&fields), SubmissionKind::Second);
    }

    #[test]
    fn merge_prefers_newer_fields() {
        let mut base = parse_submission(FIRST_MESSAGE);
        let mut update = SubmissionFields::default();
        update.email = Some("new@example.edu".to_string());
        base.merge(update);

        assert_eq!(base.email.as_deref(), Some("new@example.edu"));
        assert_eq!(base.github_handle.as_deref(), Some("octocat"));
    }

    #[test]
    fn email_regex_fallback() {
        let fields = parse_submission(
            "Onboarding submission from <@UABC>\nsomewhere in here lurks a@b.edu for you",
        );
        assert_eq!(fields.email.as_deref(), Some("a@b.edu"));
    }

    #[test]
    fn unparseable_message_yields_empty_fields() {
        let fields = parse_submission("Onboarding submission from <@UABC>\n???\n???");
        assert!(fields.is_empty());
        assert_eq!(classify(&fields), SubmissionKind::Unknown);
    }
}
