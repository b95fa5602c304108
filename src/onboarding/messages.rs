//! Notification composition.
//!
//! Every message the bot sends is composed here as a pure function of
//! request fields (and, for the progress summary, the orchestration
//! report). Nothing in this module re-derives side-effect success from
//! anywhere except the flags set during orchestration.

use crate::adapters::calendar::Permission;
use crate::adapters::org::Team;

use super::model::{OnboardingRequest, preview};
use super::report::ProgressReport;

/// Welcome DM sent when onboarding starts.
pub fn welcome(name: &str) -> String {
    format!(
        ":wave: *Welcome to the lab, {name}!*\n\n\
         I'm the onboarding bot. I'll help you get set up with:\n\
         • *GitHub:* Access to the lab organization\n\
         • *Calendars:* Access to the lab calendars\n\
         • *Website:* Adding your profile to the lab website\n\n\
         To get started, please fill out the onboarding form, then send \
         a profile photo in this conversation."
    )
}

/// Confirmation DM after the form is accepted.
pub fn info_received() -> String {
    ":white_check_mark: *Information Received*\n\n\
     Your onboarding information has been submitted. The lab admin will \
     review it shortly.\n\n\
     *What's next:*\n\
     • GitHub: Invitation to the lab organization\n\
     • Calendar: Access to lab calendars\n\
     • Website: Your photo and bio will be added"
        .to_string()
}

/// Validation error DM when the submitted handle does not exist.
pub fn handle_not_found(handle: &str) -> String {
    format!(
        ":warning: *GitHub username not found*\n\n\
         The username `{handle}` doesn't exist on GitHub. Please \
         double-check the spelling and submit the form again."
    )
}

/// Approval prompt posted to the admin, with the live team listing and
/// the default calendar grant policy spelled out.
pub fn approval_prompt(
    request: &OnboardingRequest,
    teams: &[Team],
    default_team: &str,
    grants: &[(String, Permission)],
) -> String {
    let mut sections = vec![
        ":clipboard: *New Onboarding Request*".to_string(),
        format!(
            "*{}* (<@{}>) has submitted their onboarding information.",
            request.name, request.subject_id
        ),
        format!(
            "*GitHub Username:* `{}`\n*Email:* {}\n*Website:* {}",
            request.github_handle,
            if request.email.is_empty() { "Not provided" } else { &request.email },
            if request.website_url.is_empty() { "None" } else { &request.website_url },
        ),
    ];

    if !request.raw_bio.is_empty() {
        sections.push(format!("*Original Bio:*\n>{}", preview(&request.raw_bio, 300)));
    }
    if !request.edited_bio.is_empty() {
        sections.push(format!("*Edited Bio (for website):*\n>{}", request.edited_bio));
    }

    if !teams.is_empty() {
        let mut team_lines = vec!["*Teams (reply with ids to assign):*".to_string()];
        for team in teams {
            let marker = if team.name == default_team { " (default)" } else { "" };
            team_lines.push(format!("• `{}` {}{}", team.id, team.name, marker));
        }
        sections.push(team_lines.join("\n"));
    }

    let mut grant_lines = vec!["*Calendar Permissions (defaults):*".to_string()];
    for (calendar, permission) in grants {
        grant_lines.push(format!("• {}: {}", calendar, permission.describe()));
    }
    sections.push(grant_lines.join("\n"));

    sections.join("\n\n")
}

/// Edited form of the approval prompt once the request is resolved.
pub fn approval_resolved(request: &OnboardingRequest, verdict: &str) -> String {
    format!(
        ":white_check_mark: *Onboarding Request - {verdict}*\n\n\
         *Member:* {} (<@{}>)\n*GitHub:* `{}`\n\nStatus: {}",
        request.name, request.subject_id, request.github_handle, request.status
    )
}

/// Admin-facing progress summary after approval processing.
pub fn progress_summary(request: &OnboardingRequest, report: &ProgressReport) -> String {
    let mut sections = vec![format!("*Onboarding Progress: {}*", request.name)];

    let successes = report.successes();
    if !successes.is_empty() {
        sections.push(format!("*Completed:*\n{}", successes.join("\n")));
    }

    let issues = report.issues();
    if !issues.is_empty() {
        sections.push(format!("*Issues:*\n{}", issues.join("\n")));
    }

    if request.website_ready() {
        let photo = request
            .processed_photo_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        sections.push(format!(
            "*Website Update:*\n\
             The processed photo has been saved to: `{photo}`\n\n\
             *Edited bio:*\n>{}",
            request.edited_bio
        ));
    }

    sections.join("\n\n")
}

/// Congratulatory DM for the subject. One line per side-effect flag
/// that is set, plus the always-present website closer.
pub fn congratulation(request: &OnboardingRequest) -> String {
    let mut sections = vec![":tada: *Your onboarding has been approved!*".to_string()];

    if request.org_invite_sent {
        sections.push(
            ":octocat: *GitHub:* Check your email for an invitation to join the lab \
             organization. Once you accept, you'll have access to our repositories."
                .to_string(),
        );
    }

    if request.calendar_invites_sent {
        sections.push(
            ":calendar: *Calendars:* You should receive invitations to the lab \
             calendars shortly. Add them to your Google Calendar to stay up to date."
                .to_string(),
        );
    }

    sections.push(
        ":globe_with_meridians: *Website:* Your profile will be added to the lab \
         website soon!"
            .to_string(),
    );

    sections.join("\n\n")
}

/// Rejection DM for the subject.
pub fn rejection_notice() -> String {
    "Your onboarding request was not approved. Please contact the lab \
     admin for more information."
        .to_string()
}

/// Changes-requested DM relaying the admin's free-text feedback.
pub fn changes_requested(feedback: &str) -> String {
    format!(
        ":memo: *Changes Requested*\n\n\
         The lab admin has requested the following changes:\n>{feedback}\n\n\
         Please update your information and submit the form again."
    )
}

/// Photo confirmation DM sent with the processed preview.
pub fn photo_processed() -> String {
    "Photo received and processed! If you're happy with it, we'll use \
     this for the website."
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::onboarding::model::OnboardingStatus;

    fn request() -> OnboardingRequest {
        let mut r = OnboardingRequest::new("U1", "D1");
        r.name = "Ada Lovelace".to_string();
        r.github_handle = "adal".to_string();
        r
    }

    #[test]
    fn congratulation_lines_follow_flags() {
        let mut r = request();
        let msg = congratulation(&r);
        assert!(msg.contains(":tada:"));
        assert!(!msg.contains("GitHub:"));
        assert!(!msg.contains("Calendars:"));
        assert!(msg.contains("Website:"));

        r.org_invite_sent = true;
        let msg = congratulation(&r);
        assert!(msg.contains("GitHub:"));
        assert!(!msg.contains("Calendars:"));

        r.calendar_invites_sent = true;
        let msg = congratulation(&r);
        assert!(msg.contains("GitHub:"));
        assert!(msg.contains("Calendars:"));
        assert!(msg.contains("Website:"));
    }

    #[test]
    fn progress_summary_sections() {
        let mut r = request();
        let mut report = ProgressReport::new();
        report.success("GitHub invitation sent to `adal`");

        let msg = progress_summary(&r, &report);
        assert!(msg.contains("Onboarding Progress: Ada Lovelace"));
        assert!(msg.contains("*Completed:*"));
        assert!(!msg.contains("*Issues:*"), "issues section present when empty");
        assert!(!msg.contains("*Website Update:*"));

        report.warn("Calendar integration not configured");
        r.edited_bio = "Ada studies code.".to_string();
        r.processed_photo_path = Some(PathBuf::from("/tmp/ada.png"));

        let msg = progress_summary(&r, &report);
        assert!(msg.contains("*Issues:*"));
        assert!(msg.contains("Calendar integration not configured"));
        assert!(msg.contains("*Website Update:*"));
        assert!(msg.contains("Ada studies code."));
        assert!(msg.contains("/tmp/ada.png"));
    }

    #[test]
    fn approval_prompt_marks_default_team() {
        let teams = vec![
            Team {
                id: 1,
                name: "core".to_string(),
                slug: "core".to_string(),
                description: None,
            },
            Team {
                id: 2,
                name: "members".to_string(),
                slug: "members".to_string(),
                description: None,
            },
        ];
        let grants = vec![
            ("Lab Calendar".to_string(), Permission::Reader),
            ("Out of Office".to_string(), Permission::Writer),
        ];
        let msg = approval_prompt(&request(), &teams, "members", &grants);
        assert!(msg.contains("`2` members (default)"));
        assert!(msg.contains("`1` core"));
        assert!(!msg.contains("core (default)"));
        assert!(msg.contains("Lab Calendar: Read-only"));
        assert!(msg.contains("Out of Office: Edit"));
    }

    #[test]
    fn approval_resolved_names_verdict_and_status() {
        let mut r = request();
        r.set_status(OnboardingStatus::Rejected);
        let msg = approval_resolved(&r, "Rejected");
        assert!(msg.contains("Onboarding Request - Rejected"));
        assert!(msg.contains("rejected"));
        assert!(msg.contains("`adal`"));
    }

    #[test]
    fn changes_requested_quotes_feedback() {
        let msg = changes_requested("Please use your full name.");
        assert!(msg.contains(">Please use your full name."));
    }
}
