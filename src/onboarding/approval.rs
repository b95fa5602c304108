//! Approval flow — admin actions and the post-approval orchestration.
//!
//! Every entry point checks the admin gate first; a non-admin actor is
//! a silent no-op. The orchestration runs the three external steps in
//! fixed order, best-effort per step, and rolls the final status up
//! from the accumulated report: `Completed` only when every attempted
//! step succeeded.

use crate::adapters::calendar::share_many;
use crate::adapters::org::OrgRole;
use crate::error::Error;

use super::messages;
use super::model::OnboardingStatus;
use super::report::ProgressReport;
use super::service::OnboardingService;

impl OnboardingService {
    /// Approve a request, carrying the admin's team selection.
    ///
    /// Returns the orchestration report, or `None` when the action was
    /// ignored (non-admin actor or unknown request) or the run failed
    /// unexpectedly, in which case the request is parked in `Error`
    /// status rather than the failure escaping the event task.
    pub async fn approve(
        &self,
        actor_id: &str,
        subject_id: &str,
        team_ids: Vec<u64>,
    ) -> Result<Option<ProgressReport>, Error> {
        if !self.gate.permits(actor_id) {
            return Ok(None);
        }

        let Some(mut request) = self.requests.get(subject_id).await else {
            tracing::error!(subject = %subject_id, "No request found to approve");
            return Ok(None);
        };

        if !request.status.can_transition_to(OnboardingStatus::GithubPending) {
            tracing::warn!(
                subject = %subject_id,
                status = %request.status,
                "Request is not awaiting approval; ignoring"
            );
            return Ok(None);
        }

        request.team_selections = team_ids;
        request.approving_admin_id = actor_id.to_string();
        request.set_status(OnboardingStatus::GithubPending);
        self.save(&request).await;

        self.resolve_approval_message(&request.subject_id, "Approved")
            .await;

        match self.process_approval(subject_id).await {
            Ok(report) => Ok(Some(report)),
            Err(e) => {
                tracing::error!(subject = %subject_id, "Approval processing failed: {e}");
                if let Err(store_err) = self
                    .requests
                    .update(subject_id, |r| r.record_error(e.to_string()))
                    .await
                {
                    tracing::error!("Could not record error status: {store_err}");
                }
                Ok(None)
            }
        }
    }

    /// Reject a request: notify the subject and drop the record.
    pub async fn reject(&self, actor_id: &str, subject_id: &str) -> Result<(), Error> {
        if !self.gate.permits(actor_id) {
            return Ok(());
        }

        let Some(mut request) = self.requests.get(subject_id).await else {
            return Ok(());
        };
        if !request.status.can_transition_to(OnboardingStatus::Rejected) {
            tracing::warn!(subject = %subject_id, status = %request.status, "Already terminal");
            return Ok(());
        }

        request.set_status(OnboardingStatus::Rejected);
        self.save(&request).await;
        self.resolve_approval_message(subject_id, "Rejected").await;

        self.dm(&request.reply_channel_id, &messages::rejection_notice())
            .await;

        self.requests.remove(subject_id).await;
        tracing::info!(subject = %subject_id, "Onboarding request rejected");
        Ok(())
    }

    /// Send a request back to the subject with the admin's feedback.
    pub async fn request_changes(
        &self,
        actor_id: &str,
        subject_id: &str,
        feedback: &str,
    ) -> Result<(), Error> {
        if !self.gate.permits(actor_id) {
            return Ok(());
        }

        let Some(mut request) = self.requests.get(subject_id).await else {
            tracing::error!(subject = %subject_id, "No request for change feedback");
            return Ok(());
        };
        if !request.status.can_transition_to(OnboardingStatus::PendingInfo) {
            tracing::warn!(
                subject = %subject_id,
                status = %request.status,
                "Request cannot return to info collection; ignoring"
            );
            return Ok(());
        }
        request.set_status(OnboardingStatus::PendingInfo);
        self.save(&request).await;

        self.dm(
            &request.reply_channel_id,
            &messages::changes_requested(feedback),
        )
        .await;

        tracing::info!(subject = %subject_id, "Changes requested");
        Ok(())
    }

    /// Run the post-approval steps in fixed order.
    ///
    /// 1. Org invite: always attempted; failure is recorded and the
    ///    run continues.
    /// 2. Calendar grants: only with a configured adapter and a known
    ///    email; each calendar independent.
    /// 3. Website readiness: a pure predicate, never a write.
    ///
    /// Both summary messages are composed from the final request fields
    /// and the report, then the status rollup is applied once.
    pub(crate) async fn process_approval(&self, subject_id: &str) -> Result<ProgressReport, Error> {
        let mut request = self
            .requests
            .get(subject_id)
            .await
            .ok_or_else(|| crate::error::StoreError::NotFound {
                key: subject_id.to_string(),
            })?;
        let mut report = ProgressReport::new();

        // 1. Org invitation.
        match self
            .org
            .invite(
                &request.github_handle,
                &request.team_selections,
                OrgRole::DirectMember,
            )
            .await
        {
            Ok(()) => {
                request.org_invite_sent = true;
                report.success(format!(
                    ":white_check_mark: GitHub invitation sent to `{}`",
                    request.github_handle
                ));
            }
            Err(e) => report.fail(format!(":x: GitHub invitation failed: {e}")),
        }
        self.save(&request).await;

        // 2. Calendar sharing.
        if let Some(calendar) = &self.calendar
            && !request.email.is_empty()
        {
            request.set_status(OnboardingStatus::CalendarPending);
            request.calendar_grants = self
                .settings
                .default_grants
                .iter()
                .cloned()
                .collect();
            self.save(&request).await;

            let results =
                share_many(calendar.as_ref(), &request.email, &self.settings.default_grants).await;
            for (name, result) in results {
                match result {
                    Ok(()) => report.success(format!(":white_check_mark: Calendar '{name}' shared")),
                    Err(e) => report.fail(format!(":x: Calendar '{name}' failed: {e}")),
                }
            }

            request.calendar_invites_sent = true;
            self.save(&request).await;
        } else {
            if self.calendar.is_none() {
                report.warn(":warning: Calendar integration not configured");
            }
            if request.email.is_empty() {
                report.warn(":warning: No email address for calendar invitations");
            }
        }

        // 3. Website readiness check.
        request.set_status(OnboardingStatus::ReadyForWebsite);
        self.save(&request).await;

        if request.website_ready() {
            report.success(":white_check_mark: Photo and bio ready for website");
        } else {
            report.warn(format!(
                ":warning: Website content incomplete: missing {}",
                request.missing_artifacts().join(", ")
            ));
        }

        // Summaries for the two audiences.
        self.dm(
            self.gate.admin_id(),
            &messages::progress_summary(&request, &report),
        )
        .await;
        self.dm(&request.reply_channel_id, &messages::congratulation(&request))
            .await;

        // Status rollup, computed once from the report.
        let final_status = report.final_status();
        if final_status == OnboardingStatus::Completed {
            request.set_status(OnboardingStatus::Completed);
        }
        self.save(&request).await;

        tracing::info!(
            subject = %subject_id,
            status = %request.status,
            issues = report.issues().len(),
            "Approval processing finished"
        );
        Ok(report)
    }

    /// Edit the original approval prompt to show its resolution.
    /// Fire-and-forget: a failed edit never affects request state.
    async fn resolve_approval_message(&self, subject_id: &str, verdict: &str) {
        let Some(request) = self.requests.get(subject_id).await else {
            return;
        };
        if request.approval_message_ts.is_empty() {
            return;
        }
        if let Err(e) = self
            .chat
            .update_message(
                self.gate.admin_id(),
                &request.approval_message_ts,
                &messages::approval_resolved(&request, verdict),
            )
            .await
        {
            tracing::warn!("Failed to update approval message: {e}");
        }
    }
}
