//! End-to-end tests for the onboarding/offboarding flows, with the
//! external services replaced by recording mocks.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use lab_concierge::adapters::border::{BorderStyle, PhotoBorderer};
use lab_concierge::adapters::calendar::{CalendarAdapter, Permission};
use lab_concierge::adapters::org::{OrgAdapter, OrgRole, PendingInvitation, Team};
use lab_concierge::adapters::rewrite::RewriteAdapter;
use lab_concierge::auth::AdminGate;
use lab_concierge::chat::{ChatClient, UserInfo};
use lab_concierge::error::{CalendarError, ChatError, OrgError, RewriteError};
use lab_concierge::offboarding::{OffboardingRequest, OffboardingService};
use lab_concierge::onboarding::{
    Deps, OnboardingRequest, OnboardingService, OnboardingStatus, PartialSubmission, ProfileForm,
    Settings,
};
use lab_concierge::store::MemoryStore;

const ADMIN: &str = "U_ADMIN";

// ── Mocks ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingChat {
    /// (channel, text) of every post_message call.
    posts: Mutex<Vec<(String, String)>>,
    /// (channel, ts, text) of every update_message call.
    updates: Mutex<Vec<(String, String, String)>>,
    /// (channel, filename) of every upload.
    uploads: Mutex<Vec<(String, String)>>,
    users: HashMap<String, UserInfo>,
}

impl RecordingChat {
    fn with_user(mut self, id: &str, name: &str, email: &str) -> Self {
        self.users.insert(
            id.to_string(),
            UserInfo {
                id: id.to_string(),
                name: name.to_string(),
                email: email.to_string(),
            },
        );
        self
    }

    async fn posts(&self) -> Vec<(String, String)> {
        self.posts.lock().await.clone()
    }

    async fn posts_to(&self, channel: &str) -> Vec<String> {
        self.posts
            .lock()
            .await
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl ChatClient for RecordingChat {
    async fn post_message(&self, channel: &str, text: &str) -> Result<String, ChatError> {
        let mut posts = self.posts.lock().await;
        posts.push((channel.to_string(), text.to_string()));
        Ok(format!("ts-{}", posts.len()))
    }

    async fn update_message(
        &self,
        channel: &str,
        message_ts: &str,
        text: &str,
    ) -> Result<(), ChatError> {
        self.updates
            .lock()
            .await
            .push((channel.to_string(), message_ts.to_string(), text.to_string()));
        Ok(())
    }

    async fn open_dm(&self, user_id: &str) -> Result<String, ChatError> {
        Ok(format!("D{user_id}"))
    }

    async fn user_info(&self, user_id: &str) -> Result<UserInfo, ChatError> {
        Ok(self.users.get(user_id).cloned().unwrap_or(UserInfo {
            id: user_id.to_string(),
            name: format!("User {user_id}"),
            email: String::new(),
        }))
    }

    async fn upload_file(
        &self,
        channel: &str,
        filename: &str,
        _bytes: Vec<u8>,
        _comment: &str,
    ) -> Result<(), ChatError> {
        self.uploads
            .lock()
            .await
            .push((channel.to_string(), filename.to_string()));
        Ok(())
    }
}

struct MockOrg {
    valid_handles: HashSet<String>,
    fail_invite: bool,
}

impl MockOrg {
    fn accepting(handles: &[&str]) -> Self {
        Self {
            valid_handles: handles.iter().map(|h| h.to_string()).collect(),
            fail_invite: false,
        }
    }

    fn failing_invites(handles: &[&str]) -> Self {
        Self {
            fail_invite: true,
            ..Self::accepting(handles)
        }
    }
}

#[async_trait]
impl OrgAdapter for MockOrg {
    async fn validate_handle(&self, handle: &str) -> Result<(), OrgError> {
        if self.valid_handles.contains(handle) {
            Ok(())
        } else {
            Err(OrgError::HandleNotFound(handle.to_string()))
        }
    }

    async fn list_teams(&self) -> Result<Vec<Team>, OrgError> {
        Ok(vec![
            Team {
                id: 42,
                name: "members".to_string(),
                slug: "members".to_string(),
                description: None,
            },
            Team {
                id: 7,
                name: "core".to_string(),
                slug: "core".to_string(),
                description: None,
            },
        ])
    }

    async fn is_member(&self, _handle: &str) -> Result<bool, OrgError> {
        Ok(false)
    }

    async fn invite(
        &self,
        _handle: &str,
        _team_ids: &[u64],
        _role: OrgRole,
    ) -> Result<(), OrgError> {
        if self.fail_invite {
            return Err(OrgError::Api {
                status: 502,
                reason: "upstream unavailable".to_string(),
            });
        }
        Ok(())
    }

    async fn remove(&self, _handle: &str) -> Result<(), OrgError> {
        Ok(())
    }

    async fn pending_invitations(&self) -> Result<Vec<PendingInvitation>, OrgError> {
        Ok(Vec::new())
    }
}

struct MockCalendar {
    failing: HashSet<String>,
}

impl MockCalendar {
    fn reliable() -> Self {
        Self {
            failing: HashSet::new(),
        }
    }

    fn failing_on(calendar: &str) -> Self {
        Self {
            failing: HashSet::from([calendar.to_string()]),
        }
    }
}

#[async_trait]
impl CalendarAdapter for MockCalendar {
    async fn share(
        &self,
        calendar: &str,
        _email: &str,
        _permission: Permission,
    ) -> Result<(), CalendarError> {
        if self.failing.contains(calendar) {
            Err(CalendarError::Api {
                calendar: calendar.to_string(),
                reason: "403: forbidden".to_string(),
            })
        } else {
            Ok(())
        }
    }

    async fn revoke(&self, _calendar: &str, _email: &str) -> Result<(), CalendarError> {
        Ok(())
    }
}

struct CannedRewriter {
    output: String,
}

#[async_trait]
impl RewriteAdapter for CannedRewriter {
    async fn rewrite(&self, raw_text: &str, _subject_name: &str) -> Result<String, RewriteError> {
        if raw_text.trim().is_empty() {
            return Err(RewriteError::EmptyInput);
        }
        Ok(self.output.clone())
    }
}

// ── Harness ─────────────────────────────────────────────────────────────

struct Harness {
    chat: Arc<RecordingChat>,
    service: OnboardingService,
    requests: Arc<MemoryStore<OnboardingRequest>>,
    partials: Arc<MemoryStore<PartialSubmission>>,
}

struct HarnessOptions {
    org: MockOrg,
    calendar: Option<MockCalendar>,
    rewriter: Option<CannedRewriter>,
    grants: Vec<(String, Permission)>,
    output_dir: PathBuf,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            org: MockOrg::accepting(&["octocat", "adal"]),
            calendar: None,
            rewriter: None,
            grants: vec![
                ("Lab Calendar".to_string(), Permission::Reader),
                ("Out of Office".to_string(), Permission::Writer),
            ],
            output_dir: std::env::temp_dir(),
        }
    }
}

fn harness(options: HarnessOptions) -> Harness {
    let chat = Arc::new(
        RecordingChat::default()
            .with_user(ADMIN, "The Admin", "admin@example.edu")
            .with_user("U1", "Ada Lovelace", "ada@example.edu")
            .with_user("U2", "Grace Hopper", "grace@example.edu"),
    );
    let requests = MemoryStore::new();
    let partials = MemoryStore::new();

    let service = OnboardingService::new(
        Deps {
            chat: chat.clone(),
            org: Arc::new(options.org),
            calendar: options
                .calendar
                .map(|c| Arc::new(c) as Arc<dyn CalendarAdapter>),
            rewriter: options
                .rewriter
                .map(|r| Arc::new(r) as Arc<dyn RewriteAdapter>),
        },
        Settings {
            default_team: "members".to_string(),
            default_grants: options.grants,
            borderer: PhotoBorderer::new(BorderStyle::default()),
            output_dir: options.output_dir,
        },
        AdminGate::new(ADMIN),
        requests.clone(),
        partials.clone(),
    );

    Harness {
        chat,
        service,
        requests,
        partials,
    }
}

/// Seed a request directly in the store, as if onboarding had started
/// and the form had been submitted.
async fn seed_request(harness: &Harness, subject_id: &str, website_ready: bool) {
    let mut request = OnboardingRequest::new(subject_id, format!("D{subject_id}"));
    request.name = "Ada Lovelace".to_string();
    request.email = "ada@example.edu".to_string();
    request.github_handle = "adal".to_string();
    if website_ready {
        request.edited_bio = "Ada studies code.".to_string();
        request.processed_photo_path = Some(PathBuf::from("/tmp/adal_bordered.png"));
    }
    request.set_status(OnboardingStatus::PendingApproval);
    harness.requests.upsert(subject_id, request).await;
}

// ── Lifecycle ───────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_onboarding_request_is_rejected() {
    let h = harness(HarnessOptions::default());

    h.service.start_onboarding(ADMIN, "U1").await.unwrap();
    let original = h.requests.get("U1").await.unwrap();

    h.service.start_onboarding(ADMIN, "U1").await.unwrap();

    // The original request is neither mutated nor replaced.
    assert_eq!(h.requests.len().await, 1);
    let after = h.requests.get("U1").await.unwrap();
    assert_eq!(after.created_at, original.created_at);
    assert_eq!(after.status, original.status);

    let admin_dms = h.chat.posts_to(&format!("D{ADMIN}")).await;
    assert!(
        admin_dms
            .iter()
            .any(|m| m.contains("already has an active onboarding request")),
        "admin should be told about the duplicate"
    );
}

#[tokio::test]
async fn start_onboarding_requires_admin() {
    let h = harness(HarnessOptions::default());

    h.service.start_onboarding("U2", "U1").await.unwrap();

    assert!(h.requests.get("U1").await.is_none());
    let actor_dms = h.chat.posts_to("DU2").await;
    assert!(actor_dms.iter().any(|m| m.contains("Only the lab admin")));
}

#[tokio::test]
async fn submitted_profile_reaches_pending_approval_with_edited_bio() {
    let h = harness(HarnessOptions {
        rewriter: Some(CannedRewriter {
            output: "Codey studies code.".to_string(),
        }),
        ..HarnessOptions::default()
    });

    h.service.start_onboarding(ADMIN, "U1").await.unwrap();
    h.service
        .submit_profile(
            "U1",
            ProfileForm {
                github_handle: "octocat".to_string(),
                raw_bio: "I study code.".to_string(),
                website_url: String::new(),
            },
        )
        .await
        .unwrap();

    let request = h.requests.get("U1").await.unwrap();
    assert_eq!(request.status, OnboardingStatus::PendingApproval);
    assert_eq!(request.edited_bio, "Codey studies code.");
    assert_eq!(request.raw_bio, "I study code.");

    // An approval prompt went to the admin with the team listing.
    let admin_msgs = h.chat.posts_to(ADMIN).await;
    assert!(admin_msgs.iter().any(|m| m.contains("New Onboarding Request")));
    assert!(admin_msgs.iter().any(|m| m.contains("members (default)")));

    // The prompt ts was recorded for later edits.
    assert!(!h.requests.get("U1").await.unwrap().approval_message_ts.is_empty());
}

#[tokio::test]
async fn unknown_handle_is_surfaced_and_leaves_status_alone() {
    let h = harness(HarnessOptions::default());

    h.service.start_onboarding(ADMIN, "U1").await.unwrap();
    h.service
        .submit_profile(
            "U1",
            ProfileForm {
                github_handle: "no-such-user".to_string(),
                ..ProfileForm::default()
            },
        )
        .await
        .unwrap();

    let request = h.requests.get("U1").await.unwrap();
    assert_eq!(request.status, OnboardingStatus::PendingInfo);
    assert!(request.github_handle.is_empty());

    let dms = h.chat.posts_to("DU1").await;
    assert!(dms.iter().any(|m| m.contains("`no-such-user`")));
}

#[tokio::test]
async fn failed_rewrite_does_not_block_approval_transition() {
    struct BrokenRewriter;

    #[async_trait]
    impl RewriteAdapter for BrokenRewriter {
        async fn rewrite(&self, _raw: &str, _name: &str) -> Result<String, RewriteError> {
            Err(RewriteError::Provider {
                reason: "model overloaded".to_string(),
            })
        }
    }

    let h = harness(HarnessOptions::default());
    // Swap in a rewriter that always fails.
    let h = Harness {
        service: OnboardingService::new(
            Deps {
                chat: h.chat.clone(),
                org: Arc::new(MockOrg::accepting(&["octocat"])),
                calendar: None,
                rewriter: Some(Arc::new(BrokenRewriter)),
            },
            Settings {
                default_team: "members".to_string(),
                default_grants: Vec::new(),
                borderer: PhotoBorderer::new(BorderStyle::default()),
                output_dir: std::env::temp_dir(),
            },
            AdminGate::new(ADMIN),
            h.requests.clone(),
            h.partials.clone(),
        ),
        ..h
    };

    h.service.start_onboarding(ADMIN, "U1").await.unwrap();
    h.service
        .submit_profile(
            "U1",
            ProfileForm {
                github_handle: "octocat".to_string(),
                raw_bio: "I study code.".to_string(),
                website_url: String::new(),
            },
        )
        .await
        .unwrap();

    let request = h.requests.get("U1").await.unwrap();
    assert_eq!(request.status, OnboardingStatus::PendingApproval);
    assert!(request.edited_bio.is_empty());
}

// ── Approval orchestration ──────────────────────────────────────────────

#[tokio::test]
async fn approval_with_calendar_unconfigured() {
    let h = harness(HarnessOptions::default());
    seed_request(&h, "U1", true).await;

    let report = h
        .service
        .approve(ADMIN, "U1", vec![42])
        .await
        .unwrap()
        .expect("admin approval should run");

    let issues = report.issues();
    assert_eq!(issues.len(), 1);
    assert!(issues[0].contains("not configured"));

    let request = h.requests.get("U1").await.unwrap();
    assert_eq!(request.status, OnboardingStatus::ReadyForWebsite);
    assert!(request.org_invite_sent);
    assert!(!request.calendar_invites_sent);
    assert_eq!(request.team_selections, vec![42]);
    assert_eq!(request.approving_admin_id, ADMIN);
}

#[tokio::test]
async fn org_failure_still_runs_remaining_steps() {
    let h = harness(HarnessOptions {
        org: MockOrg::failing_invites(&["adal"]),
        calendar: Some(MockCalendar::reliable()),
        grants: vec![("Lab Calendar".to_string(), Permission::Reader)],
        ..HarnessOptions::default()
    });
    seed_request(&h, "U1", true).await;

    let report = h
        .service
        .approve(ADMIN, "U1", vec![42])
        .await
        .unwrap()
        .expect("admin approval should run");

    // One failed step, two successful ones; the rollup must not report
    // completion on partial success.
    assert_eq!(report.issues().len(), 1);
    assert_eq!(report.successes().len(), 2);

    let request = h.requests.get("U1").await.unwrap();
    assert_eq!(request.status, OnboardingStatus::ReadyForWebsite);
    assert!(!request.org_invite_sent);
    assert!(request.calendar_invites_sent);
}

#[tokio::test]
async fn clean_run_completes() {
    let h = harness(HarnessOptions {
        calendar: Some(MockCalendar::reliable()),
        ..HarnessOptions::default()
    });
    seed_request(&h, "U1", true).await;

    let report = h
        .service
        .approve(ADMIN, "U1", vec![42, 7])
        .await
        .unwrap()
        .expect("admin approval should run");

    assert!(report.is_clean());

    let request = h.requests.get("U1").await.unwrap();
    assert_eq!(request.status, OnboardingStatus::Completed);
    assert!(request.org_invite_sent);
    assert!(request.calendar_invites_sent);
    assert_eq!(
        request.calendar_grants.get("Lab Calendar"),
        Some(&Permission::Reader)
    );

    // Both audiences were messaged: admin summary + subject congrats.
    let admin_msgs = h.chat.posts_to(ADMIN).await;
    assert!(admin_msgs.iter().any(|m| m.contains("Onboarding Progress")));
    let subject_msgs = h.chat.posts_to("DU1").await;
    assert!(
        subject_msgs
            .iter()
            .any(|m| m.contains("onboarding has been approved"))
    );
}

#[tokio::test]
async fn one_calendar_failing_blocks_completion_only() {
    let h = harness(HarnessOptions {
        calendar: Some(MockCalendar::failing_on("Out of Office")),
        ..HarnessOptions::default()
    });
    seed_request(&h, "U1", true).await;

    let report = h
        .service
        .approve(ADMIN, "U1", vec![42])
        .await
        .unwrap()
        .expect("admin approval should run");

    // The other calendar still succeeded.
    assert!(
        report
            .successes()
            .iter()
            .any(|l| l.contains("'Lab Calendar' shared"))
    );
    assert!(
        report
            .issues()
            .iter()
            .any(|l| l.contains("'Out of Office' failed"))
    );
    assert_eq!(
        h.requests.get("U1").await.unwrap().status,
        OnboardingStatus::ReadyForWebsite
    );
}

#[tokio::test]
async fn missing_website_material_is_an_issue() {
    let h = harness(HarnessOptions {
        calendar: Some(MockCalendar::reliable()),
        ..HarnessOptions::default()
    });
    seed_request(&h, "U1", false).await;

    let report = h
        .service
        .approve(ADMIN, "U1", vec![])
        .await
        .unwrap()
        .expect("admin approval should run");

    assert!(
        report
            .issues()
            .iter()
            .any(|l| l.contains("missing edited bio, processed photo"))
    );
    assert_eq!(
        h.requests.get("U1").await.unwrap().status,
        OnboardingStatus::ReadyForWebsite
    );
}

// ── Authorization ───────────────────────────────────────────────────────

#[tokio::test]
async fn non_admin_actions_are_silent_no_ops() {
    let h = harness(HarnessOptions::default());
    seed_request(&h, "U1", true).await;
    let before = h.requests.get("U1").await.unwrap();

    let report = h.service.approve("U_EVIL", "U1", vec![42]).await.unwrap();
    assert!(report.is_none());
    h.service.reject("U_EVIL", "U1").await.unwrap();
    h.service
        .request_changes("U_EVIL", "U1", "give me admin")
        .await
        .unwrap();

    // No status change...
    let after = h.requests.get("U1").await.unwrap();
    assert_eq!(after.status, before.status);
    assert_eq!(after.updated_at, before.updated_at);
    assert!(after.team_selections.is_empty());

    // ...and no outbound message of any kind.
    assert!(h.chat.posts().await.is_empty());
    assert!(h.chat.updates.lock().await.is_empty());
}

// ── Rejection & changes ─────────────────────────────────────────────────

#[tokio::test]
async fn rejection_notifies_subject_and_removes_request() {
    let h = harness(HarnessOptions::default());
    seed_request(&h, "U2", false).await;

    h.service.reject(ADMIN, "U2").await.unwrap();

    assert!(h.requests.get("U2").await.is_none());
    let dms = h.chat.posts_to("DU2").await;
    assert!(dms.iter().any(|m| m.contains("was not approved")));
}

#[tokio::test]
async fn request_changes_returns_to_pending_info() {
    let h = harness(HarnessOptions::default());
    seed_request(&h, "U1", false).await;

    h.service
        .request_changes(ADMIN, "U1", "Please use your full name.")
        .await
        .unwrap();

    let request = h.requests.get("U1").await.unwrap();
    assert_eq!(request.status, OnboardingStatus::PendingInfo);

    let dms = h.chat.posts_to("DU1").await;
    assert!(dms.iter().any(|m| m.contains("Please use your full name.")));
}

// ── Workflow correlation ────────────────────────────────────────────────

const FIRST_MESSAGE: &str = "\
Onboarding submission from <@U1|ada>

What's your GitHub username?
octocat

What's your GMail address (include the full address)?
ada@example.edu";

const SECOND_MESSAGE: &str = "\
Onboarding submission from <@U1|ada>

How do you want your name listed on the lab website?
Ada Lovelace

Please write a 3-4 sentence bio:
Ada studies early computation and writes the occasional algorithm.

Do you have a personal website?
https://ada.example";

#[tokio::test]
async fn two_workflow_messages_promote_one_request() {
    let h = harness(HarnessOptions {
        rewriter: Some(CannedRewriter {
            output: "Ada studies computation.".to_string(),
        }),
        ..HarnessOptions::default()
    });

    h.service
        .handle_workflow_message(&format!("D{ADMIN}"), FIRST_MESSAGE, true)
        .await
        .unwrap();

    // First half stored, nothing promoted yet.
    assert!(h.partials.get("U1").await.is_some());
    assert!(h.requests.get("U1").await.is_none());

    h.service
        .handle_workflow_message(&format!("D{ADMIN}"), SECOND_MESSAGE, true)
        .await
        .unwrap();

    // Second half completes the pair: promoted and cleared.
    let request = h.requests.get("U1").await.unwrap();
    assert_eq!(request.status, OnboardingStatus::PendingApproval);
    assert_eq!(request.github_handle, "octocat");
    assert_eq!(request.email, "ada@example.edu");
    assert_eq!(request.name, "Ada Lovelace");
    assert_eq!(request.edited_bio, "Ada studies computation.");
    assert!(request.website_url.contains("ada.example"));
    assert!(h.partials.get("U1").await.is_none());

    let admin_msgs = h.chat.posts_to(ADMIN).await;
    assert!(admin_msgs.iter().any(|m| m.contains("New Onboarding Request")));
}

#[tokio::test]
async fn workflow_messages_from_humans_are_ignored() {
    let h = harness(HarnessOptions::default());
    h.service
        .handle_workflow_message("D_CHAN", FIRST_MESSAGE, false)
        .await
        .unwrap();
    assert!(h.partials.is_empty().await);
}

#[tokio::test]
async fn workflow_promotion_never_overwrites_active_request() {
    let h = harness(HarnessOptions::default());
    seed_request(&h, "U1", false).await;
    let original = h.requests.get("U1").await.unwrap();

    h.service
        .handle_workflow_message(&format!("D{ADMIN}"), SECOND_MESSAGE, true)
        .await
        .unwrap();

    let after = h.requests.get("U1").await.unwrap();
    assert_eq!(after.created_at, original.created_at);
    assert_eq!(after.status, original.status);
}

// ── Photo flow ──────────────────────────────────────────────────────────

fn png_bytes(size: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_fn(size, size, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 90, 255])
    });
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
    bytes
}

#[tokio::test]
async fn photo_upload_processes_and_previews() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(HarnessOptions {
        output_dir: dir.path().to_path_buf(),
        ..HarnessOptions::default()
    });
    seed_request(&h, "U1", false).await;

    h.service
        .attach_photo("U1", png_bytes(256))
        .await
        .unwrap();

    let request = h.requests.get("U1").await.unwrap();
    let processed = request.processed_photo_path.expect("processed path set");
    assert!(processed.exists());
    assert!(request.original_photo_path.expect("original path set").exists());

    let uploads = h.chat.uploads.lock().await;
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].1.contains("bordered"));
}

#[tokio::test]
async fn undersized_photo_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(HarnessOptions {
        output_dir: dir.path().to_path_buf(),
        ..HarnessOptions::default()
    });
    seed_request(&h, "U1", false).await;

    h.service
        .attach_photo("U1", png_bytes(100))
        .await
        .unwrap();

    let request = h.requests.get("U1").await.unwrap();
    assert!(request.processed_photo_path.is_none());

    let dms = h.chat.posts_to("DU1").await;
    assert!(dms.iter().any(|m| m.contains("Image validation failed")));
}

#[tokio::test]
async fn photo_from_stranger_is_ignored() {
    let h = harness(HarnessOptions::default());
    h.service
        .attach_photo("U_NOBODY", png_bytes(256))
        .await
        .unwrap();
    assert!(h.chat.posts().await.is_empty());
}

// ── Offboarding ─────────────────────────────────────────────────────────

fn offboarding_harness() -> (
    Arc<RecordingChat>,
    OffboardingService,
    Arc<MemoryStore<OffboardingRequest>>,
) {
    let chat = Arc::new(
        RecordingChat::default()
            .with_user(ADMIN, "The Admin", "admin@example.edu")
            .with_user("U2", "Grace Hopper", "grace@example.edu"),
    );
    let requests = MemoryStore::new();
    let service = OffboardingService::new(
        chat.clone(),
        AdminGate::new(ADMIN),
        requests.clone(),
        "the-lab".to_string(),
        vec!["Lab Calendar".to_string(), "Out of Office".to_string()],
    );
    (chat, service, requests)
}

#[tokio::test]
async fn self_service_offboarding_routes_to_admin() {
    let (chat, service, requests) = offboarding_harness();

    service.start("U2", None).await.unwrap();

    let request = requests.get("U2").await.unwrap();
    assert_eq!(request.initiated_by, "U2");

    let admin_msgs = chat.posts_to(ADMIN).await;
    assert!(admin_msgs.iter().any(|m| m.contains("Offboarding Request")));
    let subject_msgs = chat.posts_to("DU2").await;
    assert!(
        subject_msgs
            .iter()
            .any(|m| m.contains("sent to the lab admin"))
    );
}

#[tokio::test]
async fn non_admin_cannot_target_someone_else() {
    let (_chat, service, requests) = offboarding_harness();

    service.start("U2", Some("U1")).await.unwrap();

    // The target falls back to the actor themself.
    assert!(requests.get("U1").await.is_none());
    assert!(requests.get("U2").await.is_some());
}

#[tokio::test]
async fn confirm_sends_conditional_checklist_and_farewell() {
    let (chat, service, requests) = offboarding_harness();
    service.start(ADMIN, Some("U2")).await.unwrap();
    requests
        .update("U2", |r| r.github_handle = "graceh".to_string())
        .await
        .unwrap();

    service.confirm(ADMIN, "U2", true, false).await.unwrap();

    let admin_msgs = chat.posts_to(ADMIN).await;
    let checklist = admin_msgs
        .iter()
        .find(|m| m.contains("Offboarding Checklist"))
        .expect("checklist sent");
    assert!(checklist.contains("`graceh`"));
    assert!(!checklist.contains("Calendars:"));
    assert!(checklist.contains("Website:"));

    let subject_msgs = chat.posts_to("DU2").await;
    assert!(subject_msgs.iter().any(|m| m.contains("Offboarding Confirmed")));

    // The confirmation prompt was edited in place.
    let updates = chat.updates.lock().await;
    assert!(updates.iter().any(|(_, _, text)| text.contains("Offboarding Processed")));
}

#[tokio::test]
async fn offboarding_confirm_and_cancel_are_admin_gated() {
    let (chat, service, requests) = offboarding_harness();
    service.start(ADMIN, Some("U2")).await.unwrap();
    let posts_before = chat.posts().await.len();

    service.confirm("U_EVIL", "U2", true, true).await.unwrap();
    service.cancel("U_EVIL", "U2").await.unwrap();

    // Still present, flags untouched, nothing new sent.
    let request = requests.get("U2").await.unwrap();
    assert!(!request.revoke_org_access);
    assert_eq!(chat.posts().await.len(), posts_before);
}

#[tokio::test]
async fn cancel_drops_the_request() {
    let (chat, service, requests) = offboarding_harness();
    service.start(ADMIN, Some("U2")).await.unwrap();

    service.cancel(ADMIN, "U2").await.unwrap();

    assert!(requests.get("U2").await.is_none());
    let updates = chat.updates.lock().await;
    assert!(updates.iter().any(|(_, _, text)| text.contains("cancelled")));
}
