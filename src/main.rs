use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use lab_concierge::adapters::border::{BorderStyle, PhotoBorderer};
use lab_concierge::adapters::calendar::{CalendarAdapter, GoogleCalendar};
use lab_concierge::adapters::org::GithubOrg;
use lab_concierge::adapters::rewrite::{ClaudeRewriter, RewriteAdapter};
use lab_concierge::auth::AdminGate;
use lab_concierge::chat::{ChatEvent, SlackClient};
use lab_concierge::config::{AppConfig, default_calendar_grants};
use lab_concierge::offboarding::{OffboardingRequest, OffboardingService};
use lab_concierge::onboarding::{
    Deps, OnboardingService, PartialSubmission, Settings,
};
use lab_concierge::router::Router;
use lab_concierge::store::MemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("loading configuration")?;

    eprintln!("🤖 Lab Concierge v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Org: {}", config.org.org);
    eprintln!("   Output dir: {}", config.output_dir.display());

    // ── Adapters ─────────────────────────────────────────────────────────
    let chat = Arc::new(SlackClient::new(config.chat.bot_token.clone()));
    let org = Arc::new(GithubOrg::new(&config.org));

    let calendar: Option<Arc<dyn CalendarAdapter>> = match &config.calendar {
        Some(cal_config) => {
            eprintln!("   Calendar: enabled ({} calendars)", cal_config.calendars.len());
            Some(Arc::new(GoogleCalendar::new(cal_config)))
        }
        None => {
            eprintln!("   Calendar: not configured");
            None
        }
    };

    let rewriter: Option<Arc<dyn RewriteAdapter>> = match &config.rewrite {
        Some(rw_config) => {
            eprintln!("   Bio rewriting: enabled ({})", rw_config.model);
            Some(Arc::new(
                ClaudeRewriter::new(rw_config).context("creating rewrite client")?,
            ))
        }
        None => {
            eprintln!("   Bio rewriting: not configured");
            None
        }
    };

    // ── Stores ───────────────────────────────────────────────────────────
    let requests = MemoryStore::new();
    let partials: Arc<MemoryStore<PartialSubmission>> = MemoryStore::new();
    let offboardings: Arc<MemoryStore<OffboardingRequest>> = MemoryStore::new();

    // ── Services ─────────────────────────────────────────────────────────
    let gate = AdminGate::new(config.chat.admin_user_id.clone());

    let settings = Settings {
        default_team: config.org.default_team.clone(),
        default_grants: default_calendar_grants(),
        borderer: PhotoBorderer::new(BorderStyle {
            color: config.border_color,
            width: config.border_width,
            ..BorderStyle::default()
        }),
        output_dir: config.output_dir.clone(),
    };

    let onboarding = Arc::new(OnboardingService::new(
        Deps {
            chat: chat.clone(),
            org: org.clone(),
            calendar,
            rewriter,
        },
        settings,
        gate.clone(),
        requests.clone(),
        partials.clone(),
    ));

    let calendar_names: Vec<String> = config
        .calendar
        .as_ref()
        .map(|c| c.calendars.iter().map(|(name, _)| name.clone()).collect())
        .unwrap_or_else(|| {
            default_calendar_grants()
                .into_iter()
                .map(|(name, _)| name)
                .collect()
        });

    let offboarding = Arc::new(OffboardingService::new(
        chat.clone(),
        gate.clone(),
        offboardings.clone(),
        config.org.org.clone(),
        calendar_names,
    ));

    // ── Retention sweep ──────────────────────────────────────────────────
    // Terminal requests and stale partials are purged after the TTL so a
    // long-running process doesn't grow without bound.
    let retention = config.retention;
    {
        let requests = requests.clone();
        let partials = partials.clone();
        let offboardings = offboardings.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(3600));
            ticker.tick().await; // first tick is immediate
            loop {
                ticker.tick().await;
                let cutoff = chrono::Utc::now()
                    - chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::hours(72));

                let dropped_requests = requests
                    .retain(|_, r| !(r.status.is_terminal() && r.updated_at < cutoff))
                    .await;
                let dropped_partials = partials.retain(|_, p| p.updated_at >= cutoff).await;
                let dropped_offboardings =
                    offboardings.retain(|_, o| o.created_at >= cutoff).await;

                if dropped_requests + dropped_partials + dropped_offboardings > 0 {
                    tracing::info!(
                        requests = dropped_requests,
                        partials = dropped_partials,
                        offboardings = dropped_offboardings,
                        "Retention sweep purged stale entries"
                    );
                }
            }
        });
    }

    // ── Event loop ───────────────────────────────────────────────────────
    // Inbound events arrive as JSON lines on stdin, one event per line;
    // the production socket-mode bridge feeds this same format.
    let router = Arc::new(Router::new(onboarding, offboarding));

    eprintln!("   Reading events from stdin (one JSON object per line)\n");

    let stdin = tokio::io::stdin();
    let reader = BufReader::new(stdin);
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<ChatEvent>(line) {
            Ok(event) => {
                let router = router.clone();
                // Each event is an independent short-lived task.
                tokio::spawn(async move {
                    router.dispatch(event).await;
                });
            }
            Err(e) => tracing::warn!("Skipping unparseable event: {e}"),
        }
    }

    Ok(())
}
