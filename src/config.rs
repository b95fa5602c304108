//! Configuration types — loaded from environment variables.
//!
//! Required: Slack bot credentials and the GitHub org token. Calendar
//! sharing and bio rewriting are optional integrations; when their env
//! vars are absent the corresponding config is `None` and downstream
//! steps report "not configured" instead of failing.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::adapters::calendar::Permission;
use crate::error::ConfigError;

fn require_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Slack bot configuration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Bot OAuth token (xoxb-...).
    pub bot_token: SecretString,
    /// Chat user id of the single designated admin.
    pub admin_user_id: String,
}

impl ChatConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bot_token: SecretString::from(require_env("SLACK_BOT_TOKEN")?),
            admin_user_id: require_env("SLACK_ADMIN_USER_ID")?,
        })
    }
}

/// GitHub organization configuration.
#[derive(Debug, Clone)]
pub struct OrgConfig {
    /// Personal access token with admin:org scope.
    pub token: SecretString,
    /// Organization login.
    pub org: String,
    /// Team pre-selected in the approval prompt.
    pub default_team: String,
}

impl OrgConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            token: SecretString::from(require_env("GITHUB_TOKEN")?),
            org: require_env("GITHUB_ORG")?,
            default_team: std::env::var("GITHUB_DEFAULT_TEAM")
                .unwrap_or_else(|_| "members".to_string()),
        })
    }
}

/// Google Calendar configuration.
///
/// Calendar ids are looked up per calendar name from
/// `GOOGLE_CALENDAR_<NAME>` (name uppercased, spaces as underscores).
#[derive(Debug, Clone)]
pub struct CalendarConfig {
    /// Pre-obtained OAuth bearer token for the Calendar API.
    pub api_token: SecretString,
    /// Calendar name -> calendar id.
    pub calendars: Vec<(String, String)>,
}

/// The three lab calendars shared with every new member.
pub const CALENDAR_NAMES: [&str; 3] = ["Lab Calendar", "Out of Office", "Shared Resources"];

impl CalendarConfig {
    /// Load from env; `None` when the API token is not set.
    pub fn from_env() -> Option<Self> {
        let api_token = std::env::var("GOOGLE_API_TOKEN").ok()?;

        let mut calendars = Vec::new();
        for name in CALENDAR_NAMES {
            let env_key = format!(
                "GOOGLE_CALENDAR_{}",
                name.to_uppercase().replace(' ', "_")
            );
            if let Ok(id) = std::env::var(&env_key) {
                calendars.push((name.to_string(), id));
            }
        }

        Some(Self {
            api_token: SecretString::from(api_token),
            calendars,
        })
    }
}

/// The fixed grant policy applied at approval time: read-only on the
/// primary lab calendar, write on the two secondary calendars.
pub fn default_calendar_grants() -> Vec<(String, Permission)> {
    vec![
        ("Lab Calendar".to_string(), Permission::Reader),
        ("Out of Office".to_string(), Permission::Writer),
        ("Shared Resources".to_string(), Permission::Writer),
    ]
}

/// Anthropic API configuration for bio rewriting.
#[derive(Debug, Clone)]
pub struct RewriteConfig {
    pub api_key: SecretString,
    pub model: String,
}

impl RewriteConfig {
    /// Load from env; `None` when the API key is not set.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").ok()?;
        Some(Self {
            api_key: SecretString::from(api_key),
            model: std::env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
        })
    }
}

/// Main configuration container.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub chat: ChatConfig,
    pub org: OrgConfig,
    pub calendar: Option<CalendarConfig>,
    pub rewrite: Option<RewriteConfig>,

    /// Border color for processed photos (lab green RGB).
    pub border_color: [u8; 3],
    /// Border stroke width in pixels.
    pub border_width: u32,

    /// Local storage for processed photos.
    pub output_dir: PathBuf,
    /// How long terminal requests and stale partial submissions are
    /// retained before the sweep task purges them.
    pub retention: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let retention_hours: u64 = match std::env::var("CONCIERGE_RETENTION_HOURS") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "CONCIERGE_RETENTION_HOURS".to_string(),
                message: format!("'{raw}' is not a number of hours"),
            })?,
            Err(_) => 72,
        };

        let output_dir = std::env::var("CONCIERGE_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./output"));
        std::fs::create_dir_all(&output_dir)?;

        Ok(Self {
            chat: ChatConfig::from_env()?,
            org: OrgConfig::from_env()?,
            calendar: CalendarConfig::from_env(),
            rewrite: RewriteConfig::from_env(),
            border_color: [0, 105, 62],
            border_width: 8,
            output_dir,
            retention: Duration::from_secs(retention_hours * 3600),
        })
    }
}
