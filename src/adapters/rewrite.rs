//! Bio rewriting adapter — restyles member bios with Claude.
//!
//! Edits bios to match the lab's website style: third person, first
//! names after the first mention, 3-4 sentences, nothing private.

use async_trait::async_trait;
use regex::Regex;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::anthropic;
use secrecy::ExposeSecret;

use crate::config::RewriteConfig;
use crate::error::RewriteError;

/// Style guidance given to the model.
const STYLE_GUIDELINES: &str = "\
Style guidelines for lab member bios:
1. Use third person voice (e.g., \"Jane studies...\" not \"I study...\")
2. Use first names only after the first mention
3. Keep it to 3-4 sentences maximum
4. Write in a clear, engaging, and fun style
5. Focus on research interests and personality
6. Remove any private information (addresses, phone numbers, personal emails)
7. Remove any inappropriate content
8. Match the tone of existing lab bios - professional but personable";

/// Few-shot examples in the target register.
const EXAMPLE_BIOS: &str = "\
Example edited bios from the lab website:

Example 1:
\"Jeremy is an associate professor and directs the lab. He enjoys thinking about brains, computers, and cats.\"

Example 2:
\"Paxton graduated in 2019 with a BA in neuroscience and is continuing his research in the lab. He's interested in how we represent and understand narratives and how those processes relate to memory.\"

Example 3:
\"Lucy joined the lab as a research assistant after graduating. She's excited to explore computational approaches to understanding memory and cognition.\"";

/// Text-rewriting contract.
///
/// Must fail closed: blank input returns an error without an API call.
#[async_trait]
pub trait RewriteAdapter: Send + Sync {
    async fn rewrite(&self, raw_text: &str, subject_name: &str) -> Result<String, RewriteError>;
}

/// Claude-backed rewriter via rig's Anthropic provider.
pub struct ClaudeRewriter {
    client: rig::client::Client<anthropic::client::AnthropicExt>,
    model: String,
}

impl ClaudeRewriter {
    pub fn new(config: &RewriteConfig) -> Result<Self, RewriteError> {
        let client = anthropic::Client::new(config.api_key.expose_secret()).map_err(|e| {
            RewriteError::Provider {
                reason: format!("Failed to create Anthropic client: {e}"),
            }
        })?;
        tracing::info!(model = %config.model, "Bio rewriting enabled");
        Ok(Self {
            client,
            model: config.model.clone(),
        })
    }

    fn prompt_for(&self, raw_text: &str, subject_name: &str) -> String {
        let first_name = subject_name.split_whitespace().next().unwrap_or("the member");
        format!(
            "Please edit the following bio to match our lab's style guidelines.\n\n\
             {STYLE_GUIDELINES}\n\n{EXAMPLE_BIOS}\n\n\
             Member's name: {subject_name}\n\
             First name to use: {first_name}\n\n\
             Original bio:\n{raw_text}\n\n\
             Please provide ONLY the edited bio text, with no additional commentary, \
             explanations, or quotation marks. The bio should be ready to publish as-is."
        )
    }
}

#[async_trait]
impl RewriteAdapter for ClaudeRewriter {
    async fn rewrite(&self, raw_text: &str, subject_name: &str) -> Result<String, RewriteError> {
        if raw_text.trim().is_empty() {
            return Err(RewriteError::EmptyInput);
        }

        let agent = self.client.agent(&self.model).build();
        let response = agent
            .prompt(self.prompt_for(raw_text, subject_name))
            .await
            .map_err(|e| RewriteError::Provider {
                reason: e.to_string(),
            })?;

        // Strip stray surrounding quotes the model sometimes adds.
        let edited = response.trim().trim_matches(['"', '\'']).to_string();

        let warnings = check_bio(&edited, subject_name);
        if !warnings.is_empty() {
            tracing::warn!(name = %subject_name, "Bio lint: {}", warnings.join("; "));
        }

        tracing::info!(
            name = %subject_name,
            "Edited bio: {} -> {} chars",
            raw_text.len(),
            edited.len()
        );
        Ok(edited)
    }
}

/// Lint an edited bio against the style rules. Returns warnings only;
/// a flagged bio is still usable and the admin sees it before approval.
pub fn check_bio(bio: &str, subject_name: &str) -> Vec<String> {
    let mut warnings = Vec::new();

    let sentences = bio
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();
    if sentences > 5 {
        warnings.push(format!("Bio has {sentences} sentences (recommended: 3-4)"));
    }

    let first_person = Regex::new(r"(?i)\b(I|me|my|myself|we|us|our|ourselves)\b").unwrap();
    if first_person.is_match(bio) {
        warnings.push("Bio contains first-person pronouns".to_string());
    }

    let first_name = subject_name.split_whitespace().next().unwrap_or_default();
    if !first_name.is_empty() && !bio.to_lowercase().contains(&first_name.to_lowercase()) {
        warnings.push(format!("Bio doesn't mention '{first_name}'"));
    }

    let phone = Regex::new(r"\b\d{3}[-.\s]?\d{3}[-.\s]?\d{4}\b").unwrap();
    if phone.is_match(bio) {
        warnings.push("Bio may contain a phone number".to_string());
    }
    let email = Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap();
    if email.is_match(bio) {
        warnings.push("Bio may contain an email address".to_string());
    }

    warnings
}
