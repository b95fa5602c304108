//! Progress accumulator for approval orchestration.
//!
//! Each orchestration step appends tagged outcome lines instead of
//! mutating status ad hoc; the final status is computed once from the
//! whole report. Individual steps are best-effort, but the rollup is
//! all-or-nothing: any warning or failure keeps the request at
//! `ReadyForWebsite` so the admin sees a needs-follow-up signal.

use super::model::OnboardingStatus;

/// Tag for a single orchestration outcome line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Warning,
    Failure,
}

/// One recorded line.
#[derive(Debug, Clone)]
pub struct Line {
    pub outcome: Outcome,
    pub text: String,
}

/// Accumulated outcomes of one approval orchestration run.
#[derive(Debug, Clone, Default)]
pub struct ProgressReport {
    lines: Vec<Line>,
}

impl ProgressReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.lines.push(Line {
            outcome: Outcome::Success,
            text: text.into(),
        });
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.lines.push(Line {
            outcome: Outcome::Warning,
            text: text.into(),
        });
    }

    pub fn fail(&mut self, text: impl Into<String>) {
        self.lines.push(Line {
            outcome: Outcome::Failure,
            text: text.into(),
        });
    }

    /// Success lines, in the order recorded.
    pub fn successes(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|l| l.outcome == Outcome::Success)
            .map(|l| l.text.as_str())
            .collect()
    }

    /// Warning and failure lines, in the order recorded.
    pub fn issues(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|l| l.outcome != Outcome::Success)
            .map(|l| l.text.as_str())
            .collect()
    }

    /// Whether the run collected zero issues.
    pub fn is_clean(&self) -> bool {
        self.lines.iter().all(|l| l.outcome == Outcome::Success)
    }

    /// Final status rollup: `Completed` iff the run was clean, else the
    /// request stays at `ReadyForWebsite`. Partial success never
    /// reports as `Completed`.
    pub fn final_status(&self) -> OnboardingStatus {
        if self.is_clean() {
            OnboardingStatus::Completed
        } else {
            OnboardingStatus::ReadyForWebsite
        }
    }
}
