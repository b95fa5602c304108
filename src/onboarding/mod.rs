//! Onboarding request lifecycle: entity, state machine, approval
//! orchestration, message composition, and workflow correlation.

pub mod approval;
pub mod correlator;
pub mod messages;
pub mod model;
pub mod report;
pub mod service;

pub use correlator::{PartialSubmission, SubmissionFields, parse_submission};
pub use model::{OnboardingRequest, OnboardingStatus};
pub use report::ProgressReport;
pub use service::{Deps, OnboardingService, ProfileForm, Settings};
