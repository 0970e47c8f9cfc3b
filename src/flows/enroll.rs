//! TOTP enrollment flow: `Idle -> Requesting -> {Ready, Failed}`.
//!
//! Each request fetches a brand-new provisioning artifact; the previous
//! one is discarded the moment a new request starts. The backend
//! supersedes the old secret on every call, so replaying a stale artifact
//! would let the user enroll a device against a secret that no longer
//! verifies.

use tracing::error;

use crate::api::ApiError;
use crate::models::EnrollmentArtifact;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollPhase {
    Idle,
    Requesting,
    Ready,
    Failed,
}

pub struct EnrollFlow {
    phase: EnrollPhase,
    artifact: Option<EnrollmentArtifact>,
    pub error: Option<String>,
}

impl EnrollFlow {
    pub fn new() -> Self {
        Self {
            phase: EnrollPhase::Idle,
            artifact: None,
            error: None,
        }
    }

    pub fn phase(&self) -> EnrollPhase {
        self.phase
    }

    pub fn artifact(&self) -> Option<&EnrollmentArtifact> {
        self.artifact.as_ref()
    }

    /// Start a provisioning request. Returns false when one is already in
    /// flight. Any previously displayed artifact is dropped immediately.
    pub fn begin_request(&mut self) -> bool {
        if self.phase == EnrollPhase::Requesting {
            return false;
        }
        self.phase = EnrollPhase::Requesting;
        self.artifact = None;
        self.error = None;
        true
    }

    /// Finish the request. The failure path must tolerate the session
    /// having been cleared by a concurrent 401 - it simply lands in
    /// `Failed` with the auth failure's message, and the guard takes
    /// over on the next draw.
    pub fn complete(&mut self, result: Result<EnrollmentArtifact, ApiError>) {
        match result {
            Ok(artifact) => {
                self.artifact = Some(artifact);
                self.error = None;
                self.phase = EnrollPhase::Ready;
            }
            Err(e) => {
                error!(error = %e, "TOTP provisioning request failed");
                self.error = Some(e.user_message());
                self.phase = EnrollPhase::Failed;
            }
        }
    }

    /// Drop the artifact and reset, called when the enrollment screen is
    /// left. The artifact never outlives the view that displays it.
    pub fn discard(&mut self) {
        self.artifact = None;
        self.error = None;
        self.phase = EnrollPhase::Idle;
    }
}
