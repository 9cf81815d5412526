//! The versioned persistence pipeline: four independent, stateless
//! operations against a versioned backing store.
//!
//! Write, build-status, and deploy are separate calls because the build
//! behind a write is asynchronous and can outlast any single request; the
//! publisher stitches them into one logical publish by polling. The trait
//! has one method per logical RPC so the publisher can be driven against a
//! test double.

mod fs;

pub use fs::FsPipeline;

use serde::{Deserialize, Serialize};

use crate::model::{Rule, Schedule, ScheduleConfig};

/// Errors from pipeline operations.
///
/// `VersionConflict` is its own variant because the publisher must surface
/// it as a distinct terminal state, never as a generic failure.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("version conflict: supplied {supplied}, but current is {current}")]
    VersionConflict { supplied: String, current: String },

    #[error("unknown build: {0}")]
    UnknownBuild(String),

    #[error("build {0} has not completed")]
    BuildNotCompleted(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, PipelineError>;

/// Status of an asynchronous build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Pending,
    Completed,
    Failed,
    Error,
}

/// Everything List returns: the config (with `version` populated and a
/// computed status on every schedule) plus whether that version is the one
/// currently deployed. A build can exist without being deployed yet.
#[derive(Debug, Clone)]
pub struct Listing {
    pub config: ScheduleConfig,
    pub version_is_deployed: bool,
}

/// The full rule/schedule set plus the version token captured at load.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub rules: Vec<Rule>,
    pub schedules: Vec<Schedule>,
    pub version: String,
}

impl UpdateRequest {
    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self {
            rules: config.rules.clone(),
            schedules: config.schedules.clone(),
            version: config.version.clone(),
        }
    }
}

/// Returned by a successful write: the id of the build it kicked off.
/// The write does not wait for the build.
#[derive(Debug, Clone)]
pub struct UpdateReceipt {
    pub build_id: String,
}

/// Returned by a successful deploy.
#[derive(Debug, Clone)]
pub struct DeployReceipt {
    pub deployment_id: String,
}

/// One method per logical RPC.
pub trait SchedulePipeline {
    /// Read the current config, with version token, deployment flag, and a
    /// computed status per schedule.
    fn list(&self) -> Result<Listing>;

    /// Stage a new revision and kick off its build.
    ///
    /// Rejects with [`PipelineError::VersionConflict`] when the supplied
    /// version is not the current one; nothing is written in that case.
    fn update(&self, update: UpdateRequest) -> Result<UpdateReceipt>;

    /// Current status of a build, without blocking.
    fn build_status(&self, build_id: &str) -> Result<BuildStatus>;

    /// Promote a completed build to be the live deployment.
    fn deploy(&self, build_id: &str) -> Result<DeployReceipt>;
}
