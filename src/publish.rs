//! The publish state machine: one logical "publish" stitched together from
//! the pipeline's independent write, build-status, and deploy calls.
//!
//! The poll loop has no retry cap and no timeout; backing-store builds can
//! be slow and the reference behavior is to wait them out. The interval is
//! configurable and a [`CancelToken`] gives callers (and tests) a way to
//! stop the loop without real elapsed time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::model::ScheduleConfig;
use crate::pipeline::{BuildStatus, PipelineError, SchedulePipeline, UpdateRequest};

/// Where a publish attempt stands.
///
/// `VersionConflict` and `Failed` are terminal; they return to `Idle` when
/// the caller acknowledges a successful reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    Idle = 0,
    InProgress = 1,
    VersionConflict = 2,
    Failed = 3,
}

/// Cooperative cancellation for the poll loop.
///
/// Cloned tokens share the same flag, so one can live on another thread (or
/// in a signal handler) while the publisher holds the original.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    // TODO: remove once publish cancellation is wired to a Ctrl-C handler.
    #[allow(dead_code)]
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Drives the publish sequence against a pipeline.
pub struct Publisher<P> {
    pipeline: P,
    poll_interval: Duration,
    cancel: CancelToken,
    state: PublishState,
}

impl<P: SchedulePipeline> Publisher<P> {
    pub fn new(pipeline: P, poll_interval: Duration) -> Self {
        Self {
            pipeline,
            poll_interval,
            cancel: CancelToken::new(),
            state: PublishState::Idle,
        }
    }

    /// A token that cancels this publisher's poll loop when triggered.
    // TODO: remove once publish cancellation is wired to a Ctrl-C handler.
    #[allow(dead_code)]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> PublishState {
        self.state
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// Publish the full current config.
    ///
    /// Submits the config (with the version token captured at load), polls
    /// the build until it is terminal, then deploys. Every pipeline failure
    /// is absorbed into one of the terminal states; no transport error
    /// escapes to the editing surface.
    ///
    /// Returns the resulting state: `Idle` on success (the caller should
    /// reload to observe the new version and statuses), `VersionConflict`
    /// when another writer got there first (reload and re-stage), `Failed`
    /// for anything else, including cancellation.
    pub fn publish(&mut self, config: &ScheduleConfig) -> PublishState {
        self.state = PublishState::InProgress;

        let receipt = match self.pipeline.update(UpdateRequest::from_config(config)) {
            Ok(receipt) => receipt,
            Err(PipelineError::VersionConflict { .. }) => {
                self.state = PublishState::VersionConflict;
                return self.state;
            }
            Err(_) => {
                self.state = PublishState::Failed;
                return self.state;
            }
        };

        loop {
            if self.cancel.is_cancelled() {
                self.state = PublishState::Failed;
                return self.state;
            }

            match self.pipeline.build_status(&receipt.build_id) {
                Ok(BuildStatus::Completed) => break,
                Ok(BuildStatus::Pending) => thread::sleep(self.poll_interval),
                Ok(BuildStatus::Failed | BuildStatus::Error) | Err(_) => {
                    self.state = PublishState::Failed;
                    return self.state;
                }
            }
        }

        match self.pipeline.deploy(&receipt.build_id) {
            Ok(_) => self.state = PublishState::Idle,
            Err(_) => self.state = PublishState::Failed,
        }

        self.state
    }

    /// Return a terminal state to `Idle` after the caller reloaded.
    pub fn acknowledge_reload(&mut self) {
        if self.state != PublishState::InProgress {
            self.state = PublishState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::collections::VecDeque;

    use crate::pipeline::{DeployReceipt, Listing, Result, UpdateReceipt};

    /// Scripted pipeline double: canned responses out, call log in.
    #[derive(Default)]
    struct ScriptedPipeline {
        update_response: Option<core::result::Result<String, PipelineError>>,
        build_statuses: RefCell<VecDeque<BuildStatus>>,
        deploy_fails: bool,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedPipeline {
        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl SchedulePipeline for &ScriptedPipeline {
        fn list(&self) -> Result<Listing> {
            self.calls.borrow_mut().push("list".to_string());
            Ok(Listing {
                config: ScheduleConfig::default(),
                version_is_deployed: true,
            })
        }

        fn update(&self, _update: UpdateRequest) -> Result<UpdateReceipt> {
            self.calls.borrow_mut().push("update".to_string());
            match &self.update_response {
                Some(Ok(build_id)) => Ok(UpdateReceipt {
                    build_id: build_id.clone(),
                }),
                Some(Err(PipelineError::VersionConflict { supplied, current })) => {
                    Err(PipelineError::VersionConflict {
                        supplied: supplied.clone(),
                        current: current.clone(),
                    })
                }
                _ => Err(PipelineError::UnknownBuild("scripted failure".to_string())),
            }
        }

        fn build_status(&self, build_id: &str) -> Result<BuildStatus> {
            self.calls.borrow_mut().push(format!("status {build_id}"));
            // An empty script means the build never terminates; cancellation
            // tests rely on perpetual pending.
            Ok(self
                .build_statuses
                .borrow_mut()
                .pop_front()
                .unwrap_or(BuildStatus::Pending))
        }

        fn deploy(&self, build_id: &str) -> Result<DeployReceipt> {
            self.calls.borrow_mut().push(format!("deploy {build_id}"));
            if self.deploy_fails {
                return Err(PipelineError::BuildNotCompleted(build_id.to_string()));
            }
            Ok(DeployReceipt {
                deployment_id: "d1".to_string(),
            })
        }
    }

    fn publisher(pipeline: &ScriptedPipeline) -> Publisher<&ScriptedPipeline> {
        Publisher::new(pipeline, Duration::ZERO)
    }

    #[test]
    fn happy_path_returns_to_idle() {
        let pipeline = ScriptedPipeline {
            update_response: Some(Ok("b1".to_string())),
            build_statuses: RefCell::new(VecDeque::from([
                BuildStatus::Pending,
                BuildStatus::Completed,
            ])),
            ..Default::default()
        };

        let mut publisher = publisher(&pipeline);
        assert_eq!(publisher.state(), PublishState::Idle);

        let state = publisher.publish(&ScheduleConfig::default());

        assert_eq!(state, PublishState::Idle);
        assert_eq!(
            pipeline.calls(),
            ["update", "status b1", "status b1", "deploy b1"]
        );
    }

    #[test]
    fn version_conflict_stops_before_any_build_call() {
        let pipeline = ScriptedPipeline {
            update_response: Some(Err(PipelineError::VersionConflict {
                supplied: "old".to_string(),
                current: "new".to_string(),
            })),
            ..Default::default()
        };

        let mut publisher = publisher(&pipeline);
        let state = publisher.publish(&ScheduleConfig::default());

        assert_eq!(state, PublishState::VersionConflict);
        assert_eq!(pipeline.calls(), ["update"]);
    }

    #[test]
    fn update_failure_is_terminal() {
        let pipeline = ScriptedPipeline::default();

        let mut publisher = publisher(&pipeline);
        let state = publisher.publish(&ScheduleConfig::default());

        assert_eq!(state, PublishState::Failed);
        assert_eq!(pipeline.calls(), ["update"]);
    }

    #[test]
    fn failed_build_is_terminal_without_deploy() {
        let pipeline = ScriptedPipeline {
            update_response: Some(Ok("b1".to_string())),
            build_statuses: RefCell::new(VecDeque::from([
                BuildStatus::Pending,
                BuildStatus::Failed,
            ])),
            ..Default::default()
        };

        let mut publisher = publisher(&pipeline);
        let state = publisher.publish(&ScheduleConfig::default());

        assert_eq!(state, PublishState::Failed);
        assert_eq!(pipeline.calls(), ["update", "status b1", "status b1"]);
    }

    #[test]
    fn deploy_failure_is_terminal() {
        let pipeline = ScriptedPipeline {
            update_response: Some(Ok("b1".to_string())),
            build_statuses: RefCell::new(VecDeque::from([BuildStatus::Completed])),
            deploy_fails: true,
            ..Default::default()
        };

        let mut publisher = publisher(&pipeline);
        let state = publisher.publish(&ScheduleConfig::default());

        assert_eq!(state, PublishState::Failed);
    }

    #[test]
    fn cancel_token_stops_an_endless_poll() {
        let pipeline = ScriptedPipeline {
            update_response: Some(Ok("b1".to_string())),
            // Empty script: the build reports pending forever.
            ..Default::default()
        };

        let mut publisher = publisher(&pipeline);
        let token = publisher.cancel_token();

        // Cancel from another thread while the loop polls.
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            token.cancel();
        });

        let state = publisher.publish(&ScheduleConfig::default());
        handle.join().unwrap();

        assert_eq!(state, PublishState::Failed);
    }

    #[test]
    fn acknowledge_reload_returns_terminal_states_to_idle() {
        let pipeline = ScriptedPipeline::default();
        let mut publisher = publisher(&pipeline);

        publisher.publish(&ScheduleConfig::default());
        assert_eq!(publisher.state(), PublishState::Failed);

        publisher.acknowledge_reload();
        assert_eq!(publisher.state(), PublishState::Idle);
    }
}
