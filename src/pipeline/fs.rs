//! File-backed pipeline implementation.
//!
//! The store is a directory:
//!
//! ```text
//! <root>/
//!   revisions/<id>.json   # staged rule/schedule content, one file per revision
//!   builds/<id>.json      # build records pointing at a revision
//!   latest                # id of the most recently staged revision (the version token)
//!   deployed              # id of the revision currently live
//! ```
//!
//! The `latest` pointer is the version token handed out by List and checked
//! by Update; pointer files are written via temp-file-and-rename so the
//! compare-and-swap is atomic from the caller's point of view. Builds for a
//! local store have no real work to do beyond revalidating the staged
//! content; that happens lazily on the first status poll, preserving the
//! pending state and the four-call shape the publisher expects.

use std::fs;
use std::path::PathBuf;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Rule, Schedule, ScheduleConfig};
use crate::resolver;

use super::{
    BuildStatus, DeployReceipt, Listing, PipelineError, Result, SchedulePipeline, UpdateReceipt,
    UpdateRequest,
};

const LATEST: &str = "latest";
const DEPLOYED: &str = "deployed";

/// What a revision file holds. The version is the file's id, and statuses
/// are transient, so neither is persisted.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RevisionContent {
    #[serde(default)]
    rules: Vec<Rule>,

    #[serde(default)]
    schedules: Vec<Schedule>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BuildRecord {
    id: String,
    revision: String,
    status: BuildStatus,
}

/// Local file-based versioned store.
pub struct FsPipeline {
    root: PathBuf,
}

impl FsPipeline {
    /// Open (or initialize) a store rooted at the given directory.
    ///
    /// A fresh store is seeded with an empty, deployed revision so List
    /// always has a version token to hand out.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("revisions"))?;
        fs::create_dir_all(root.join("builds"))?;

        let pipeline = Self { root };

        if pipeline.read_pointer(LATEST)?.is_none() {
            let revision = Uuid::new_v4().to_string();
            pipeline.write_revision(&revision, &RevisionContent::default())?;
            pipeline.write_pointer(LATEST, &revision)?;
            pipeline.write_pointer(DEPLOYED, &revision)?;
        }

        Ok(pipeline)
    }

    // ── Files ──

    fn revision_path(&self, id: &str) -> PathBuf {
        self.root.join("revisions").join(format!("{id}.json"))
    }

    fn build_path(&self, id: &str) -> PathBuf {
        self.root.join("builds").join(format!("{id}.json"))
    }

    fn write_revision(&self, id: &str, content: &RevisionContent) -> Result<()> {
        let json = serde_json::to_string_pretty(content)?;
        fs::write(self.revision_path(id), json)?;
        Ok(())
    }

    fn read_revision(&self, id: &str) -> Result<RevisionContent> {
        let json = fs::read_to_string(self.revision_path(id))?;
        Ok(serde_json::from_str(&json)?)
    }

    fn write_build(&self, record: &BuildRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(record)?;
        fs::write(self.build_path(&record.id), json)?;
        Ok(())
    }

    fn read_build(&self, id: &str) -> Result<BuildRecord> {
        let path = self.build_path(id);
        if !path.exists() {
            return Err(PipelineError::UnknownBuild(id.to_string()));
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Read a pointer file. Missing file means the pointer is unset.
    fn read_pointer(&self, name: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.root.join(name)) {
            Ok(value) => Ok(Some(value.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Swap a pointer atomically: write to a temp file, then rename over.
    fn write_pointer(&self, name: &str, value: &str) -> Result<()> {
        let tmp = self.root.join(format!("{name}.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(tmp, self.root.join(name))?;
        Ok(())
    }

    /// The version token Update checks against.
    fn current_version(&self) -> Result<String> {
        // Seeded in `new`; a missing pointer here is a corrupted store.
        self.read_pointer(LATEST)?.ok_or_else(|| {
            PipelineError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "store has no latest revision pointer",
            ))
        })
    }

    /// Run the (local) build for a revision: revalidate that the staged
    /// content still reads back cleanly.
    fn run_build(&self, revision: &str) -> BuildStatus {
        match self.read_revision(revision) {
            Ok(_) => BuildStatus::Completed,
            Err(_) => BuildStatus::Failed,
        }
    }
}

impl SchedulePipeline for FsPipeline {
    fn list(&self) -> Result<Listing> {
        let version = self.current_version()?;
        let content = self.read_revision(&version)?;
        let deployed = self.read_pointer(DEPLOYED)?;

        let now = Timestamp::now();
        let mut schedules = content.schedules;
        for schedule in &mut schedules {
            let status = resolver::resolve(schedule, &content.rules, now);
            schedule.status = Some(status);
        }

        Ok(Listing {
            version_is_deployed: deployed.as_deref() == Some(version.as_str()),
            config: ScheduleConfig {
                rules: content.rules,
                schedules,
                version,
            },
        })
    }

    fn update(&self, update: UpdateRequest) -> Result<UpdateReceipt> {
        let current = self.current_version()?;
        if update.version != current {
            return Err(PipelineError::VersionConflict {
                supplied: update.version,
                current,
            });
        }

        // Statuses are transient; never persist one that was passed back.
        let mut schedules = update.schedules;
        for schedule in &mut schedules {
            schedule.status = None;
        }

        let revision = Uuid::new_v4().to_string();
        self.write_revision(
            &revision,
            &RevisionContent {
                rules: update.rules,
                schedules,
            },
        )?;

        let record = BuildRecord {
            id: Uuid::new_v4().to_string(),
            revision: revision.clone(),
            status: BuildStatus::Pending,
        };
        self.write_build(&record)?;

        // The new revision becomes the version token as soon as it is
        // staged; List reports whether it is deployed yet.
        self.write_pointer(LATEST, &revision)?;

        Ok(UpdateReceipt {
            build_id: record.id,
        })
    }

    fn build_status(&self, build_id: &str) -> Result<BuildStatus> {
        let mut record = self.read_build(build_id)?;

        if record.status == BuildStatus::Pending {
            record.status = self.run_build(&record.revision);
            self.write_build(&record)?;
        }

        Ok(record.status)
    }

    fn deploy(&self, build_id: &str) -> Result<DeployReceipt> {
        let record = self.read_build(build_id)?;

        if record.status != BuildStatus::Completed {
            return Err(PipelineError::BuildNotCompleted(build_id.to_string()));
        }

        self.write_pointer(DEPLOYED, &record.revision)?;

        Ok(DeployReceipt {
            deployment_id: Uuid::new_v4().to_string(),
        })
    }
}
