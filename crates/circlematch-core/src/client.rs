use std::fs;
use std::path::{Path, PathBuf};

use crate::assembler::CircleAssembler;
use crate::calendar::SlotCalendar;
use crate::config::AppConfig;
use crate::error::Result;
use crate::orchestrator::MatchingOrchestrator;
use crate::partition::GroupPartitioner;
use crate::state::SqliteStateStore;

mod matching_service;
mod request_log_service;
mod waitlist_service;

pub const STATE_DB_FILE_NAME: &str = ".circlematch_state.sqlite3";

/// Workspace-rooted facade: configuration, the SQLite store and the matching
/// pipeline wired together, with every mutation recorded in the request log.
pub struct CircleMatch {
    root: PathBuf,
    config: AppConfig,
    pub state: SqliteStateStore,
    calendar: SlotCalendar,
    partitioner: GroupPartitioner,
    assembler: CircleAssembler,
}

impl std::fmt::Debug for CircleMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircleMatch")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl CircleMatch {
    /// Loads `circlematch.toml` (if any) and environment overrides from `root_dir`.
    pub fn new(root_dir: impl Into<PathBuf>) -> Result<Self> {
        let root = root_dir.into();
        let config = AppConfig::load(&root)?;
        Self::with_config(root, config)
    }

    pub fn with_config(root_dir: impl Into<PathBuf>, config: AppConfig) -> Result<Self> {
        let root = root_dir.into();
        config.validate()?;
        fs::create_dir_all(&root)?;
        let state = SqliteStateStore::open(root.join(STATE_DB_FILE_NAME))?;
        let calendar = SlotCalendar::new(config.calendar.clone())?;
        let partitioner = GroupPartitioner::from_config(&config.matching);
        let assembler = CircleAssembler::new(config.resources.clone());

        Ok(Self {
            root,
            config,
            state,
            calendar,
            partitioner,
            assembler,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub const fn calendar(&self) -> &SlotCalendar {
        &self.calendar
    }

    fn orchestrator(&self) -> MatchingOrchestrator<'_> {
        MatchingOrchestrator::new(
            &self.calendar,
            &self.partitioner,
            &self.assembler,
            &self.state,
            &self.state,
        )
    }
}
