// SPDX-License-Identifier: MIT

//! Per-graph execution session state

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::plan::ExecutionPlan;
use crate::flow::error::Result;
use crate::flow::graph::{GraphArena, NodeFilter, NodeId};

/// Lifecycle of an execution session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// No execution request yet
    Idle,
    Running,
    /// Nothing executing and nothing waiting on input
    Quiescent,
    /// Quiesced with at least one interactive node ready for a value
    WaitingOnInput,
    /// Quiesced, no progress possible, and at least one node failed
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "IDLE",
            SessionState::Running => "RUNNING",
            SessionState::Quiescent => "QUIESCENT",
            SessionState::WaitingOnInput => "WAITING_ON_INPUT",
            SessionState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Monotone marker of finished node executions
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CompletedStep {
    /// Number of node executions finished in this session
    pub count: u64,
    /// Node that finished last
    pub node: Option<NodeId>,
}

/// Everything guarded by the session lock
pub struct ExecutionSession {
    pub(crate) id: Uuid,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) arena: GraphArena,
    pub(crate) plan: ExecutionPlan,
    /// Nodes requested by the current pass and not yet run
    pub(crate) scheduled: HashSet<NodeId>,
    /// Nodes in `EXECUTING`
    pub(crate) executing: HashSet<NodeId>,
    /// Background tasks of executing nodes
    pub(crate) tasks: HashMap<NodeId, JoinHandle<()>>,
    pub(crate) state: SessionState,
    pub(crate) passes: u64,
    /// Classifier deciding `WAITING_ON_INPUT`, taken from the last request
    pub(crate) waiting_filter: NodeFilter,
    pub(crate) last_completed: CompletedStep,
}

impl ExecutionSession {
    pub fn new(arena: GraphArena) -> Result<Self> {
        let plan = ExecutionPlan::build(&arena)?;
        let id = Uuid::new_v4();
        log::info!(
            "Created execution session {} for '{}' ({} nodes)",
            id,
            arena.root().name(),
            plan.order().len()
        );
        Ok(Self {
            id,
            started_at: Utc::now(),
            arena,
            plan,
            scheduled: HashSet::new(),
            executing: HashSet::new(),
            tasks: HashMap::new(),
            state: SessionState::Idle,
            passes: 0,
            waiting_filter: NodeFilter::interactive(),
            last_completed: CompletedStep::default(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn arena(&self) -> &GraphArena {
        &self.arena
    }

    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// No node is executing
    pub fn is_quiescent(&self) -> bool {
        self.executing.is_empty()
    }

    /// Filter the session state is judged by
    pub fn waiting_filter(&self) -> NodeFilter {
        self.waiting_filter
    }

    pub fn last_completed(&self) -> &CompletedStep {
        &self.last_completed
    }
}
