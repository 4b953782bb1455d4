// SPDX-License-Identifier: MIT

//! Public entry point of the execution core
//!
//! Scheduling operations enqueue work and return. Node executions run as
//! tokio tasks; every state change happens under one session lock, and
//! waiters are woken through a condition variable (blocking callers) and a
//! `Notify` (async callers).

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use uuid::Uuid;

use super::config::EngineConfig;
use super::scheduler::{Job, Outcome, RunTicket, Scheduler, Work};
use super::scope::WorkflowScope;
use super::session::{CompletedStep, ExecutionSession, SessionState};
use crate::flow::error::Result;
use crate::flow::graph::{GraphArena, NodeFilter, NodeId, NodeSnapshot, NodeState};
use crate::flow::page::PageDescriptor;

struct Shared {
    session: Mutex<ExecutionSession>,
    changed: Condvar,
    notify: Notify,
    scheduler: Scheduler,
    runtime: Handle,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ExecutionSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wake(&self) {
        self.changed.notify_all();
        self.notify.notify_waiters();
    }
}

/// Orchestrates execution of one workflow session
pub struct ExecutionController {
    shared: Arc<Shared>,
    config: EngineConfig,
}

impl ExecutionController {
    /// Start a session over `arena`; node executions are spawned on `runtime`
    pub fn new(arena: GraphArena, config: EngineConfig, runtime: Handle) -> Result<Self> {
        let mut session = ExecutionSession::new(arena)?;
        let scheduler = Scheduler::new(config.max_parallel_nodes);
        scheduler.refresh_readiness(&mut session);

        Ok(Self {
            shared: Arc::new(Shared {
                session: Mutex::new(session),
                changed: Condvar::new(),
                notify: Notify::new(),
                scheduler,
                runtime,
            }),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn root_id(&self) -> NodeId {
        self.shared.lock().arena.root_id().clone()
    }

    pub fn session_id(&self) -> Uuid {
        self.shared.lock().id()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.shared.lock().started_at()
    }

    pub fn session_state(&self) -> SessionState {
        self.shared.lock().state()
    }

    pub fn last_completed_step(&self) -> CompletedStep {
        self.shared.lock().last_completed().clone()
    }

    /// No node is executing
    pub fn is_quiescent(&self) -> bool {
        self.shared.lock().is_quiescent()
    }

    pub fn state(&self, id: &NodeId) -> Result<NodeState> {
        self.shared.lock().arena.state(id)
    }

    pub fn snapshot(&self, id: &NodeId) -> Result<NodeSnapshot> {
        self.shared.lock().arena.node(id).map(|n| n.snapshot())
    }

    /// Copies of every node, in execution order
    pub fn snapshots(&self) -> Vec<NodeSnapshot> {
        let session = self.shared.lock();
        session
            .plan
            .order()
            .iter()
            .filter_map(|id| session.arena.node(id).ok().map(|n| n.snapshot()))
            .collect()
    }

    /// Outputs of the root graph's sink nodes, `None` where not executed
    pub fn sink_outputs(&self) -> BTreeMap<NodeId, Option<Value>> {
        let session = self.shared.lock();
        let root = session.arena.root();
        root.sinks()
            .into_iter()
            .map(|id| {
                let output = root.node(&id).ok().and_then(|n| n.output.clone());
                (id, output)
            })
            .collect()
    }

    /// Execute `target` and whatever it depends on; returns immediately
    pub fn execute(&self, target: &NodeId) -> Result<RunTicket> {
        self.request(|scheduler, session| scheduler.request_up_to(session, target))
    }

    /// Execute every node; returns immediately
    pub fn execute_all(&self) -> RunTicket {
        self.request(|scheduler, session| scheduler.request_all(session))
    }

    /// Execute up to, not including, the next unexecuted node matching
    /// `filter`; returns immediately
    pub fn step_execution_up_to_node_type(&self, filter: NodeFilter) -> RunTicket {
        self.request(|scheduler, session| scheduler.request_step(session, filter))
    }

    /// Run a scheduling request under the lock, then dispatch what became ready
    fn request<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Scheduler, &mut ExecutionSession) -> R,
    {
        let mut session = self.shared.lock();
        let outcome = f(&self.shared.scheduler, &mut session);
        pump(&self.shared, &mut session);
        drop(session);
        self.shared.wake();
        outcome
    }

    /// Waiting interactive nodes in every graph of the session
    pub fn find_waiting_nodes(&self, filter: NodeFilter) -> BTreeMap<NodeId, NodeSnapshot> {
        let session = self.shared.lock();
        self.shared.scheduler.find_waiting_nodes(&session, filter)
    }

    /// The graph holding the next waiting node, root or nested
    pub fn find_next_waiting_scope(&self, filter: NodeFilter) -> Option<WorkflowScope<'_>> {
        let graph = {
            let session = self.shared.lock();
            self.shared.scheduler.find_next_waiting_graph(&session, filter)
        }?;
        Some(WorkflowScope::new(self, graph))
    }

    /// Scope of the root graph or of a sub-graph node
    pub fn scope(&self, graph: &NodeId) -> Result<WorkflowScope<'_>> {
        self.shared.lock().arena.graph(graph)?;
        Ok(WorkflowScope::new(self, graph.clone()))
    }

    pub fn root_scope(&self) -> WorkflowScope<'_> {
        WorkflowScope::new(self, self.root_id())
    }

    pub(crate) fn find_waiting_nodes_in(
        &self,
        graph: &NodeId,
        filter: NodeFilter,
    ) -> Result<BTreeMap<NodeId, NodeSnapshot>> {
        let session = self.shared.lock();
        self.shared
            .scheduler
            .find_waiting_nodes_in(&session, graph, filter)
    }

    pub(crate) fn graph_name(&self, graph: &NodeId) -> Option<String> {
        let session = self.shared.lock();
        session.arena.graph(graph).ok().map(|g| g.name().to_string())
    }

    /// Block until no node is executing or `timeout` elapses
    ///
    /// Returns `false` on timeout; running nodes keep running. Do not call
    /// this from a runtime worker thread, use
    /// [`wait_while_executing_async`](Self::wait_while_executing_async).
    pub fn wait_while_executing(&self, timeout: Duration) -> bool {
        let session = self.shared.lock();
        let (session, _) = self
            .shared
            .changed
            .wait_timeout_while(session, timeout, |s| !s.is_quiescent())
            .unwrap_or_else(PoisonError::into_inner);
        let quiescent = session.is_quiescent();
        if !quiescent {
            log::warn!(
                "Still executing {} nodes after {:?}",
                session.executing.len(),
                timeout
            );
        }
        quiescent
    }

    /// [`wait_while_executing`](Self::wait_while_executing) with the
    /// configured timeout
    pub fn wait(&self) -> bool {
        self.wait_while_executing(self.config.wait_timeout)
    }

    /// Async flavour of [`wait_while_executing`](Self::wait_while_executing)
    pub async fn wait_while_executing_async(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_quiescent() {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                let quiescent = self.is_quiescent();
                if !quiescent {
                    log::warn!("Still executing after {:?}", timeout);
                }
                return quiescent;
            }
        }
    }

    /// Reset a node and everything downstream of it
    pub fn reset(&self, id: &NodeId) -> Result<Vec<NodeId>> {
        let reset = {
            let mut session = self.shared.lock();
            self.shared.scheduler.reset(&mut session, id)?
        };
        self.shared.wake();
        Ok(reset)
    }

    pub fn reset_all(&self) -> Result<Vec<NodeId>> {
        let reset = {
            let mut session = self.shared.lock();
            self.shared.scheduler.reset_all(&mut session)?
        };
        self.shared.wake();
        Ok(reset)
    }

    /// Describe the waiting interactive nodes of `container` as a page
    pub fn get_page(&self, container: &NodeId) -> Result<PageDescriptor> {
        let session = self.shared.lock();
        PageDescriptor::assemble(&session.arena, container)
    }

    /// Push externally supplied values into waiting nodes of `container`
    ///
    /// All-or-nothing; nothing is executed. Returns the nodes that received
    /// a value.
    pub fn apply_page_values(
        &self,
        values: &BTreeMap<String, Value>,
        container: &NodeId,
    ) -> Result<Vec<NodeId>> {
        let applied = {
            let mut session = self.shared.lock();
            self.shared
                .scheduler
                .apply_values(&mut session, container, values)?
        };
        self.shared.wake();
        Ok(applied)
    }
}

impl Drop for ExecutionController {
    fn drop(&mut self) {
        let mut session = self.shared.lock();
        for (id, task) in session.tasks.drain() {
            log::debug!("Aborting node {} on session teardown", id);
            task.abort();
        }
    }
}

/// Dispatch ready nodes and refresh the session state
fn pump(shared: &Arc<Shared>, session: &mut ExecutionSession) {
    for job in shared.scheduler.dispatch(session) {
        let id = job.id.clone();
        let task = shared.runtime.spawn(run_job(Arc::clone(shared), job));
        session.tasks.insert(id, task);
    }
    shared.scheduler.settle(session);
}

async fn run_job(shared: Arc<Shared>, job: Job) {
    let Job { id, work } = job;
    let outcome: Outcome = match work {
        Work::Ready(output) => Ok(output),
        Work::Model { model, inputs } => {
            let type_name = model.type_name().to_string();
            match tokio::spawn(async move { model.execute(inputs).await }).await {
                Ok(Ok(output)) => Ok(output),
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) if e.is_panic() => Err(format!("{} node panicked", type_name)),
                Err(_) => Err(format!("{} node was cancelled", type_name)),
            }
        }
    };

    {
        let mut session = shared.lock();
        session.tasks.remove(&id);
        shared.scheduler.complete(&mut session, &id, outcome);
        pump(&shared, &mut session);
    }
    shared.wake();
}
