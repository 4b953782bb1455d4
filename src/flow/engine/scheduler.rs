// SPDX-License-Identifier: MIT

//! Dependency-ordered scheduling of node executions
//!
//! The scheduler never runs anything itself. Requests mark nodes as
//! scheduled, `dispatch` turns the ready ones into jobs, and `complete`
//! records a job's outcome. The controller drives the loop under the session
//! lock.

use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::session::{ExecutionSession, SessionState};
use crate::flow::error::{FlowError, Result};
use crate::flow::graph::{
    GraphArena, NodeFilter, NodeId, NodeIdSuffix, NodeKind, NodeModel, NodeOutput, NodeRecord,
    NodeSnapshot, NodeState,
};

/// Outcome of a node run; the error is the failure message kept on the node
pub type Outcome = std::result::Result<NodeOutput, String>;

/// A node handed out for execution
pub struct Job {
    pub id: NodeId,
    pub work: Work,
}

pub enum Work {
    /// Run an ordinary node's model on its inputs
    Model {
        model: Arc<dyn NodeModel>,
        inputs: Vec<Value>,
    },
    /// Output already known (interactive values, sub-graph results)
    Ready(NodeOutput),
}

/// What a scheduling request enqueued
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunTicket {
    /// Nodes newly scheduled by the request, in execution order
    pub scheduled: Vec<NodeId>,
    /// Interactive node a step request stopped in front of
    pub stop_point: Option<NodeId>,
}

impl RunTicket {
    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    max_parallel: usize,
}

impl Scheduler {
    pub fn new(max_parallel: usize) -> Self {
        Self {
            max_parallel: max_parallel.max(1),
        }
    }

    /// Schedule `target` and every pending node it depends on
    pub fn request_up_to(&self, session: &mut ExecutionSession, target: &NodeId) -> Result<RunTicket> {
        session.arena.node(target)?;
        let ancestors = session.plan.ancestors(target);
        let ids: Vec<NodeId> = session
            .plan
            .order()
            .iter()
            .filter(|id| ancestors.contains(*id))
            .cloned()
            .collect();
        log::info!("Executing up to node {}", target);
        session.waiting_filter = NodeFilter::interactive();
        Ok(self.schedule(session, ids, None))
    }

    /// Schedule every pending node
    pub fn request_all(&self, session: &mut ExecutionSession) -> RunTicket {
        let ids = session.plan.order().to_vec();
        log::info!("Executing all nodes of '{}'", session.arena.root().name());
        session.waiting_filter = NodeFilter::interactive();
        self.schedule(session, ids, None)
    }

    /// Schedule everything before the first unexecuted node matching `filter`
    ///
    /// The stopping point is taken from the flattened topological order, so
    /// it does not depend on how fast independent branches finish.
    pub fn request_step(&self, session: &mut ExecutionSession, filter: NodeFilter) -> RunTicket {
        let order = session.plan.order();
        let stop = order.iter().position(|id| {
            session
                .arena
                .node(id)
                .map(|n| filter.matches(n) && !n.state.is_executed())
                .unwrap_or(false)
        });

        let (ids, stop_point) = match stop {
            Some(p) => (order[..p].to_vec(), Some(order[p].clone())),
            None => (order.to_vec(), None),
        };
        match &stop_point {
            Some(id) => log::info!("Stepping execution up to interactive node {}", id),
            None => log::info!("No interactive node left, stepping executes everything"),
        }
        session.waiting_filter = filter;
        self.schedule(session, ids, stop_point)
    }

    fn schedule(
        &self,
        session: &mut ExecutionSession,
        ids: Vec<NodeId>,
        stop_point: Option<NodeId>,
    ) -> RunTicket {
        session.passes += 1;
        let mut scheduled = Vec::new();
        for id in ids {
            let pending = session
                .arena
                .node(&id)
                .map(|n| n.state.is_pending())
                .unwrap_or(false);
            if pending && session.scheduled.insert(id.clone()) {
                scheduled.push(id);
            }
        }
        log::debug!("Scheduled {} nodes", scheduled.len());
        RunTicket {
            scheduled,
            stop_point,
        }
    }

    /// Hand out every scheduled node whose effective upstream is executed,
    /// up to the parallelism limit
    pub fn dispatch(&self, session: &mut ExecutionSession) -> Vec<Job> {
        let mut jobs = Vec::new();
        if session.scheduled.is_empty() {
            return jobs;
        }

        let candidates: Vec<NodeId> = session
            .plan
            .order()
            .iter()
            .filter(|id| session.scheduled.contains(*id))
            .cloned()
            .collect();

        for id in candidates {
            if session.executing.len() >= self.max_parallel {
                break;
            }
            if !self.is_ready(session, &id) {
                continue;
            }
            let work = match self.prepare(session, &id) {
                Ok(work) => work,
                Err(e) => {
                    log::error!("Cannot prepare node {}: {}", id, e);
                    continue;
                }
            };
            if let Ok(node) = session.arena.node_mut(&id) {
                node.state = NodeState::Executing;
                node.message = None;
                log::info!("Executing node {} ({})", id, node.name);
            }
            session.scheduled.remove(&id);
            session.executing.insert(id.clone());
            jobs.push(Job { id, work });
        }

        jobs
    }

    fn is_ready(&self, session: &ExecutionSession, id: &NodeId) -> bool {
        let pending = session
            .arena
            .node(id)
            .map(|n| n.state.is_pending())
            .unwrap_or(false);
        pending && upstream_executed(session, id)
    }

    fn prepare(&self, session: &ExecutionSession, id: &NodeId) -> Result<Work> {
        let node = session.arena.node(id)?;
        match &node.kind {
            NodeKind::Ordinary(model) => {
                let inputs = session
                    .plan
                    .upstream(id)
                    .iter()
                    .map(|u| {
                        session
                            .arena
                            .node(u)
                            .ok()
                            .and_then(|n| n.output.clone())
                            .unwrap_or(Value::Null)
                    })
                    .collect();
                Ok(Work::Model {
                    model: Arc::clone(model),
                    inputs,
                })
            }
            NodeKind::InteractiveInput { value, .. } => Ok(Work::Ready(NodeOutput::new(value.clone()))),
            NodeKind::SubGraph => sub_graph_output(&session.arena, id).map(Work::Ready),
        }
    }

    /// Record the outcome of a dispatched job
    pub fn complete(&self, session: &mut ExecutionSession, id: &NodeId, outcome: Outcome) {
        session.executing.remove(id);
        let node = match session.arena.node_mut(id) {
            Ok(node) => node,
            Err(e) => {
                log::error!("Completed job for missing node: {}", e);
                return;
            }
        };

        match outcome {
            Ok(output) => {
                match output.warning {
                    Some(warning) => {
                        log::warn!("Node {} executed with warning: {}", id, warning);
                        node.state = NodeState::ExecutedWithWarning;
                        node.message = Some(warning);
                    }
                    None => {
                        log::info!("Node {} executed", id);
                        node.state = NodeState::Executed;
                        node.message = None;
                    }
                }
                node.output = Some(output.value);
            }
            Err(message) => {
                log::error!("Node {} failed: {}", id, message);
                node.state = NodeState::Failed;
                node.output = None;
                node.message = Some(message);
            }
        }

        session.last_completed.count += 1;
        session.last_completed.node = Some(id.clone());
        self.refresh_readiness(session);
    }

    /// Move pending nodes between IDLE and CONFIGURED
    pub fn refresh_readiness(&self, session: &mut ExecutionSession) {
        let updates: Vec<(NodeId, NodeState)> = session
            .plan
            .order()
            .iter()
            .filter_map(|id| {
                let node = session.arena.node(id).ok()?;
                if !node.state.is_pending() {
                    return None;
                }
                let next = if upstream_executed(session, id) {
                    NodeState::Configured
                } else {
                    NodeState::Idle
                };
                (next != node.state).then(|| (id.clone(), next))
            })
            .collect();

        for (id, state) in updates {
            if let Ok(node) = session.arena.node_mut(&id) {
                node.state = state;
            }
        }
    }

    /// Update the session state; drops scheduled nodes that can no longer run
    pub fn settle(&self, session: &mut ExecutionSession) {
        if !session.executing.is_empty() {
            session.state = SessionState::Running;
            return;
        }
        if !session.scheduled.is_empty() {
            log::debug!(
                "{} scheduled nodes are blocked by failed upstream nodes",
                session.scheduled.len()
            );
            session.scheduled.clear();
        }
        if session.passes == 0 {
            session.state = SessionState::Idle;
            return;
        }

        let next = if !self
            .find_waiting_nodes(session, session.waiting_filter)
            .is_empty()
        {
            SessionState::WaitingOnInput
        } else if session
            .arena
            .graphs()
            .flat_map(|g| g.nodes())
            .any(|n| n.state == NodeState::Failed)
        {
            SessionState::Failed
        } else {
            SessionState::Quiescent
        };

        if next != session.state {
            log::info!("Session {} is {}", session.id, next);
        }
        session.state = next;
    }

    /// Waiting interactive nodes anywhere in the session
    pub fn find_waiting_nodes(
        &self,
        session: &ExecutionSession,
        filter: NodeFilter,
    ) -> BTreeMap<NodeId, NodeSnapshot> {
        session
            .arena
            .graphs()
            .flat_map(|g| g.nodes())
            .filter(|n| is_waiting(n, filter))
            .map(|n| (n.id.clone(), n.snapshot()))
            .collect()
    }

    /// Waiting interactive nodes owned directly by `graph`
    pub fn find_waiting_nodes_in(
        &self,
        session: &ExecutionSession,
        graph: &NodeId,
        filter: NodeFilter,
    ) -> Result<BTreeMap<NodeId, NodeSnapshot>> {
        Ok(session
            .arena
            .graph(graph)?
            .nodes()
            .filter(|n| is_waiting(n, filter))
            .map(|n| (n.id.clone(), n.snapshot()))
            .collect())
    }

    /// The graph owning the first waiting node in execution order
    pub fn find_next_waiting_graph(
        &self,
        session: &ExecutionSession,
        filter: NodeFilter,
    ) -> Option<NodeId> {
        session
            .plan
            .order()
            .iter()
            .find(|id| {
                session
                    .arena
                    .node(id)
                    .map(|n| is_waiting(n, filter))
                    .unwrap_or(false)
            })
            .and_then(|id| id.parent())
    }

    /// Reset `id` and everything effectively downstream of it
    pub fn reset(&self, session: &mut ExecutionSession, id: &NodeId) -> Result<Vec<NodeId>> {
        session.arena.node(id)?;
        let mut affected = session.plan.descendants(id);
        if session.arena.is_container(id) {
            affected.extend(session.arena.nodes_within(id).map(|n| n.id.clone()));
        }
        self.reset_nodes(session, &affected)
    }

    pub fn reset_all(&self, session: &mut ExecutionSession) -> Result<Vec<NodeId>> {
        let affected: HashSet<NodeId> = session.plan.order().iter().cloned().collect();
        self.reset_nodes(session, &affected)
    }

    /// Returns the nodes that lost a finished state
    fn reset_nodes(
        &self,
        session: &mut ExecutionSession,
        affected: &HashSet<NodeId>,
    ) -> Result<Vec<NodeId>> {
        ensure_not_executing(session, affected)?;

        let ordered: Vec<NodeId> = session
            .plan
            .order()
            .iter()
            .filter(|id| affected.contains(*id))
            .cloned()
            .collect();

        let mut reset = Vec::new();
        for id in ordered {
            session.scheduled.remove(&id);
            let node = session.arena.node_mut(&id)?;
            if node.state.is_finished() {
                reset.push(id.clone());
            }
            node.clear();
        }

        if !reset.is_empty() {
            log::info!("Reset {} nodes", reset.len());
        }
        self.refresh_readiness(session);
        self.settle(session);
        Ok(reset)
    }

    /// Validate a whole batch of external values, then apply all of them
    ///
    /// Keys are node suffixes (`5:2`) that must lie inside `container`.
    /// Finished targets are reset together with their downstream nodes so
    /// the new value can flow. Nothing is executed.
    pub fn apply_values(
        &self,
        session: &mut ExecutionSession,
        container: &NodeId,
        values: &BTreeMap<String, Value>,
    ) -> Result<Vec<NodeId>> {
        session.arena.graph(container)?;

        let mut resolved = Vec::with_capacity(values.len());
        for (key, value) in values {
            let suffix: NodeIdSuffix = key.parse()?;
            let id = session.arena.root_id().with_suffix(&suffix);
            if !id.is_within(container) || id == *container {
                return Err(FlowError::UnknownNode(id));
            }
            let node = session.arena.node(&id)?;
            let spec = node
                .interactive_spec()
                .ok_or_else(|| FlowError::NotInteractive(id.clone()))?;
            if !spec.value_type.accepts(value) {
                return Err(FlowError::value_type(id, spec.value_type, value));
            }
            resolved.push((id, value.clone()));
        }

        let mut stale = HashSet::new();
        for (id, _) in &resolved {
            let finished = session
                .arena
                .node(id)
                .map(|n| n.state.is_finished())
                .unwrap_or(false);
            if finished {
                stale.extend(session.plan.descendants(id));
            }
        }
        let mut touched = stale.clone();
        touched.extend(resolved.iter().map(|(id, _)| id.clone()));
        ensure_not_executing(session, &touched)?;
        self.reset_nodes(session, &stale)?;

        for (id, new_value) in &resolved {
            if let NodeKind::InteractiveInput { value, .. } = &mut session.arena.node_mut(id)?.kind {
                *value = new_value.clone();
            }
        }

        log::info!("Applied {} page values in {}", resolved.len(), container);
        Ok(resolved.into_iter().map(|(id, _)| id).collect())
    }
}

fn is_waiting(node: &NodeRecord, filter: NodeFilter) -> bool {
    filter.matches(node) && node.state == NodeState::Configured
}

fn upstream_executed(session: &ExecutionSession, id: &NodeId) -> bool {
    session.plan.upstream(id).iter().all(|u| {
        session
            .arena
            .state(u)
            .map(NodeState::is_executed)
            .unwrap_or(false)
    })
}

fn ensure_not_executing(session: &ExecutionSession, ids: &HashSet<NodeId>) -> Result<()> {
    match session.plan.order().iter().find(|id| {
        ids.contains(*id) && session.executing.contains(*id)
    }) {
        Some(id) => Err(FlowError::NodeExecuting(id.clone())),
        None => Ok(()),
    }
}

/// Output of a sub-graph node: its sink output, or all sink outputs in order
fn sub_graph_output(arena: &GraphArena, id: &NodeId) -> Result<NodeOutput> {
    let child = arena.graph(id)?;
    let mut outputs: Vec<Value> = child
        .sinks()
        .iter()
        .map(|sink| {
            child
                .node(sink)
                .ok()
                .and_then(|n| n.output.clone())
                .unwrap_or(Value::Null)
        })
        .collect();

    let value = match outputs.len() {
        0 => Value::Null,
        1 => outputs.remove(0),
        _ => Value::Array(outputs),
    };

    let warned = child
        .nodes()
        .any(|n| n.state == NodeState::ExecutedWithWarning);
    Ok(if warned {
        NodeOutput::with_warning(value, "contains nodes executed with warnings")
    } else {
        NodeOutput::new(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::graph::{Graph, InteractiveSpec, ValueType};
    use async_trait::async_trait;
    use serde_json::json;
    use std::error::Error;

    struct Echo;

    #[async_trait]
    impl NodeModel for Echo {
        fn type_name(&self) -> &str {
            "echo"
        }

        async fn execute(
            &self,
            inputs: Vec<Value>,
        ) -> std::result::Result<NodeOutput, Box<dyn Error + Send + Sync>> {
            Ok(NodeOutput::new(Value::Array(inputs)))
        }
    }

    fn id(n: u32) -> NodeId {
        NodeId::root().child(n)
    }

    fn ordinary(n: u32, deps: &[u32]) -> NodeRecord {
        NodeRecord::ordinary(
            id(n),
            format!("node {}", n),
            Arc::new(Echo),
            deps.iter().map(|d| id(*d)).collect(),
        )
    }

    fn flag(n: u32, deps: &[u32]) -> NodeRecord {
        NodeRecord::interactive(
            id(n),
            format!("flag {}", n),
            InteractiveSpec::new(ValueType::Boolean),
            json!(false),
            deps.iter().map(|d| id(*d)).collect(),
        )
    }

    fn session(nodes: Vec<NodeRecord>) -> ExecutionSession {
        let graph = Graph::new(NodeId::root(), "test", nodes).unwrap();
        let mut session = ExecutionSession::new(GraphArena::new(graph)).unwrap();
        Scheduler::new(4).refresh_readiness(&mut session);
        session
    }

    /// Run dispatched jobs inline: models answer with their inputs
    fn drain(scheduler: &Scheduler, session: &mut ExecutionSession) -> Vec<NodeId> {
        let mut ran = Vec::new();
        loop {
            let jobs = scheduler.dispatch(session);
            if jobs.is_empty() {
                break;
            }
            for job in jobs {
                let outcome = match job.work {
                    Work::Ready(output) => Ok(output),
                    Work::Model { inputs, .. } => Ok(NodeOutput::new(Value::Array(inputs))),
                };
                scheduler.complete(session, &job.id, outcome);
                ran.push(job.id);
            }
        }
        scheduler.settle(session);
        ran
    }

    fn state(session: &ExecutionSession, n: u32) -> NodeState {
        session.arena.state(&id(n)).unwrap()
    }

    #[test]
    fn test_initial_readiness() {
        let session = session(vec![flag(1, &[]), ordinary(14, &[1])]);
        assert_eq!(state(&session, 1), NodeState::Configured);
        assert_eq!(state(&session, 14), NodeState::Idle);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_request_up_to_runs_only_ancestors() {
        let scheduler = Scheduler::new(4);
        let mut session = session(vec![ordinary(1, &[]), ordinary(2, &[1]), ordinary(3, &[])]);

        let ticket = scheduler.request_up_to(&mut session, &id(2)).unwrap();
        assert_eq!(ticket.scheduled, vec![id(1), id(2)]);

        let ran = drain(&scheduler, &mut session);
        assert_eq!(ran, vec![id(1), id(2)]);
        assert_eq!(state(&session, 3), NodeState::Configured);
        assert_eq!(session.state(), SessionState::Quiescent);
    }

    #[test]
    fn test_request_unknown_node() {
        let scheduler = Scheduler::new(4);
        let mut session = session(vec![ordinary(1, &[])]);
        assert!(matches!(
            scheduler.request_up_to(&mut session, &id(7)),
            Err(FlowError::UnknownNode(_))
        ));
    }

    #[test]
    fn test_executed_nodes_are_not_rescheduled() {
        let scheduler = Scheduler::new(4);
        let mut session = session(vec![ordinary(1, &[]), ordinary(2, &[1])]);
        scheduler.request_all(&mut session);
        drain(&scheduler, &mut session);

        let ticket = scheduler.request_all(&mut session);
        assert!(ticket.is_empty());
        assert_eq!(session.last_completed().count, 2);
    }

    #[test]
    fn test_inputs_follow_declared_order() {
        let scheduler = Scheduler::new(4);
        let mut session = session(vec![ordinary(1, &[]), ordinary(2, &[]), ordinary(3, &[2, 1])]);
        scheduler.request_all(&mut session);
        drain(&scheduler, &mut session);

        let out = session.arena.node(&id(3)).unwrap().output.clone().unwrap();
        assert_eq!(out, json!([[], []]));
        assert_eq!(session.plan.upstream(&id(3)), &[id(2), id(1)]);
    }

    #[test]
    fn test_failure_blocks_only_descendants() {
        let scheduler = Scheduler::new(4);
        let mut session = session(vec![ordinary(1, &[]), ordinary(2, &[1]), ordinary(3, &[])]);
        scheduler.request_all(&mut session);

        let jobs = scheduler.dispatch(&mut session);
        let dispatched: Vec<NodeId> = jobs.iter().map(|j| j.id.clone()).collect();
        assert_eq!(dispatched, vec![id(1), id(3)]);

        scheduler.complete(&mut session, &id(1), Err("boom".to_string()));
        scheduler.complete(&mut session, &id(3), Ok(NodeOutput::new(json!(3))));
        assert!(scheduler.dispatch(&mut session).is_empty());
        scheduler.settle(&mut session);

        assert_eq!(state(&session, 1), NodeState::Failed);
        assert_eq!(state(&session, 2), NodeState::Idle);
        assert_eq!(state(&session, 3), NodeState::Executed);
        assert_eq!(session.state(), SessionState::Failed);
        assert!(session.scheduled.is_empty());
    }

    #[test]
    fn test_parallel_limit() {
        let scheduler = Scheduler::new(2);
        let mut session = session(vec![ordinary(1, &[]), ordinary(2, &[]), ordinary(3, &[])]);
        scheduler.request_all(&mut session);

        let first = scheduler.dispatch(&mut session);
        assert_eq!(first.len(), 2);
        assert_eq!(state(&session, 3), NodeState::Configured);
        scheduler.settle(&mut session);
        assert_eq!(session.state(), SessionState::Running);

        scheduler.complete(&mut session, &id(1), Ok(NodeOutput::new(json!(1))));
        let second = scheduler.dispatch(&mut session);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, id(3));
    }

    #[test]
    fn test_step_stops_before_first_interactive() {
        let scheduler = Scheduler::new(4);
        let mut session = session(vec![
            ordinary(1, &[]),
            flag(2, &[1]),
            ordinary(3, &[2]),
            ordinary(4, &[]),
        ]);

        let ticket = scheduler.request_step(&mut session, NodeFilter::interactive());
        assert_eq!(ticket.stop_point, Some(id(2)));
        assert_eq!(ticket.scheduled, vec![id(1)]);
        drain(&scheduler, &mut session);

        assert_eq!(state(&session, 2), NodeState::Configured);
        assert_eq!(state(&session, 3), NodeState::Idle);
        // after the stop point in order, so untouched
        assert_eq!(state(&session, 4), NodeState::Configured);
        assert_eq!(session.state(), SessionState::WaitingOnInput);

        let waiting = scheduler.find_waiting_nodes(&session, NodeFilter::interactive());
        assert_eq!(waiting.keys().cloned().collect::<Vec<_>>(), vec![id(2)]);
        assert_eq!(
            scheduler.find_next_waiting_graph(&session, NodeFilter::interactive()),
            Some(NodeId::root())
        );
    }

    #[test]
    fn test_step_skips_hidden_interactive_nodes() {
        let scheduler = Scheduler::new(4);
        let hidden = NodeRecord::interactive(
            id(1),
            "hidden",
            InteractiveSpec::new(ValueType::String).hidden(),
            json!("preset"),
            vec![],
        );
        let mut session = session(vec![hidden, flag(2, &[1])]);

        let ticket = scheduler.request_step(&mut session, NodeFilter::interactive());
        assert_eq!(ticket.stop_point, Some(id(2)));
        drain(&scheduler, &mut session);
        assert_eq!(state(&session, 1), NodeState::Executed);

        let ticket = scheduler.request_step(&mut session, NodeFilter::interactive_with_hidden());
        assert_eq!(ticket.stop_point, Some(id(2)));
    }

    #[test]
    fn test_hidden_stop_point_sets_waiting_state() {
        let scheduler = Scheduler::new(4);
        let hidden = NodeRecord::interactive(
            id(1),
            "hidden",
            InteractiveSpec::new(ValueType::String).hidden(),
            json!("preset"),
            vec![],
        );
        let mut session = session(vec![hidden, ordinary(2, &[1])]);

        let ticket = scheduler.request_step(&mut session, NodeFilter::interactive_with_hidden());
        assert_eq!(ticket.stop_point, Some(id(1)));
        drain(&scheduler, &mut session);
        assert_eq!(session.waiting_filter(), NodeFilter::interactive_with_hidden());
        assert_eq!(session.state(), SessionState::WaitingOnInput);

        // a full run judges waiting by the visible-only filter again
        scheduler.request_all(&mut session);
        drain(&scheduler, &mut session);
        assert_eq!(state(&session, 2), NodeState::Executed);
        assert_eq!(session.state(), SessionState::Quiescent);
    }

    #[test]
    fn test_apply_values_is_atomic() {
        let scheduler = Scheduler::new(4);
        let mut session = session(vec![flag(1, &[]), flag(2, &[])]);

        let mut values = BTreeMap::new();
        values.insert("1".to_string(), json!(true));
        values.insert("2".to_string(), json!("not a boolean"));
        let err = scheduler
            .apply_values(&mut session, &NodeId::root(), &values)
            .unwrap_err();
        assert!(matches!(err, FlowError::ValueType { .. }));
        assert_eq!(session.arena.node(&id(1)).unwrap().value(), Some(&json!(false)));

        values.insert("2".to_string(), json!(true));
        let applied = scheduler
            .apply_values(&mut session, &NodeId::root(), &values)
            .unwrap();
        assert_eq!(applied, vec![id(1), id(2)]);
        assert_eq!(session.arena.node(&id(2)).unwrap().value(), Some(&json!(true)));
    }

    #[test]
    fn test_apply_values_resets_executed_target() {
        let scheduler = Scheduler::new(4);
        let mut session = session(vec![flag(1, &[]), ordinary(2, &[1])]);
        scheduler.request_all(&mut session);
        drain(&scheduler, &mut session);
        assert_eq!(state(&session, 2), NodeState::Executed);

        let mut values = BTreeMap::new();
        values.insert("1".to_string(), json!(true));
        scheduler
            .apply_values(&mut session, &NodeId::root(), &values)
            .unwrap();

        assert_eq!(state(&session, 1), NodeState::Configured);
        assert_eq!(state(&session, 2), NodeState::Idle);
        assert!(session.arena.node(&id(2)).unwrap().output.is_none());
    }

    #[test]
    fn test_apply_values_rejects_unknown_and_ordinary_targets() {
        let scheduler = Scheduler::new(4);
        let mut session = session(vec![flag(1, &[]), ordinary(2, &[1])]);

        let mut values = BTreeMap::new();
        values.insert("9".to_string(), json!(true));
        assert!(matches!(
            scheduler.apply_values(&mut session, &NodeId::root(), &values),
            Err(FlowError::UnknownNode(_))
        ));

        let mut values = BTreeMap::new();
        values.insert("2".to_string(), json!(true));
        assert!(matches!(
            scheduler.apply_values(&mut session, &NodeId::root(), &values),
            Err(FlowError::NotInteractive(_))
        ));

        let mut values = BTreeMap::new();
        values.insert("x:y".to_string(), json!(true));
        assert!(matches!(
            scheduler.apply_values(&mut session, &NodeId::root(), &values),
            Err(FlowError::InvalidId(_))
        ));
    }

    #[test]
    fn test_reset_rejects_executing_nodes() {
        let scheduler = Scheduler::new(4);
        let mut session = session(vec![ordinary(1, &[]), ordinary(2, &[1])]);
        scheduler.request_all(&mut session);
        let _jobs = scheduler.dispatch(&mut session);

        assert!(matches!(
            scheduler.reset(&mut session, &id(1)),
            Err(FlowError::NodeExecuting(_))
        ));

        scheduler.complete(&mut session, &id(1), Ok(NodeOutput::new(json!(1))));
        drain(&scheduler, &mut session);
        let reset = scheduler.reset(&mut session, &id(1)).unwrap();
        assert_eq!(reset, vec![id(1), id(2)]);
        assert_eq!(state(&session, 1), NodeState::Configured);
        assert_eq!(state(&session, 2), NodeState::Idle);
    }
}
