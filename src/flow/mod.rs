// SPDX-License-Identifier: MIT

//! Execution core: graphs of nodes, dependency-ordered background execution
//! and the stepwise protocol that halts at interactive input nodes

pub mod engine;
pub mod error;
pub mod graph;
pub mod page;

pub use engine::{EngineConfig, ExecutionController, RunTicket, SessionState, WorkflowScope};
pub use error::{FlowError, LayoutParseError, Result, WorkflowError};
pub use graph::{GraphArena, NodeFilter, NodeId, NodeState};
pub use page::{PageDescriptor, PagePresenter};
