// SPDX-License-Identifier: MIT

//! Scheduling and background execution of a graph arena

pub mod config;
pub mod controller;
pub mod plan;
pub mod scheduler;
pub mod scope;
pub mod session;

pub use config::EngineConfig;
pub use controller::ExecutionController;
pub use plan::ExecutionPlan;
pub use scheduler::{RunTicket, Scheduler};
pub use scope::WorkflowScope;
pub use session::{CompletedStep, ExecutionSession, SessionState};
