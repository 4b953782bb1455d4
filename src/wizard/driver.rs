// SPDX-License-Identifier: MIT

//! Page-by-page execution of a workflow with interactive inputs

use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

use crate::flow::engine::{CompletedStep, ExecutionController, SessionState};
use crate::flow::error::FlowError;
use crate::flow::graph::{NodeFilter, NodeId, NodeIdSuffix};
use crate::flow::page::PagePresenter;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("Page presenter failed: {0}")]
    Presenter(String),

    /// Nodes were still executing when the wait gave up
    #[error("Execution did not settle within {0:?}")]
    Timeout(Duration),
}

/// Summary of a finished wizard run
#[derive(Debug, Clone, Serialize)]
pub struct WizardReport {
    pub pages: usize,
    pub state: SessionState,
    pub last_completed: CompletedStep,
}

/// Steps a workflow to each interactive page, asks a presenter for values,
/// and resumes until nothing waits
///
/// Uses the blocking waits of the controller, so it must not run on a
/// runtime worker thread.
pub struct WizardDriver<'a, P> {
    controller: &'a ExecutionController,
    presenter: P,
    filter: NodeFilter,
    timeout: Duration,
}

impl<'a, P: PagePresenter> WizardDriver<'a, P> {
    pub fn new(controller: &'a ExecutionController, presenter: P) -> Self {
        Self {
            controller,
            presenter,
            filter: NodeFilter::interactive(),
            timeout: controller.config().wait_timeout,
        }
    }

    pub fn with_filter(mut self, filter: NodeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn run(&mut self) -> Result<WizardReport, DriverError> {
        let mut pages = 0;
        loop {
            self.controller.step_execution_up_to_node_type(self.filter);
            self.wait()?;

            let Some(scope) = self.controller.find_next_waiting_scope(self.filter) else {
                break;
            };
            let waiting = scope.find_waiting_nodes(self.filter)?;
            let page = self.controller.get_page(scope.id())?;
            log::info!(
                "Presenting page {} with {} inputs",
                scope.id(),
                page.nodes.len()
            );

            let values = self
                .presenter
                .present(&page)
                .map_err(|e| DriverError::Presenter(e.to_string()))?;
            self.controller.apply_page_values(&values, scope.id())?;

            // the page also shows waiting nodes of nested sub-graphs
            let mut resume: BTreeSet<NodeId> = waiting.into_keys().collect();
            let root = self.controller.root_id();
            for key in page.nodes.keys() {
                let suffix: NodeIdSuffix = key.parse().map_err(FlowError::from)?;
                resume.insert(root.with_suffix(&suffix));
            }
            for id in &resume {
                let owner = id.parent().ok_or_else(|| FlowError::UnknownNode(id.clone()))?;
                if owner == *scope.id() {
                    scope.execute_up_to_here(id)?;
                } else {
                    self.controller.scope(&owner)?.execute_up_to_here(id)?;
                }
            }
            self.wait()?;
            pages += 1;
        }

        self.controller.execute_all();
        self.wait()?;

        let report = WizardReport {
            pages,
            state: self.controller.session_state(),
            last_completed: self.controller.last_completed_step(),
        };
        log::info!(
            "Wizard finished after {} pages, session is {}",
            report.pages,
            report.state
        );
        Ok(report)
    }

    fn wait(&self) -> Result<(), DriverError> {
        if self.controller.wait_while_executing(self.timeout) {
            Ok(())
        } else {
            Err(DriverError::Timeout(self.timeout))
        }
    }
}
