// SPDX-License-Identifier: MIT

//! Drives the execution core from outside: YAML workflow definitions,
//! built-in node types, a console page presenter and the wizard loop

pub mod console;
pub mod driver;
pub mod nodes;
pub mod workflow;

pub use console::ConsolePresenter;
pub use driver::{DriverError, WizardDriver, WizardReport};
