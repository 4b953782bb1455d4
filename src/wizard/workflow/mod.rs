// SPDX-License-Identifier: MIT

pub mod builder;
pub mod loader;
pub mod registry;
pub mod types;
