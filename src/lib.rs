//! Goal-driven video editing pipeline.
//!
//! A [`planner::Planner`] turns a [`task::TaskSpec`] into a linear
//! [`task::Plan`], an [`executor::Executor`] runs it step by step against a
//! [`backend::Backend`] while threading the latest artifact forward, and
//! [`verify::verify`] checks what was produced.

pub mod backend;
pub mod config;
pub mod error;
pub mod executor;
pub mod planner;
pub mod report;
pub mod task;
pub mod verify;
