//! Step-graph orchestration engine.
//!
//! A workflow is declared as a set of `StepDefinition`s whose dependency
//! edges only point at already-declared steps, committed into an immutable
//! `CommittedGraph` with an explicit level partition, and executed by a
//! `WorkflowRunner` that schedules each level concurrently behind a
//! dependency barrier. Step results live in a write-once `RunContext`.

pub mod context;
pub mod graph;
pub mod runner;
pub mod step;

pub use context::RunContext;
pub use graph::{CommittedGraph, WorkflowBuilder};
pub use runner::{RunReport, WorkflowRunner};
pub use step::{StepContext, StepDefinition, StepExec};
