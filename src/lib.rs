//! Scheduling core of a distributed event-driven-task runtime.
//!
//! An EDT (event-driven task) becomes runnable once every dependence slot
//! is satisfied and every DB (data block) dependence is locally acquired in
//! a compatible mode. This crate answers where an EDT should run and at
//! which logical time slot for each DB it touches, and in what order ready
//! EDTs are handed to the workers of a policy domain.
//!
//! Out of scope, named only as collaborators: the EDT invocation ABI,
//! memory allocators, GUID-provider internals, the real message transport,
//! the configuration-file parser, and the user-facing create/satisfy API
//! veneer.

pub mod config;
pub mod container;
pub mod db;
pub mod edt;
pub mod error;
pub mod facade;
pub mod guid;
pub mod heuristics;
pub mod hint;
pub mod marshal;
pub mod message;
pub mod runlevel;
pub mod transport;

pub use error::{SchedulerError, SchedulerResult};
pub use facade::SchedulerFacade;
