//! Subprocess plumbing for turning an artifact directory into a runnable
//! service.
//!
//! Holds the command model, the bounded subprocess runner and the
//! dependency installer. Long-lived service processes are supervised by
//! `apiforge-runtime`; everything here runs to completion.

pub mod command;
pub mod installer;
pub mod subprocess;
