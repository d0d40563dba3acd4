//! Process orchestration for generated services.
//!
//! Owns everything with shared state or external processes: the port pool,
//! the [`launcher::ProcessLauncher`] capability and its real
//! [`command_launcher::CommandLauncher`], readiness probing, the
//! [`supervisor::Supervisor`], the [`registry::InstanceRegistry`] and the
//! end-to-end [`provisioner::Provisioner`] pipeline.

pub mod command_launcher;
pub mod launcher;
pub mod ports;
pub mod provisioner;
pub mod readiness;
pub mod registry;
pub mod supervisor;
