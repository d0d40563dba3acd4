//! Domain logic for provisioning ephemeral REST services.
//!
//! Everything in this crate is free of shared state: the schema model and
//! its validator, the naming rules, the code synthesizer, the endpoint
//! catalog, the instance lifecycle state machine and the dependency
//! installer. Process supervision and the instance registry live in
//! `apiforge-runtime`.

pub mod catalog;
pub mod error;
pub mod lifecycle;
pub mod naming;
pub mod provisioning;
pub mod schema;
pub mod synthesis;
pub mod types;
pub mod validation;
