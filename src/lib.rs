//! Gatelink: server-held gate intent, reconciled by a polling relay agent.
//!
//! The server side is [`app::service::GateService`] (state machine +
//! store behind one lock) driven by the HTTP API and the
//! [`control_loop::ControlLoop`].  The agent side is [`agent::Reconciler`],
//! which polls the Command API and drives a relay through
//! [`safety::FailSafeRelay`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod agent;
pub mod app;
pub mod config;
pub mod control_loop;
pub mod drivers;
pub mod error;
pub mod gate;
pub mod safety;
pub mod store;
