//! Application core: the gate service and its port traits.
//!
//! Business rules live in [`crate::gate`] (pure transitions) and
//! [`service`] (the serialized read-modify-write around them).  All
//! interaction with disk, clock and network happens through the traits
//! in [`ports`].

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
