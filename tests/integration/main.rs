//! Integration test driver for `tests/integration/` submodules.
//!
//! Each `mod` below exercises one subsystem against the mock adapters in
//! `mocks`.  No network, no GPIO, no wall clock.

mod control_loop_tests;
mod mocks;
mod service_tests;
