//! End-to-end tests for the ringin answer loop.
//!
//! Each test plays the modem's side of one or more calls through a
//! `ModemHandle` and checks what the controller wrote back and counted.

pub mod answer_tests;
pub mod bridge_tests;
pub mod lifecycle_tests;
