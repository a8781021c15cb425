//! Tests for the bytecode VM
//!
//! Organized by feature area

mod error_tests;
mod helpers;
mod stdlib_tests;
