//! Alleydash session core. Re-exports all modules for the host binary and
//! integration tests.
//!
//! The crate has no window or renderer. A host drives it either through
//! `session::SessionPlugin` in a bevy app or by ticking `session::GameFlow`
//! directly.

pub mod shared;
pub mod config;
pub mod assets;
pub mod data;
pub mod profile;
pub mod missions;
pub mod save;
pub mod modifiers;
pub mod telemetry;
pub mod flow;
pub mod states;
pub mod session;
