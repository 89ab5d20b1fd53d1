//! # Engine Module
//!
//! Internal scheduler implementation.
//!
//! This module contains all core building blocks such as:
//! - The command lifecycle contract and handles
//! - Subsystems and requirement ownership
//! - Command compositions and decorators
//! - The scheduler run loop
//! - Event loops and triggers
//!
//! Public API exposure is controlled by `lib.rs`.

pub mod types;
pub mod error;
pub mod config;
pub mod time;
pub mod subsystem;
pub mod requirements;
pub mod command;
pub mod commands;
pub mod compositions;
pub mod cmd;
pub mod event_loop;
pub mod trigger;
pub mod watchdog;
pub mod telemetry;
pub mod scheduler;
