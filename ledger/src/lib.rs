//! Tonnage Ledger library
//!
//! Offline-first payroll tracking for tonnage crews: a local mirror store,
//! a queue of pending uploads, the sync engine that drains it and the
//! payroll calculator that reads from either side.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod notify;
pub mod payroll;
pub mod services;
pub mod sync;
