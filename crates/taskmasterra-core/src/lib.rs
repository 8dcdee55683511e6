//! Core of taskmasterra: markdown task grammar, record keeping and reporting.

pub mod config;
pub mod grammar;
pub mod history;
pub mod priority;
pub mod recordkeep;
pub mod reminder;
pub mod stats;
pub mod validator;
