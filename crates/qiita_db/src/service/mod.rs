//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep UI modules and the CLI decoupled from SQL details.

pub mod parameter_service;
