//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into enrollment and roster use-cases.
//! - Keep callers (CLI, future transports) decoupled from storage details.
//!
//! Components, leaf-first: `uniqueness` (structural gate), `enrollment`
//! (canonical index + record resolution), `teacher_assignment`,
//! `propagation` (Guardian mirror), and the `period_service` facade that
//! sequences them.

pub mod enrollment;
pub mod error;
pub mod period_service;
pub mod propagation;
pub mod roster_service;
pub mod teacher_assignment;
pub mod uniqueness;
