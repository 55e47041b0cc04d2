//! Core types, validation rules and trait definitions for the census service.
//!
//! This crate has no HTTP or database dependencies.
//! The validators are pure functions of their input and the current date;
//! they perform no I/O and never log.

// Native `async fn` in traits (stable since Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod batch;
pub mod citizen;
pub mod error;
pub mod graph;
pub mod report;
pub mod schema;
pub mod store;
pub mod validate;

pub use batch::{ImportBatch, validate_new_batch};
pub use error::{Error, FieldViolation, Result, SchemaError, ValidationError};
pub use validate::{RecordValidator, validate_update};
