//! Core types, the repository/unit-of-work abstraction, and the course
//! registration service.
//!
//! This crate is free of HTTP and database dependencies. Storage backends
//! implement [`repository::UnitOfWork`]; transport layers drive
//! [`service::CourseService`].

pub mod entity;
pub mod error;
pub mod memory;
pub mod repository;
pub mod service;
pub mod view;

pub use error::{Error, Result, ValidationError};
