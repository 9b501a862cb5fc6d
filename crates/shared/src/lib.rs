//! Shared utilities for the site attendance backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Coordinate validation
//! - JWT access tokens carrying the employee/company caller context

pub mod jwt;
pub mod validation;
