//! Domain layer for the site attendance backend.
//!
//! This crate contains:
//! - Domain models (attendance records, geofences, assignments, alerts)
//! - The geofence validator and attendance state machine
//! - The alert rules and the engine that runs one scheduler pass
//! - Storage, directory and notification traits with in-memory implementations

pub mod models;
pub mod services;
