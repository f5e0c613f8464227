//! # User Directory Sample
//!
//! This library exposes the modules of the demo application for integration testing.

pub mod accounts;
pub mod clients;
pub mod directory;
pub mod lifecycle;
pub mod model;
pub mod profile;
