//! Library crate for gridline-back, exposing modules for binaries and integration tests.

pub mod auth;
pub mod clock;
pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod passcode;
pub mod routes;
pub mod services;
pub mod state;
