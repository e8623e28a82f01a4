//! Library crate for the duel arena service, exposing modules for binaries and tests.

pub mod cache;
pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
