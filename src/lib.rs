pub mod api;
pub mod callback;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod reconciliation;
pub mod repository;
pub mod service;
