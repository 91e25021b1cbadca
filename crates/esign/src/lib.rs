//! Contract e-signature service
//!
//! This crate provides:
//! - SeaORM entities for users, contracts, versions, parties and signatures
//! - Services for contract upload, listing, file access and signing
//! - An axum HTTP surface with bearer JWT (HS256) authentication
//! - Object storage through the `storage` crate (S3 or in-memory)
//!
//! Can be used as a library or standalone binary

pub mod auth;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod http;
pub mod service;
pub mod services;
pub mod storage;

// Re-export commonly used types
pub use auth::{create_jwt, verify_jwt, Claims};
pub use config::{ServiceConfig, StorageBackend};
pub use database::Database;
pub use error::{Result, ServiceError};
pub use http::{router, AppState};
pub use service::EsignServiceRunner;
