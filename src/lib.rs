//! State containers for a small todo / user / counter application.
//!
//! Two families implement the same concerns: an action-dispatch store
//! ([`dispatch`]) and independent closure stores ([`closure`]). Both share
//! the slice semantics in [`slices`], the simulated backend in [`api`] and
//! the key-value storage in [`storage`], and both implement
//! [`container::Container`].

pub mod api;
pub mod app;
pub mod closure;
pub mod config;
pub mod container;
pub mod dispatch;
pub mod error;
pub mod logger;
pub mod model;
pub mod slices;
pub mod storage;
pub mod subscription;
pub mod utils;
