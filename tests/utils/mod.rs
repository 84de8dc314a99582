//! Shared helpers for integration tests. Each test binary uses a subset.
#![allow(dead_code)]

pub mod db;
pub mod factories;
pub mod fakes;
pub mod helpers;
