//! Test plan manager server library.
//!
//! Projects own test cases; test plans fan test cases out to testers as
//! test runs, which collect pass/fail results from authenticated users or
//! through public invite tokens.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
