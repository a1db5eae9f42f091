//! Workflow integration suite.
//!
//! Exercises the services and HTTP handlers against an in-memory SQLite
//! database migrated with the production migrations.
//!
//! Run with: cargo test --test workflow

mod test_helpers;

mod test_codes;
mod test_http;
mod test_invites;
mod test_plans;
mod test_results;
mod test_store;
