//! Business logic services.

pub mod api_key;
pub mod cancel;
pub mod code_generator;
pub mod import;
pub mod invites;
pub mod plan_builder;
pub mod projects;
pub mod run_state;
pub mod test_case_store;

pub use cancel::CancelSignal;
pub use invites::{InviteResolver, InviteTarget};
