//! SeaORM entity definitions.

pub mod api_key;
pub mod code_sequence;
pub mod project;
pub mod test_case;
pub mod test_plan;
pub mod test_run;
pub mod test_run_invite;
pub mod user;
