//! SeaORM database migrations.

pub use sea_orm_migration::prelude::*;

mod m20261017_000001_create_users;
mod m20261017_000002_create_projects;
mod m20261017_000003_create_test_cases;
mod m20261017_000004_create_test_plans;
mod m20261017_000005_create_test_runs;
mod m20261017_000006_create_test_run_invites;
mod m20261017_000007_create_code_sequences;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261017_000001_create_users::Migration),
            Box::new(m20261017_000002_create_projects::Migration),
            Box::new(m20261017_000003_create_test_cases::Migration),
            Box::new(m20261017_000004_create_test_plans::Migration),
            Box::new(m20261017_000005_create_test_runs::Migration),
            Box::new(m20261017_000006_create_test_run_invites::Migration),
            Box::new(m20261017_000007_create_code_sequences::Migration),
        ]
    }
}
