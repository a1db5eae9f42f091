//! Shared fixtures for the workflow suite.

use std::time::Duration;

use actix_web::{App, dev::ServiceResponse, test, web};
use sea_orm::{ConnectOptions, Database, EntityTrait};
use serde_json::Value;
use uuid::Uuid;

use tpm_lib::api;
use tpm_lib::auth::AdminKey;
use tpm_lib::config::{Config, DatabaseConfig, Environment, WorkflowConfig};
use tpm_lib::db::{DbPool, users};
use tpm_lib::entity::code_sequence;
use tpm_lib::models::{
    CreatePlanRequest, CreateProjectRequest, CreateTestCaseRequest, CreateUserRequest,
    PlanAssignmentOutcome, PlannedAssignment, Project, TestCase, TestKind, UserRole,
};
use tpm_lib::services::{CancelSignal, api_key, plan_builder, projects, test_case_store};

/// Admin key used in tests.
pub const TEST_ADMIN_KEY: &str = "test-admin-key-for-workflow";

/// A migrated database with an owner, two testers and one project.
pub struct Fixture {
    pub pool: DbPool,
    pub config: Config,
    pub owner: Uuid,
    pub tester_a: Uuid,
    pub tester_b: Uuid,
    pub project: Project,
}

/// Single-connection in-memory database; every connection would otherwise see its own empty schema.
pub async fn create_test_pool() -> DbPool {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let conn = Database::connect(options)
        .await
        .expect("Failed to open in-memory SQLite");
    let pool = DbPool::from_connection(conn);
    pool.run_migrations()
        .await
        .expect("Failed to run migrations");
    pool
}

/// File-backed database served by several connections, so concurrent
/// transactions really overlap. The directory must outlive the pool.
pub async fn create_shared_pool(connections: u32) -> (DbPool, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("workflow.db").display());

    let mut options = ConnectOptions::new(url);
    options
        .max_connections(connections)
        .min_connections(1)
        .sqlx_logging(false)
        .map_sqlx_sqlite_opts(|opts| opts.busy_timeout(Duration::from_secs(30)));

    let conn = Database::connect(options)
        .await
        .expect("Failed to open SQLite file");
    let pool = DbPool::from_connection(conn);
    pool.run_migrations()
        .await
        .expect("Failed to run migrations");
    (pool, dir)
}

/// Last value handed out for a code scope, if the counter exists.
pub async fn sequence_value(pool: &DbPool, scope: &str) -> Option<i64> {
    code_sequence::Entity::find_by_id(scope.to_string())
        .one(pool.connection())
        .await
        .expect("Failed to read code sequence")
        .map(|row| row.next_value)
}

pub fn test_config() -> Config {
    Config {
        environment: Environment::Development,
        host: "127.0.0.1".to_string(),
        port: 0,
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        admin_key: Some(TEST_ADMIN_KEY.to_string()),
        workflow: WorkflowConfig::default(),
    }
}

pub async fn create_user(pool: &DbPool, username: &str, role: UserRole) -> Uuid {
    users::insert_user(
        pool.connection(),
        &CreateUserRequest {
            username: username.to_string(),
            display_name: None,
            role: Some(role),
        },
    )
    .await
    .expect("Failed to create user")
    .id
}

pub async fn fixture() -> Fixture {
    fixture_on(create_test_pool().await).await
}

/// Seed users and the project into an already migrated pool.
pub async fn fixture_on(pool: DbPool) -> Fixture {
    let owner = create_user(&pool, "owner", UserRole::Member).await;
    let tester_a = create_user(&pool, "tester-a", UserRole::Member).await;
    let tester_b = create_user(&pool, "tester-b", UserRole::Member).await;

    let project = projects::create_project(
        &pool,
        owner,
        &CreateProjectRequest {
            title: "Web client".to_string(),
            code: "WEB".to_string(),
            is_public: false,
        },
    )
    .await
    .expect("Failed to create project");

    Fixture {
        pool,
        config: test_config(),
        owner,
        tester_a,
        tester_b,
        project,
    }
}

/// A request that passes validation.
pub fn valid_case(title: &str) -> CreateTestCaseRequest {
    CreateTestCaseRequest {
        kind: "regression".to_string(),
        title: title.to_string(),
        description: "1. Open the app\n2. Check the result".to_string(),
        feature: Some("login".to_string()),
        tags: vec!["smoke".to_string()],
        is_draft: false,
        parent_id: None,
    }
}

pub async fn create_case(fx: &Fixture, title: &str) -> TestCase {
    test_case_store::create(
        &fx.pool,
        &fx.config.workflow,
        fx.project.id,
        fx.owner,
        &valid_case(title),
    )
    .await
    .expect("Failed to create test case")
}

pub fn plan_request(assignments: Vec<PlannedAssignment>) -> CreatePlanRequest {
    CreatePlanRequest {
        kind: TestKind::Regression,
        description: "Release 2.4 regression".to_string(),
        start_at: None,
        scheduled_end_at: None,
        assigned_to_id: None,
        assignments,
    }
}

pub async fn create_plan(fx: &Fixture, assignments: Vec<PlannedAssignment>) -> PlanAssignmentOutcome {
    plan_builder::create_plan(
        &fx.pool,
        &fx.config.workflow,
        fx.project.id,
        fx.owner,
        &plan_request(assignments),
        &CancelSignal::new(),
    )
    .await
    .expect("Failed to create plan")
}

/// Issue an API key for a user and return the full key.
pub async fn api_key_for(pool: &DbPool, user_id: Uuid) -> String {
    let (key, _) = api_key::create_key(pool, user_id, "workflow tests", None)
        .await
        .expect("Failed to create API key");
    key
}

/// Create a test app with every `/api/v1` route.
pub async fn create_test_app(
    fx: &Fixture,
) -> impl actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>
{
    test::init_service(
        App::new()
            .app_data(web::Data::new(fx.pool.clone()))
            .app_data(web::Data::new(fx.config.clone()))
            .app_data(web::Data::new(AdminKey::new(Some(TEST_ADMIN_KEY.to_string()))))
            .app_data(api::json_config(1024 * 1024))
            .service(web::scope("/api/v1").configure(api::configure_api_routes)),
    )
    .await
}

/// Send a request and return the status code and the JSON body (Null when empty).
pub async fn send<S>(app: &S, req: test::TestRequest) -> (u16, Value)
where
    S: actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status().as_u16();
    let bytes = test::read_body(resp).await;
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}
