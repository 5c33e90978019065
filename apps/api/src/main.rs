//! Crewdeck API composition root.

#![forbid(unsafe_code)]

mod auth;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post, put};
use crewdeck_application::{
    AssignmentService, AuditRepository, AuditService, AuthorizationService, BootstrapService,
    CompanyRepository, CompanyService, EmailService, InviteRepository, InviteService,
    OfficeAccessRepository, OfficeRepository, OfficeService, PasswordHasher,
    RoleAssignmentRepository, RoleRepository, RoleService, UserRepository, UserService,
};
use crewdeck_core::AppError;
use crewdeck_infrastructure::{
    Argon2PasswordHasher, ConsoleEmailService, PostgresAuditRepository, PostgresCompanyRepository,
    PostgresInviteRepository, PostgresOfficeAccessRepository, PostgresOfficeRepository,
    PostgresRoleAssignmentRepository, PostgresRoleRepository, PostgresUserRepository,
    SmtpEmailConfig, SmtpEmailService,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

    let database_url = required_env("DATABASE_URL")?;
    let frontend_url =
        env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());
    let bootstrap_token = required_env("AUTH_BOOTSTRAP_TOKEN")?;
    let session_secret = required_env("SESSION_SECRET")?;

    if session_secret.len() < 32 {
        return Err(AppError::Validation(
            "SESSION_SECRET must be at least 32 characters".to_owned(),
        ));
    }

    let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let api_port = env::var("API_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3001);

    let cookie_secure = env::var("SESSION_COOKIE_SECURE")
        .unwrap_or_else(|_| "false".to_owned())
        .eq_ignore_ascii_case("true");

    let email_provider = env::var("EMAIL_PROVIDER").unwrap_or_else(|_| "console".to_owned());

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let session_store = PostgresStore::new(pool.clone())
        .with_table_name("tower_sessions")
        .map_err(|error| {
            AppError::Validation(format!("invalid session table name configuration: {error}"))
        })?;
    session_store.migrate().await.map_err(|error| {
        AppError::Internal(format!("failed to initialize session store: {error}"))
    })?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(cookie_secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(30)));

    let email_service: Arc<dyn EmailService> = match email_provider.as_str() {
        "smtp" => {
            let smtp_port = required_non_empty_env("SMTP_PORT")?
                .parse::<u16>()
                .map_err(|error| AppError::Validation(format!("invalid SMTP_PORT: {error}")))?;

            let smtp_config = SmtpEmailConfig {
                host: required_non_empty_env("SMTP_HOST")?,
                port: smtp_port,
                username: required_non_empty_env("SMTP_USERNAME")?,
                password: required_non_empty_env("SMTP_PASSWORD")?,
                from_address: required_non_empty_env("SMTP_FROM_ADDRESS")?,
            };
            Arc::new(SmtpEmailService::new(smtp_config))
        }
        "console" => Arc::new(ConsoleEmailService::new()),
        _ => {
            return Err(AppError::Validation(format!(
                "EMAIL_PROVIDER must be either 'console' or 'smtp', got '{email_provider}'"
            )));
        }
    };

    // Repositories.
    let role_repository: Arc<dyn RoleRepository> =
        Arc::new(PostgresRoleRepository::new(pool.clone()));
    let assignment_repository: Arc<dyn RoleAssignmentRepository> =
        Arc::new(PostgresRoleAssignmentRepository::new(pool.clone()));
    let company_repository: Arc<dyn CompanyRepository> =
        Arc::new(PostgresCompanyRepository::new(pool.clone()));
    let office_repository: Arc<dyn OfficeRepository> =
        Arc::new(PostgresOfficeRepository::new(pool.clone()));
    let office_access_repository: Arc<dyn OfficeAccessRepository> =
        Arc::new(PostgresOfficeAccessRepository::new(pool.clone()));
    let user_repository: Arc<dyn UserRepository> =
        Arc::new(PostgresUserRepository::new(pool.clone()));
    let invite_repository: Arc<dyn InviteRepository> =
        Arc::new(PostgresInviteRepository::new(pool.clone()));
    let audit_repository: Arc<dyn AuditRepository> =
        Arc::new(PostgresAuditRepository::new(pool.clone()));
    let password_hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2PasswordHasher::new());

    // Services.
    let authorization_service = AuthorizationService::new(assignment_repository.clone());
    let app_state = AppState {
        role_service: Arc::new(RoleService::new(
            role_repository.clone(),
            authorization_service.clone(),
            audit_repository.clone(),
        )),
        assignment_service: Arc::new(AssignmentService::new(
            assignment_repository.clone(),
            role_repository.clone(),
            user_repository.clone(),
            authorization_service.clone(),
            audit_repository.clone(),
        )),
        office_service: Arc::new(OfficeService::new(
            office_repository.clone(),
            office_access_repository,
            user_repository.clone(),
            authorization_service.clone(),
            audit_repository.clone(),
        )),
        company_service: Arc::new(CompanyService::new(
            company_repository.clone(),
            authorization_service.clone(),
            audit_repository.clone(),
        )),
        user_service: Arc::new(UserService::new(
            user_repository.clone(),
            password_hasher.clone(),
            authorization_service.clone(),
            audit_repository.clone(),
        )),
        invite_service: Arc::new(InviteService::new(
            invite_repository,
            user_repository.clone(),
            role_repository.clone(),
            office_repository,
            company_repository,
            authorization_service.clone(),
            audit_repository.clone(),
            email_service,
            password_hasher.clone(),
            frontend_url.clone(),
        )),
        bootstrap_service: Arc::new(BootstrapService::new(
            role_repository,
            user_repository,
            assignment_repository,
            password_hasher,
            audit_repository.clone(),
        )),
        audit_service: Arc::new(AuditService::new(
            audit_repository,
            authorization_service.clone(),
        )),
        authorization_service,
        frontend_url: frontend_url.clone(),
        bootstrap_token,
    };

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route("/auth/switch-company", post(auth::switch_company_handler))
        .route(
            "/api/roles",
            get(handlers::roles::list_roles_handler).post(handlers::roles::create_role_handler),
        )
        .route(
            "/api/roles/{role_id}",
            get(handlers::roles::get_role_handler)
                .put(handlers::roles::update_role_handler)
                .delete(handlers::roles::delete_role_handler),
        )
        .route(
            "/api/roles/{role_id}/clone",
            post(handlers::roles::clone_role_handler),
        )
        .route(
            "/api/role-assignments",
            get(handlers::assignments::list_role_assignments_handler)
                .post(handlers::assignments::assign_role_handler),
        )
        .route(
            "/api/role-unassignments",
            post(handlers::assignments::unassign_role_handler),
        )
        .route(
            "/api/permissions",
            get(handlers::permissions::permission_catalog_handler),
        )
        .route(
            "/api/me/permissions",
            get(handlers::users::my_permissions_handler),
        )
        .route("/api/users", get(handlers::users::list_users_handler))
        .route(
            "/api/users/{user_id}",
            get(handlers::users::get_user_handler).put(handlers::users::update_user_handler),
        )
        .route(
            "/api/users/{user_id}/roles",
            get(handlers::users::user_roles_handler),
        )
        .route(
            "/api/users/{user_id}/offices",
            get(handlers::users::user_offices_handler),
        )
        .route(
            "/api/users/{user_id}/permissions",
            get(handlers::users::user_permissions_handler),
        )
        .route(
            "/api/users/{user_id}/current-office",
            put(handlers::users::set_current_office_handler),
        )
        .route(
            "/api/offices",
            get(handlers::offices::list_offices_handler)
                .post(handlers::offices::create_office_handler),
        )
        .route(
            "/api/offices/{office_id}",
            put(handlers::offices::update_office_handler)
                .delete(handlers::offices::delete_office_handler),
        )
        .route(
            "/api/offices/{office_id}/access",
            post(handlers::offices::grant_office_access_handler),
        )
        .route(
            "/api/offices/{office_id}/access/{user_id}",
            delete(handlers::offices::revoke_office_access_handler),
        )
        .route(
            "/api/companies",
            get(handlers::companies::list_companies_handler)
                .post(handlers::companies::create_company_handler),
        )
        .route(
            "/api/companies/{company_id}",
            put(handlers::companies::update_company_handler),
        )
        .route(
            "/api/invites",
            get(handlers::invites::list_invites_handler)
                .post(handlers::invites::create_invite_handler),
        )
        .route(
            "/api/invites/{invite_id}",
            put(handlers::invites::update_invite_handler)
                .delete(handlers::invites::revoke_invite_handler),
        )
        .route(
            "/api/audit-log",
            get(handlers::audit::list_audit_log_handler),
        )
        .route_layer(from_fn(middleware::require_auth));

    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(&frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE]);

    let app = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route("/auth/bootstrap", post(auth::bootstrap_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/invites/preview", get(auth::invite_preview_handler))
        .route("/auth/invites/accept", post(auth::accept_invite_handler))
        .merge(protected_routes)
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_same_origin_for_mutations,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .layer(session_layer)
        .with_state(app_state);

    let host = IpAddr::from_str(&api_host)
        .map_err(|error| AppError::Internal(format!("invalid API_HOST '{api_host}': {error}")))?;
    let address = SocketAddr::from((host, api_port));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "crewdeck-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}
