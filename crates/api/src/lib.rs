//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for fees, reports and the member registry
//! - Authentication middleware and the acting-user extractor
//! - JSON error responses
//! - SMTP delivery for fee notifications

pub mod error;
pub mod middleware;
pub mod notify;
pub mod routes;

use axum::Router;
use sea_orm::DatabaseConnection;
use sodalis_core::clock::SystemClock;
use sodalis_core::fee::FeeLedgerCoordinator;
use sodalis_db::{
    DbAuditLog, MemberRepository, MovementRepository, PgFeeStore, SocialYearRepository,
};
use sodalis_shared::{EmailService, JwtService};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use notify::SmtpNotifier;

/// The fee coordinator as wired for HTTP requests.
pub type FeeService = FeeLedgerCoordinator<PgFeeStore, SmtpNotifier, DbAuditLog>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Connection pool.
    pub db: DatabaseConnection,
    /// Tenant schema every request works in.
    pub tenant_schema: Arc<str>,
    /// JWT service for token operations.
    pub jwt_service: Arc<JwtService>,
    /// Fee ledger coordinator.
    pub fees: FeeService,
    /// Member registry.
    pub members: MemberRepository,
    /// Social years.
    pub social_years: SocialYearRepository,
    /// Ledger movements.
    pub movements: MovementRepository,
}

impl AppState {
    /// Wires repositories and the fee coordinator onto one tenant schema.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        tenant_schema: &str,
        jwt_service: JwtService,
        email_service: EmailService,
    ) -> Self {
        let schema = tenant_schema.to_string();
        let fees = FeeLedgerCoordinator::new(
            Arc::new(PgFeeStore::new(db.clone(), schema.clone())),
            Arc::new(SmtpNotifier::new(Arc::new(email_service))),
            Arc::new(DbAuditLog::new(db.clone(), schema.clone())),
            Arc::new(SystemClock),
        );

        Self {
            db: db.clone(),
            tenant_schema: Arc::from(tenant_schema),
            jwt_service: Arc::new(jwt_service),
            fees,
            members: MemberRepository::new(db.clone(), schema.clone()),
            social_years: SocialYearRepository::new(db.clone(), schema.clone()),
            movements: MovementRepository::new(db, schema),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
