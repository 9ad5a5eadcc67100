use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use sea_orm_migration::MigratorTrait;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use parkpass_backend::{
    config::Config,
    db,
    entities::user::{self, UserRole},
    mail,
    middleware::rate_limit::{create_global_governor, log_request},
    routes,
    utils::password::hash_secret,
    AppState,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parkpass_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!("Starting server at {}", config.server_addr());

    // Connect to database
    let db = db::connect(&config)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Connected to database");

    // Run migrations
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    tracing::info!("Migrations complete");

    // Seed super-admin account if not exists
    seed_super_admin(&db, &config).await;

    let mailer = mail::from_config(&config).expect("Failed to configure mailer");

    // Create app state
    let state = AppState {
        db: Arc::new(db),
        config: config.clone(),
        mailer,
    };

    // Create router with middleware
    let app = routes::create_router(state)
        .layer(axum::middleware::from_fn(log_request))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(create_global_governor());

    // Start server with socket address for rate limiting
    let addr: SocketAddr = config.server_addr().parse().expect("Invalid address");
    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}

/// Seed the configured super-admin if no account uses that email yet
async fn seed_super_admin(db: &DatabaseConnection, config: &Config) {
    let email = config.admin_email.trim().to_lowercase();

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(db)
        .await
        .expect("Failed to check for super-admin");

    if existing.is_none() {
        let password_hash =
            hash_secret(&config.admin_password).expect("Failed to hash super-admin password");
        let now = Utc::now();

        let admin = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Super Admin".to_string()),
            email: Set(email.clone()),
            password_hash: Set(password_hash),
            role: Set(UserRole::SuperAdmin),
            reset_otp_hash: Set(None),
            reset_otp_expires_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        admin.insert(db).await.expect("Failed to create super-admin");
        tracing::info!("Super-admin account created: {}", email);
    }
}
