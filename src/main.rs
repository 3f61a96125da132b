use inventory::{
    cache::InMemoryCacheStore,
    create_router,
    item::repository::{InMemoryItemRepository, ItemRepository, PostgresItemRepository},
    user::repository::{InMemoryUserRepository, PostgresUserRepository, UserRepository},
    AppState, Config,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Repositories = (
    Arc<dyn ItemRepository + Send + Sync>,
    Arc<dyn UserRepository + Send + Sync>,
);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inventory=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting inventory service");

    let config = Config::from_env();
    let (item_repository, user_repository) = repositories(&config).await?;
    let cache = Arc::new(InMemoryCacheStore::new(config.cache_ttl()));

    let app_state = AppState::new(item_repository, user_repository, cache, &config);
    let app = create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(bind_addr = %config.bind_addr, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// PostgreSQL when `DATABASE_URL` is set, in-memory storage otherwise
async fn repositories(config: &Config) -> Result<Repositories, Box<dyn std::error::Error>> {
    match &config.database_url {
        Some(database_url) => {
            let pool = sqlx::PgPool::connect(database_url).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Using PostgreSQL storage");

            Ok((
                Arc::new(PostgresItemRepository::new(pool.clone())),
                Arc::new(PostgresUserRepository::new(pool)),
            ))
        }
        None => {
            info!("DATABASE_URL not set, using in-memory storage");
            Ok((
                Arc::new(InMemoryItemRepository::new()),
                Arc::new(InMemoryUserRepository::new()),
            ))
        }
    }
}
