use rocket::Config;
use tracing::{error, info};

pub mod api;
pub mod checkout;
pub mod env;
pub mod error;
pub mod inventory;
pub mod notify;
pub mod store;
pub mod views;

#[cfg(test)]
pub mod test_utils;

use crate::env::Env;

pub async fn launch(env: Env) -> anyhow::Result<()> {
    let pool = env.get_sqlite_pool().await?;

    // Run database migrations to ensure all tables exist
    sqlx::migrate!().run(&pool).await?;

    let gateway = env.get_gateway()?;
    let notifier = env.get_notifier()?;

    let config = Config::figment()
        .merge(("port", env.port))
        .merge(("address", "0.0.0.0"));

    let rocket = rocket::custom(config)
        .mount("/", api::routes())
        .manage(pool)
        .manage(gateway)
        .manage(notifier);

    let server_task = tokio::spawn(rocket.launch());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, shutting down gracefully...");
        }

        result = server_task => {
            match result {
                Ok(Ok(_)) => info!("Server completed successfully"),
                Ok(Err(e)) => error!("Server failed: {e}"),
                Err(e) => error!("Server task panicked: {e}"),
            }
        }
    }

    info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::tests::create_test_env;

    #[tokio::test]
    async fn launch_fails_on_unreachable_database() {
        let mut env = create_test_env();
        env.database_url = "sqlite:///nonexistent/path/orders.db".to_string();
        launch(env).await.unwrap_err();
    }
}
