use clap::Parser;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::Level;
use url::Url;

use vcn_payments::{DynGateway, GatewayError, StripeEnv, StripeGateway, TestGateway};

use crate::notify::{DynNotifier, LogNotifier, NotifyError, WebhookNotifier};

#[derive(clap::ValueEnum, Debug, Clone)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

impl From<&LogLevel> for Level {
    fn from(log_level: &LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct Env {
    #[clap(long = "db", env)]
    pub database_url: String,
    #[clap(long, env, default_value = "8080")]
    pub port: u16,
    #[clap(long, env, default_value = "info")]
    pub log_level: LogLevel,
    #[clap(flatten)]
    pub stripe: StripeEnv,
    /// Endpoint of the external receipt delivery service; receipts are
    /// logged instead of delivered when unset
    #[clap(long, env)]
    pub receipt_webhook_url: Option<Url>,
    /// Record payment intents without calling the gateway
    #[clap(long, env, default_value = "false")]
    pub dry_run: bool,
}

impl Env {
    pub async fn get_sqlite_pool(&self) -> Result<SqlitePool, sqlx::Error> {
        SqlitePool::connect(&self.database_url).await
    }

    pub fn get_gateway(&self) -> Result<DynGateway, GatewayError> {
        if self.dry_run {
            Ok(Arc::new(TestGateway::new()))
        } else {
            Ok(Arc::new(StripeGateway::try_from_env(&self.stripe)?))
        }
    }

    pub fn get_notifier(&self) -> Result<DynNotifier, NotifyError> {
        match &self.receipt_webhook_url {
            Some(endpoint) => Ok(Arc::new(WebhookNotifier::new(endpoint.clone())?)),
            None => Ok(Arc::new(LogNotifier::new())),
        }
    }
}

pub fn setup_tracing(env: &Env) {
    let level: Level = (&env.log_level).into();
    let default_filter = format!("vcn_shop={level},vcn_payments={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .compact()
        .init();
}
