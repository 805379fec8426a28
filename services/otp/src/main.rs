use anyhow::Context as _;
use sea_orm::Database;
use tracing::info;

use storefront_core::tracing::init_tracing;
use storefront_otp::config::{MailerConfig, OtpConfig};
use storefront_otp::infra::mailer::{AppMailer, HttpMailer, LogMailer};
use storefront_otp::router::build_router;
use storefront_otp::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let config = OtpConfig::from_env()?;

    let db = Database::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    let mailer = match config.mailer {
        MailerConfig::Log => {
            info!("MAIL_API_URL not set, passcode emails will only be logged");
            AppMailer::Log(LogMailer)
        }
        MailerConfig::Http {
            endpoint,
            api_key,
            from,
        } => AppMailer::Http(HttpMailer::new(
            endpoint,
            api_key,
            from,
            config.settings.delivery_timeout,
        )?),
    };

    let state = AppState {
        db,
        cookie_domain: config.cookie_domain,
        settings: config.settings,
        mailer,
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.otp_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("otp service listening on {addr}");
    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
