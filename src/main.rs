use chrono::Local;
use nutrition_tracker::{load_data, load_goals, router, AppState, Config, Resolver};
use std::net::SocketAddr;
use tokio::fs;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    for path in [&config.data_path, &config.goals_path] {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
    }

    let goals = load_goals(&config.goals_path).await;
    let today = Local::now().date_naive();
    let data = load_data(&config.data_path, &goals, today).await;
    let data = Resolver::new(&goals).select_date(&data, today);
    info!(
        days = data.daily_logs.len(),
        auth = config.access_token.is_some(),
        "loaded tracker state"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(AppState::new(config, data, goals));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
