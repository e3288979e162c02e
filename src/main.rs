use anyhow::Context;
use bookshelf_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        "bookshelf-app bootstrap starting"
    );

    let app = bookshelf_app::bootstrap(settings).await?;
    let router = app.router();
    let served = bookshelf_http::start_server(router, &app.state.settings).await;

    app.shutdown().await?;
    served
}
