use anyhow::Context;
use bookshelf_kernel::settings::Settings;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "bookshelf")]
#[command(about = "Run and administer the bookshelf API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Apply migrations and serve the HTTP API
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Replace all users, authors and books with the demo data set
    Seed {
        /// RNG seed for reproducible book/author assignment
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    let app = bookshelf_app::bootstrap(settings).await?;
    let outcome = match cli.command {
        Command::Serve => bookshelf_http::start_server(app.router(), &app.state.settings).await,
        Command::Migrate => {
            tracing::info!("migrations applied");
            Ok(())
        }
        Command::Seed { seed } => bookshelf_app::fixtures::load(&app.state.db, seed)
            .await
            .map(|summary| {
                tracing::info!(
                    users = summary.users,
                    authors = summary.authors,
                    books = summary.books,
                    "database seeded"
                );
            }),
    };

    app.shutdown().await?;
    outcome
}
