//! Example consumer: serves the resources configured in `config/docstore.json` and runs
//! the console commands contributed by the enabled extensions.
//!
//! Run from repo root: `cargo run -p example-consumer -- serve`
//! Manifest commands: `cargo run -p example-consumer -- soft-delete:purge --class 'App\Post'`

use clap::{Parser, Subcommand};
use docstore_rest::{app_router, Bootstrap, CliRegistry, ServiceRegistry};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "example-consumer")]
#[command(about = "Serve document resources over a JSON REST API", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the configured resources (default)
    Serve {
        /// Address to bind, overriding the config file and DOCSTORE_BIND
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Print the extension manifest as JSON
    Manifest,

    /// Any command registered by the manifest (see `extensions:list`)
    #[command(external_subcommand)]
    External(Vec<String>),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("docstore_rest=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = docstore_rest::load()?;
    let mut app = Bootstrap::new(config, ServiceRegistry::default()).load_modules_post()?;

    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Manifest => {
            println!("{}", serde_json::to_string_pretty(&app.manifest().describe())?);
        }
        Commands::External(argv) => {
            app.connect().await?;
            let mut commands = CliRegistry::new();
            app.load_cli(&mut commands);
            println!("{}", commands.run(&argv).await?);
        }
        Commands::Serve { bind } => {
            app.connect().await?;
            let bind = bind.unwrap_or_else(|| app.config().server.bind.clone());
            let body_limit = app.config().server.body_limit;
            let router = app_router(app.into_state(), body_limit);
            let listener = TcpListener::bind(&bind).await?;
            tracing::info!("docstore listening on http://{}", listener.local_addr()?);
            axum::serve(listener, router).await?;
        }
    }
    Ok(())
}
