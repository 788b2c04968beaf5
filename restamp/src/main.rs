use clap::Parser;
use restamp::commands::{self, Cli, Commands, Session};
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The manifest decides the mode, and the mode decides the log level
    let session = Session::load(&cli).await;
    let verbose = session
        .as_ref()
        .is_ok_and(|session| session.config.mode.is_verbose());
    init_tracing(verbose);

    let session = match session {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let result = match &cli.command {
        Commands::Build { artifacts } => commands::build::execute(&session, artifacts).await,
        Commands::Check { artifact } => commands::check::execute(&session, artifact)
            .await
            .map(|_| ()),
        Commands::Status => commands::status::execute(&session).await,
        Commands::Clean => commands::clean::execute(&session).await.map(|_| ()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "restamp=debug,convenient_rebuild=debug"
    } else {
        "restamp=info,convenient_rebuild=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
