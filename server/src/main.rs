use clap::Parser;
use log::{error, info, LevelFilter};
use server::logging::LogFacade;
use server::network::{Server, ServerConfig, DEFAULT_PORT, DEFAULT_WELCOME};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Console message sent to every new connection
    #[arg(short, long, default_value = DEFAULT_WELCOME)]
    welcome: String,

    /// Append log records to this file instead of the console
    #[arg(short, long)]
    log_file: Option<PathBuf>,
}

/// Main-method of the server.
/// Parses command-line arguments, configures logging, then runs the server
/// until Ctrl+C (or SIGTERM on unix).
#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(args.log_file.as_ref()) {
        eprintln!("Failed to set up logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!("=== Growtopia Private Server ===");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        welcome_message: args.welcome,
    };
    let server = Server::new(config, Arc::new(LogFacade::new("server")));

    if let Err(e) = server.initialize().await {
        error!("Failed to initialize server: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Ready to accept client connections, press Ctrl+C to stop");

    if let Err(e) = server.run(shutdown_signal()).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server shutdown complete");
    ExitCode::SUCCESS
}

/// Colored console logging by default, or plain records appended to a file.
/// `RUST_LOG` overrides the default `info` level.
fn init_logging(log_file: Option<&PathBuf>) -> std::io::Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Info).parse_default_env();

    if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
        builder.write_style(env_logger::WriteStyle::Never);
    }

    builder.init();
    if let Some(path) = log_file {
        info!("File logging enabled: {}", path.display());
    }
    Ok(())
}

/// Completes on Ctrl+C, or on SIGTERM where supported
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down gracefully..."),
        _ = terminate => info!("Received SIGTERM, shutting down gracefully..."),
    }
}
