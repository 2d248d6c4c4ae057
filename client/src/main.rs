use clap::Parser;
use client::{run_script, ScriptConfig};
use log::{error, info, LevelFilter};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:17091")]
    server: String,

    /// Username sent with the login request
    #[arg(short = 'u', long, default_value = "TestUser")]
    username: String,

    /// World to join
    #[arg(short = 'w', long, default_value = "START")]
    world: String,

    /// Chat line sent after joining
    #[arg(short = 'm', long, default_value = "Hello from test client!")]
    message: String,

    /// Milliseconds to stay connected after chatting
    #[arg(short = 'l', long, default_value = "2000")]
    linger_ms: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let config = ScriptConfig {
        username: args.username,
        world: args.world,
        message: args.message,
        linger: Duration::from_millis(args.linger_ms),
    };

    info!("Connecting to: {}", args.server);
    match run_script(args.server.as_str(), &config).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Test client failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
