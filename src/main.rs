use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use tcphttp::config::ServerConfig;
use tcphttp::handler::router;
use tcphttp::net::Server;

#[derive(Parser, Debug)]
#[command(version, about = "HTTP/1.1 server over raw TCP")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the configuration file
    #[arg(short, long)]
    port: Option<u16>,
}

#[async_std::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match ServerConfig::from_file(path) {
            Ok(config) => config,
            Err(err) => {
                error!("{}", err);
                return ExitCode::FAILURE;
            }
        },
        None => ServerConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }

    let server = match Server::serve(config, router::route).await {
        Ok(server) => server,
        Err(err) => {
            error!("error starting server: {}", err);
            return ExitCode::FAILURE;
        }
    };

    server.run().await;
    ExitCode::SUCCESS
}
