//! Minimal backend for trying the balancer locally.
//!
//! Answers every request with the port it listens on, so rotation is
//! visible from the client side.

use axum::{extract::State, Router};
use clap::Parser;
use std::net::SocketAddr;

#[derive(Parser)]
#[command(name = "demo-backend")]
#[command(about = "Toy upstream that reports its own port", long_about = None)]
struct Cli {
    /// Port to listen on.
    port: u16,

    /// Interface to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
}

async fn hello(State(port): State<u16>) -> String {
    tracing::info!(port, "Received request");
    format!("Hello! I am the Backend Server running on Port {}\n", port)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let app = Router::new().fallback(hello).with_state(cli.port);

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Backend server starting");
    axum::serve(listener, app).await?;
    Ok(())
}
