//! Echo service - simple request/response example.
//!
//! This example demonstrates:
//! - Creating a service and registering a typed handler
//! - Reading the port from the `PORT` environment variable
//! - Serving over TCP
//!
//! # Running
//!
//! ```text
//! PORT=7000 RUST_LOG=debug cargo run --example echo
//! ```
//!
//! Then, from another terminal:
//!
//! ```text
//! printf '1,35,19:{"id":"1","svc":"echo","fn":"echo"}{"message":"hello"}' | nc 127.0.0.1 7000
//! ```

use hoist::handler::HandlerError;
use hoist::{ServeConfig, Service};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Context handed to every handler; this service needs none.
#[derive(Default)]
struct Ctx;

/// Input structure for the echo function.
#[derive(Deserialize, Debug)]
struct EchoInput {
    message: String,
}

/// Output structure for the echo function.
#[derive(Serialize, Debug)]
struct EchoOutput {
    echo: String,
}

fn echo(_: Ctx, input: EchoInput) -> Result<EchoOutput, HandlerError> {
    Ok(EchoOutput {
        echo: input.message,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let service = Service::new("echo");
    service.register_as("echo", echo);

    service.serve(ServeConfig::from_env()?).await?;
    Ok(())
}
