//! Error export - what callers see when things go wrong.
//!
//! Starts a service on an ephemeral port, calls it over TCP, and prints each
//! response:
//! - a plain handler error shows its description
//! - an exportable handler error shows its exported value
//! - an unknown function is reported as an internal error
//! - a service with a failed registration refuses to start
//!
//! ```text
//! RUST_LOG=hoist=debug cargo run --example errors
//! ```

use std::sync::Arc;

use hoist::codec::JsonCodec;
use hoist::details::{RequestDetails, ResponseDetails};
use hoist::handler::{DynamicValue, ExportError, HandlerError};
use hoist::wire::{self, AsyncDecoder};
use hoist::{ServeConfig, Server, Service};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct Ctx;

#[derive(Debug, thiserror::Error)]
#[error("quota exceeded for {user}")]
struct QuotaExceeded {
    user: String,
    limit: u32,
}

#[derive(Serialize)]
struct QuotaExport {
    code: &'static str,
    limit: u32,
}

impl ExportError for QuotaExceeded {
    type Export = QuotaExport;

    fn export(&self) -> QuotaExport {
        QuotaExport {
            code: "quota_exceeded",
            limit: self.limit,
        }
    }
}

fn build_service() -> Service {
    let service = Service::new("errors");

    service.register_as("plain", |_: Ctx, _: Value| -> Result<(), HandlerError> {
        Err(HandlerError::msg("something went wrong"))
    });
    service.register_as("quota", |_: Ctx, user: String| -> Result<(), HandlerError> {
        Err(HandlerError::exportable(QuotaExceeded { user, limit: 10 }))
    });

    service
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut server = Server::start(Arc::new(build_service()), ServeConfig::default()).await?;

    let stream = TcpStream::connect(server.local_addr()).await?;
    let (reader, mut writer) = stream.into_split();
    let mut decoder = AsyncDecoder::new(reader);

    let calls = [
        ("1", "plain", json!(null)),
        ("2", "quota", json!("alice")),
        ("3", "missing", json!(null)),
    ];

    for (id, function, params) in calls {
        let details = RequestDetails::new(id, "errors", function);
        writer
            .write_all(&wire::encode(Some(&details), &params)?)
            .await?;

        let response = decoder.decode().await?;
        let details: ResponseDetails = JsonCodec::decode(&response.raw_details)?;
        let payload: Value = JsonCodec::decode(&response.raw_params)?;
        println!(
            "{function:>8}: err={} ierr={} payload={payload}",
            details.is_error, details.is_internal_error
        );
    }

    server.shutdown();
    server.wait().await?;

    let broken = build_service();
    broken.register_as("nothing", DynamicValue::Nil);
    if let Err(e) = Server::start(Arc::new(broken), ServeConfig::default()).await {
        println!("refused to start: {e}");
    }

    Ok(())
}
