use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing with an `EnvFilter` (from `RUST_LOG`, defaulting to
/// `imgopt=info`) and either human-readable or JSON output.
pub fn init_telemetry(json: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "imgopt=info,tower_http=info".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_current_span(true)))
        .with((!json).then(fmt::layer))
        .try_init()?;

    tracing::debug!(json, "Telemetry initialized");
    Ok(())
}
