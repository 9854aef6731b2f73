//! Declaration Desk server binary

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use declaration_desk::{config::Args, server, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("declaration_desk={},info", args.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Declaration Desk");
    info!("  HoF self-declaration form service");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Password gate: {}", if args.require_auth { "REQUIRED" } else { "OFF" });
    info!(
        "Form password: {}",
        if args.form_password.is_some() { "configured" } else { "NOT SET" }
    );
    info!("Signature upload: {}", args.allow_signature_upload);
    info!("Max upload: {} bytes", args.max_upload_bytes);
    info!("Session cookie: {} days", args.session_days);
    let origins = args.dev_origin_list();
    if !origins.is_empty() {
        info!("Dev origins: {}", origins.join(", "));
    }
    info!("======================================");

    let state = Arc::new(AppState::new(args));

    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
