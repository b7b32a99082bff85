//! Connection commands

use anyhow::bail;
use colored::{ColoredString, Colorize};
use nodelink_core::api::DaemonApi;
use nodelink_core::connection::store::actions;
use nodelink_core::looper::ActionLooperConfig;
use nodelink_core::types::{ConnectionStatus, Provider};
use tracing::info;

use super::context::Context;

/// Arguments of `nodelink connect`
pub struct ConnectArgs {
    pub provider_id: String,
    pub country: Option<String>,
    pub identity: Option<String>,
    pub follow: bool,
}

fn paint(status: ConnectionStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        ConnectionStatus::Connected => text.green().bold(),
        ConnectionStatus::NotConnected => text.red(),
        ConnectionStatus::Connecting | ConnectionStatus::Disconnecting => text.yellow(),
    }
}

fn or_unknown(value: Option<String>) -> String {
    value.unwrap_or_else(|| "unknown".to_string())
}

pub async fn run_status() -> anyhow::Result<()> {
    let ctx = Context::load()?;
    let response = ctx.api.connection_status().await?;

    println!("Status: {}", paint(response.status));
    if let Some(session_id) = response.session_id {
        println!("Session: {}", session_id);
    }
    Ok(())
}

pub async fn run_ip() -> anyhow::Result<()> {
    let ctx = Context::load()?;
    let settings = ctx.config.store_settings();
    let ip = ctx.api.connection_ip(Some(settings.ip_update_timeout)).await?;

    println!("IP: {}", ip.ip.bold());
    Ok(())
}

pub async fn run_location() -> anyhow::Result<()> {
    let ctx = Context::load()?;
    let settings = ctx.config.store_settings();
    let location = ctx
        .api
        .location(Some(settings.location_update_timeout))
        .await?;

    println!("IP: {}", or_unknown(location.ip));
    println!("ASN: {}", or_unknown(location.asn));
    println!("Country: {}", or_unknown(location.country));
    Ok(())
}

pub async fn run_statistics() -> anyhow::Result<()> {
    let ctx = Context::load()?;
    let statistics = ctx.api.connection_statistics().await?;

    println!("Duration: {}s", statistics.duration);
    println!("Received: {} bytes", statistics.bytes_received);
    println!("Sent: {} bytes", statistics.bytes_sent);
    Ok(())
}

pub async fn run_connect(args: ConnectArgs) -> anyhow::Result<()> {
    let ctx = Context::load()?;
    if let Some(identity) = args.identity {
        ctx.store.set_current_identity(identity);
    }

    // Origin country for analytics; connecting works without it
    ctx.store.fetch_location().await;

    ctx.store
        .start_action_looping(ActionLooperConfig::new(
            actions::FETCH_CONNECTION_STATUS,
            ctx.config.store_settings().status_update_interval,
        ))?;

    let provider = Provider::new(args.provider_id, args.country);
    info!(provider_id = %provider.id, "Connect requested");
    println!("Connecting to {}...", provider.id.bold());
    let connected = ctx.store.connect(provider).await;
    if let Err(e) = connected {
        ctx.finish().await;
        return Err(e.into());
    }

    if let Some(message) = ctx.store.error_message() {
        ctx.finish().await;
        bail!(message);
    }

    let result = if args.follow {
        follow(&ctx).await
    } else {
        println!("Status: {}", paint(ctx.store.status()));
        Ok(())
    };

    ctx.finish().await;
    result
}

/// Print status transitions until Ctrl+C, then disconnect
async fn follow(ctx: &Context) -> anyhow::Result<()> {
    let mut changes = ctx.store.subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    println!("Status: {} (Ctrl+C to disconnect)", paint(ctx.store.status()));
    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let change = *changes.borrow_and_update();
                println!("Status: {} -> {}", paint(change.old), paint(change.new));
            }
            signal = &mut ctrl_c => {
                signal?;
                println!("Disconnecting...");
                break;
            }
        }
    }

    ctx.store.disconnect().await;
    if let Some(message) = ctx.store.error_message() {
        bail!(message);
    }
    println!("Status: {}", paint(ctx.store.status()));
    Ok(())
}

pub async fn run_disconnect() -> anyhow::Result<()> {
    let ctx = Context::load()?;

    ctx.store.disconnect().await;
    ctx.finish().await;

    if let Some(message) = ctx.store.error_message() {
        bail!(message);
    }
    println!("Status: {}", paint(ctx.store.status()));
    if let Some(ip) = ctx.store.ip() {
        println!("IP: {}", ip);
    }
    Ok(())
}
