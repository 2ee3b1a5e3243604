//! Daemon status and shutdown commands.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json, post_json};

#[derive(Deserialize)]
struct StatusResponse {
    registered: usize,
    cached: usize,
    cached_online: usize,
    response_timeout_ms: u64,
    last_round_secs: Option<u64>,
}

#[derive(Deserialize)]
struct ShutdownResponse {
    message: String,
}

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/status", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  teewatch Daemon Status");
    println!("═══════════════════════════════════════");
    println!("  Registered endpoints : {}", resp.registered);
    println!("  Cached results       : {}", resp.cached);
    println!("  Cached online        : {}", resp.cached_online);
    println!("  Response timeout     : {} ms", resp.response_timeout_ms);
    match resp.last_round_secs {
        Some(secs) => println!("  Last round           : {}s ago", secs),
        None => println!("  Last round           : none yet"),
    }

    Ok(())
}

pub async fn cmd_shutdown(port: u16) -> Result<()> {
    let resp: ShutdownResponse =
        post_json(&format!("{}/daemon/shutdown", base_url(port))).await?;
    println!("{}", resp.message);
    Ok(())
}
