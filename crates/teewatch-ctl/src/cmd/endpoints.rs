//! Endpoint registry commands.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::http::{base_url, get_json, post_json, post_json_body};

#[derive(Deserialize)]
struct EndpointsResponse {
    endpoints: Vec<String>,
}

#[derive(Serialize)]
struct AddressRequest<'a> {
    address: &'a str,
}

#[derive(Deserialize)]
struct AddressResponse {
    address: String,
    registered: usize,
}

#[derive(Deserialize)]
struct SaveResponse {
    path: String,
    saved: usize,
}

#[derive(Deserialize)]
struct ReloadResponse {
    path: String,
    loaded: usize,
    duplicates: usize,
    invalid: usize,
}

pub async fn cmd_list(port: u16) -> Result<()> {
    let resp: EndpointsResponse = get_json(&format!("{}/endpoints", base_url(port))).await?;

    if resp.endpoints.is_empty() {
        println!("No endpoints registered.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Registered Endpoints ({})", resp.endpoints.len());
    println!("═══════════════════════════════════════");
    for endpoint in &resp.endpoints {
        println!("  {}", endpoint);
    }

    Ok(())
}

pub async fn cmd_add(port: u16, address: &str) -> Result<()> {
    let resp: AddressResponse = post_json_body(
        &format!("{}/endpoints", base_url(port)),
        &AddressRequest { address },
    )
    .await?;
    println!("✓ Added {} ({} registered)", resp.address, resp.registered);
    Ok(())
}

pub async fn cmd_remove(port: u16, address: &str) -> Result<()> {
    let resp: AddressResponse = post_json_body(
        &format!("{}/endpoints/remove", base_url(port)),
        &AddressRequest { address },
    )
    .await?;
    println!("✓ Removed {} ({} registered)", resp.address, resp.registered);
    Ok(())
}

pub async fn cmd_save(port: u16) -> Result<()> {
    let resp: SaveResponse = post_json(&format!("{}/endpoints/save", base_url(port))).await?;
    println!("Saved {} endpoints to {}", resp.saved, resp.path);
    Ok(())
}

pub async fn cmd_reload(port: u16) -> Result<()> {
    let resp: ReloadResponse = post_json(&format!("{}/endpoints/reload", base_url(port))).await?;
    println!("Reloaded {} endpoints from {}", resp.loaded, resp.path);
    if resp.duplicates > 0 || resp.invalid > 0 {
        println!(
            "  skipped {} duplicate and {} invalid lines",
            resp.duplicates, resp.invalid
        );
    }
    Ok(())
}
