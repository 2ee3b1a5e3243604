//! Probe round, cache, online and prune commands.

use anyhow::{Context, Result};
use serde::Deserialize;

use super::http::{base_url, get_json, post_json};

#[derive(Deserialize)]
struct ServersResponse {
    online: Vec<ServerInfo>,
    unreachable: Vec<String>,
}

#[derive(Deserialize)]
#[allow(dead_code)]
struct ServerInfo {
    address: String,
    version: String,
    name: String,
    map: String,
    game_type: String,
    flags: u32,
    num_players: u32,
    max_players: u32,
    num_clients: u32,
    max_clients: u32,
    players: Vec<PlayerInfo>,
}

#[derive(Deserialize)]
struct PlayerInfo {
    name: String,
    clan: String,
    country: i32,
    score: i32,
    is_player: bool,
}

/// Teeworlds sends -1 for "no flag".
fn country_label(code: i32) -> String {
    if code < 0 {
        "-".to_string()
    } else {
        code.to_string()
    }
}

fn player_line(p: &PlayerInfo) -> String {
    let clan = if p.clan.is_empty() {
        String::new()
    } else {
        format!(" [{}]", p.clan)
    };
    format!(
        "       {:>5}  {:>4}  {}{}",
        p.score,
        country_label(p.country),
        p.name,
        clan
    )
}

#[derive(Deserialize)]
struct OnlineResponse {
    gametype: String,
    servers: Vec<ServerInfo>,
}

#[derive(Deserialize)]
struct PruneResponse {
    retries: u32,
    removed: Vec<String>,
    remaining: usize,
}

fn print_server(s: &ServerInfo) {
    let lock = if s.flags & 1 != 0 { " 🔒" } else { "" };
    println!("  ┌─ {}{}", s.name, lock);
    println!("  │  address : {}", s.address);
    println!("  │  map     : {} ({})", s.map, s.game_type);
    println!("  └─ players : {}/{}", s.players.len(), s.max_clients);
}

fn print_round(title: &str, resp: &ServersResponse) {
    println!("═══════════════════════════════════════");
    println!(
        "  {} ({} online, {} unreachable)",
        title,
        resp.online.len(),
        resp.unreachable.len()
    );
    println!("═══════════════════════════════════════");

    for s in &resp.online {
        print_server(s);
    }
    if !resp.unreachable.is_empty() {
        println!("\n  Unreachable:");
        for address in &resp.unreachable {
            println!("  ✗ {}", address);
        }
    }
}

pub async fn cmd_servers(port: u16) -> Result<()> {
    let resp: ServersResponse = get_json(&format!("{}/servers", base_url(port))).await?;
    print_round("Servers", &resp);
    Ok(())
}

pub async fn cmd_cached(port: u16) -> Result<()> {
    let resp: ServersResponse = get_json(&format!("{}/servers/cached", base_url(port))).await?;
    if resp.online.is_empty() && resp.unreachable.is_empty() {
        println!("No cached results yet.");
        return Ok(());
    }
    print_round("Cached Servers", &resp);
    Ok(())
}

pub async fn cmd_online(port: u16, gametype: Option<&str>) -> Result<()> {
    let base = format!("{}/online", base_url(port));
    let url = match gametype {
        Some(g) => reqwest::Url::parse_with_params(&base, &[("gametype", g)])
            .context("invalid game type filter")?
            .to_string(),
        None => base,
    };
    let resp: OnlineResponse = get_json(&url).await?;

    let filter = if resp.gametype.is_empty() {
        "any game type".to_string()
    } else {
        format!("game type ~ {}", resp.gametype)
    };
    if resp.servers.is_empty() {
        println!("No populated servers ({}).", filter);
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Online Servers ({}, {})", resp.servers.len(), filter);
    println!("═══════════════════════════════════════");
    for s in &resp.servers {
        print_server(s);
        for p in s.players.iter().filter(|p| p.is_player) {
            println!("{}", player_line(p));
        }
    }
    Ok(())
}

pub async fn cmd_prune(port: u16, retries: Option<&str>) -> Result<()> {
    let base = format!("{}/prune", base_url(port));
    let url = match retries {
        Some(r) => reqwest::Url::parse_with_params(&base, &[("retries", r)])
            .context("invalid retries value")?
            .to_string(),
        None => base,
    };
    let resp: PruneResponse = post_json(&url).await?;

    println!(
        "Pruned {} unreachable endpoints after {} retries ({} remaining).",
        resp.removed.len(),
        resp.retries,
        resp.remaining
    );
    for address in &resp.removed {
        println!("  ✗ {}", address);
    }
    Ok(())
}
