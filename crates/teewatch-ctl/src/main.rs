//! teewatch-ctl: command-line interface for the teewatch daemon.

mod cmd;

use anyhow::{Context, Result};

const DEFAULT_PORT: u16 = 9310;

fn print_usage() {
    println!("Usage: teewatch-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  status             Show registry and cache counts");
    println!("  list               List registered endpoints");
    println!("  add <ip:port>      Register an endpoint");
    println!("  remove <ip:port>   Unregister an endpoint");
    println!("  save               Write the registry to the server list file");
    println!("  reload             Replace the registry with the server list file");
    println!("  servers            Probe every endpoint now");
    println!("  cached             Show the latest cached results");
    println!("  online [gametype]  Probe and show populated servers");
    println!("  prune [retries]    Remove endpoints that never answer");
    println!("  shutdown           Stop the daemon");
    println!();
    println!("Options:");
    println!("  --port <port>   API port (default: {})", DEFAULT_PORT);
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse --port option
    let mut port = DEFAULT_PORT;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--port" {
            i += 1;
            port = args
                .get(i)
                .context("--port requires a value")?
                .parse()
                .context("--port must be a number")?;
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["status"] | [] => cmd::status::cmd_status(port).await,
        ["list"] => cmd::endpoints::cmd_list(port).await,
        ["add", address] => cmd::endpoints::cmd_add(port, address).await,
        ["remove", address] => cmd::endpoints::cmd_remove(port, address).await,
        ["save"] => cmd::endpoints::cmd_save(port).await,
        ["reload"] => cmd::endpoints::cmd_reload(port).await,
        ["servers"] => cmd::servers::cmd_servers(port).await,
        ["cached"] => cmd::servers::cmd_cached(port).await,
        ["online"] => cmd::servers::cmd_online(port, None).await,
        ["online", gametype] => cmd::servers::cmd_online(port, Some(*gametype)).await,
        ["prune"] => cmd::servers::cmd_prune(port, None).await,
        ["prune", retries] => cmd::servers::cmd_prune(port, Some(*retries)).await,
        ["shutdown"] => cmd::status::cmd_shutdown(port).await,
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
