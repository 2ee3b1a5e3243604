use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};

use crate::*;
use teewatch_api::ApiState;
use teewatch_services::{EndpointRegistry, ProbeAggregator, StatusCache};

// ── Harness ───────────────────────────────────────────────────────────────────

struct Api {
    base: String,
    state: ApiState,
    _task: tokio::task::JoinHandle<()>,
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|a| a.port())
        .expect("free port")
}

fn temp_list(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("teewatch-it-{}-{}", std::process::id(), name))
        .join("servers.txt")
}

async fn start_api(list_path: PathBuf) -> Result<Api> {
    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
    let state = ApiState {
        registry: EndpointRegistry::new(),
        aggregator: ProbeAggregator::teeworlds(),
        cache: StatusCache::new(),
        response_timeout: Duration::from_millis(200),
        cache_ttl: Duration::from_secs(60),
        prune_retries: 2,
        server_list_path: list_path,
        default_gametype_filter: String::new(),
        shutdown_tx,
    };

    let port = free_port();
    let task = tokio::spawn({
        let state = state.clone();
        async move {
            let _ = teewatch_api::serve(state, port).await;
        }
    });

    let base = format!("http://127.0.0.1:{port}/api");
    for _ in 0..50 {
        if tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return Ok(Api {
                base,
                state,
                _task: task,
            });
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    bail!("API did not start on port {port}")
}

impl Api {
    async fn get(&self, path: &str) -> Result<Value> {
        let resp = reqwest::get(format!("{}{}", self.base, path))
            .await
            .with_context(|| format!("GET {path}"))?;
        if !resp.status().is_success() {
            bail!("GET {path} returned {}", resp.status());
        }
        Ok(resp.json().await?)
    }

    async fn post(&self, path: &str, body: Option<Value>) -> Result<(u16, String)> {
        let mut req = reqwest::Client::new().post(format!("{}{}", self.base, path));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.with_context(|| format!("POST {path}"))?;
        let status = resp.status().as_u16();
        Ok((status, resp.text().await?))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_api_registry_round_trip() -> Result<()> {
    let list = temp_list("registry");
    let api = start_api(list.clone()).await?;

    let (code, _) = api
        .post("/endpoints", Some(json!({ "address": "203.0.113.9:8303" })))
        .await?;
    assert_eq!(code, 200);

    let (code, body) = api
        .post("/endpoints", Some(json!({ "address": "203.0.113.9:8303" })))
        .await?;
    assert_eq!(code, 409);
    assert!(body.contains("already exists"), "{body}");

    let (code, body) = api
        .post("/endpoints", Some(json!({ "address": "203.0.113.9:443" })))
        .await?;
    assert_eq!(code, 400);
    assert!(body.contains("port"), "{body}");

    api.post("/endpoints", Some(json!({ "address": " [2001:db8::7]:8303 " })))
        .await?;
    let listed = api.get("/endpoints").await?;
    assert_eq!(
        listed["endpoints"],
        json!(["203.0.113.9:8303", "[2001:db8::7]:8303"])
    );

    let (code, body) = api.post("/endpoints/save", None).await?;
    assert_eq!(code, 200, "{body}");
    assert_eq!(
        std::fs::read_to_string(&list)?,
        "203.0.113.9:8303\n[2001:db8::7]:8303\n"
    );

    let (code, _) = api
        .post("/endpoints/remove", Some(json!({ "address": "203.0.113.9:8303" })))
        .await?;
    assert_eq!(code, 200);
    let (code, _) = api
        .post("/endpoints/remove", Some(json!({ "address": "203.0.113.9:8303" })))
        .await?;
    assert_eq!(code, 404);
    assert_eq!(api.state.registry.len(), 1);

    let (code, _) = api.post("/endpoints/reload", None).await?;
    assert_eq!(code, 200);
    assert_eq!(api.state.registry.len(), 2);

    let _ = std::fs::remove_dir_all(list.parent().unwrap());
    Ok(())
}

#[tokio::test]
async fn test_api_rounds_online_and_prune() -> Result<()> {
    let api = start_api(temp_list("rounds")).await?;
    let ctf = spawn_fake(Behaviour::Respond(server_status("ctf", "CTF", 3))).await;
    let dm = spawn_fake(Behaviour::Respond(server_status("dm", "DM", 5))).await;
    let dead = spawn_fake(Behaviour::Silent).await;
    for fake in [&ctf, &dm, &dead] {
        api.state.registry.add(&fake.address)?;
    }

    let servers = api.get("/servers").await?;
    assert_eq!(servers["online"][0]["name"], "dm");
    assert_eq!(servers["online"][1]["name"], "ctf");
    assert_eq!(servers["unreachable"], json!([dead.address]));

    let status = api.get("/status").await?;
    assert_eq!(status["registered"], 3);
    assert_eq!(status["cached"], 3);
    assert_eq!(status["cached_online"], 2);

    let online = api.get("/online?gametype=ctf").await?;
    assert_eq!(online["servers"].as_array().map(Vec::len), Some(1));
    assert_eq!(online["servers"][0]["address"], json!(ctf.address));

    let (code, body) = api.post("/prune?retries=abc", None).await?;
    assert_eq!(code, 200, "{body}");
    let pruned: Value = serde_json::from_str(&body)?;
    assert_eq!(pruned["retries"], 2);
    assert_eq!(pruned["removed"], json!([dead.address]));
    assert_eq!(pruned["remaining"], 2);

    let cached = api.get("/servers/cached").await?;
    assert_eq!(cached["unreachable"], json!([]));
    Ok(())
}

#[tokio::test]
async fn test_api_shutdown_reaches_subscribers() -> Result<()> {
    let api = start_api(temp_list("shutdown")).await?;
    let mut rx = api.state.shutdown_tx.subscribe();

    let (code, _) = api.post("/daemon/shutdown", None).await?;
    assert_eq!(code, 200);
    tokio::time::timeout(Duration::from_secs(1), rx.recv()).await??;
    Ok(())
}
