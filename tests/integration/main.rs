//! teewatch integration test harness.
//!
//! Every test drives real UDP sockets on loopback: fake game servers answer
//! the server-info request the way a Teeworlds 0.6 server does, stay silent,
//! or answer with junk. No root or external network is needed.

mod api;
mod prune;
mod rounds;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::net::UdpSocket;

use teewatch_core::wire::{encode_response, request_token};
use teewatch_core::{PlayerInfo, ServerStatus};

// ── Harness ───────────────────────────────────────────────────────────────────

/// How a fake server reacts to a request.
#[derive(Clone)]
pub enum Behaviour {
    /// Answer every request.
    Respond(ServerStatus),
    /// Ignore the first `n` requests, then answer.
    RespondAfter(usize, ServerStatus),
    /// Never answer.
    Silent,
    /// Answer with bytes that are not a status response.
    Garbage,
}

pub struct FakeServer {
    pub address: String,
    requests: Arc<AtomicUsize>,
}

impl FakeServer {
    /// Number of server-info requests received so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

pub async fn spawn_fake(behaviour: Behaviour) -> FakeServer {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind fake server");
    let address = socket.local_addr().expect("local addr").to_string();
    let requests = Arc::new(AtomicUsize::new(0));

    let counter = requests.clone();
    tokio::spawn(async move {
        let mut buf = [0u8; 64];
        while let Ok((len, from)) = socket.recv_from(&mut buf).await {
            let Some(token) = request_token(&buf[..len]) else {
                continue;
            };
            let seen = counter.fetch_add(1, Ordering::SeqCst);
            let reply = match &behaviour {
                Behaviour::Respond(status) => Some(encode_response(token, status)),
                Behaviour::RespondAfter(n, status) if seen >= *n => {
                    Some(encode_response(token, status))
                }
                Behaviour::RespondAfter(..) | Behaviour::Silent => None,
                Behaviour::Garbage => Some(b"\xff\xff\xff\xff\xff\xffnope".to_vec()),
            };
            if let Some(reply) = reply {
                let _ = socket.send_to(&reply, from).await;
            }
        }
    });

    FakeServer { address, requests }
}

pub fn server_status(name: &str, game_type: &str, players: usize) -> ServerStatus {
    ServerStatus {
        address: String::new(),
        version: "0.6.4".into(),
        name: name.into(),
        map: "ctf2".into(),
        game_type: game_type.into(),
        flags: 0,
        num_players: players as u32,
        max_players: 16,
        num_clients: players as u32,
        max_clients: 16,
        players: (0..players)
            .map(|i| PlayerInfo {
                name: format!("{name}-tee{i}"),
                clan: "[it]".into(),
                country: 276,
                score: (i * 3) as i32,
                is_player: true,
            })
            .collect(),
    }
}
