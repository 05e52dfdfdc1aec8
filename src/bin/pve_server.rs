//! PvE battle server over stdio
//!
//! Reads one JSON request per line and writes one JSON response per line:
//!
//! ```text
//! {"op":"create","userId":"ash","opponentId":"fire-easy"}
//! {"op":"action","battleId":"battle_...","action":{"type":"END_TURN","side":"PLAYER"}}
//! {"op":"get","battleId":"battle_..."}
//! {"op":"opponents"}
//! ```

use pokemon_tcg_pve::roster::starter_deck;
use pokemon_tcg_pve::{ActionOutcome, BattleService, PveConfig};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum Request {
    Create {
        user_id: String,
        opponent_id: String,
        #[serde(default)]
        deck: Option<Vec<String>>,
    },
    Action {
        battle_id: String,
        action: Value,
    },
    Get {
        battle_id: String,
    },
    Opponents,
}

struct PveServer {
    service: BattleService,
}

impl PveServer {
    fn new(service: BattleService) -> Self {
        Self { service }
    }

    async fn handle_request(&self, request: Request) -> Value {
        match request {
            Request::Create {
                user_id,
                opponent_id,
                deck,
            } => {
                let deck = deck.unwrap_or_else(starter_deck);
                match self.service.create_battle(&user_id, &opponent_id, &deck).await {
                    Ok(view) => json!({ "ok": true, "state": view }),
                    Err(e) => error_response(e),
                }
            }
            Request::Action { battle_id, action } => {
                match self.service.submit_action_json(&battle_id, action).await {
                    Ok(ActionOutcome::Applied {
                        view,
                        battle_ended,
                        winner,
                    }) => json!({
                        "ok": true,
                        "state": view,
                        "battleEnded": battle_ended,
                        "winner": winner,
                    }),
                    Ok(ActionOutcome::Rejected(violation)) => json!({
                        "ok": false,
                        "rejected": true,
                        "error": violation.to_string(),
                    }),
                    Err(e) => error_response(e),
                }
            }
            Request::Get { battle_id } => match self.service.get_battle(&battle_id).await {
                Ok(view) => json!({ "ok": true, "state": view }),
                Err(e) => error_response(e),
            },
            Request::Opponents => json!({ "ok": true, "opponents": self.service.roster().all() }),
        }
    }

    async fn run(&self) -> io::Result<()> {
        let mut lines = BufReader::new(io::stdin()).lines();
        let mut stdout = io::stdout();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<Request>(&line) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    tracing::debug!(error = %e, "unparseable request");
                    json!({ "ok": false, "error": format!("bad request: {}", e) })
                }
            };

            stdout.write_all(response.to_string().as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }

        Ok(())
    }
}

fn error_response(error: pokemon_tcg_pve::PveError) -> Value {
    tracing::error!(error = %error, "request failed");
    json!({ "ok": false, "error": error.to_string() })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let service = BattleService::in_memory(PveConfig::from_env()?)?;
    tracing::info!("PvE server listening on stdio");
    PveServer::new(service).run().await?;
    Ok(())
}
