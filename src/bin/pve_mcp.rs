//! PvE Battle MCP Server
//!
//! A Model Context Protocol server using the official Rust SDK (rmcp)
//! that exposes the PvE battle service for LLM interaction.

use std::borrow::Cow;
use std::sync::Arc;

use pokemon_tcg_pve::mcp_interface::*;
use pokemon_tcg_pve::roster::starter_deck;
use pokemon_tcg_pve::{BattleService, PveConfig, PveError};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ErrorData as McpError, *},
    schemars, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
};
use serde::Deserialize;
use tokio::io::{stdin, stdout};

const MCP_USER: &str = "mcp-player";

#[derive(Clone)]
pub struct PveMcpService {
    tool_router: ToolRouter<PveMcpService>,
    service: Arc<BattleService>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct StartBattleRequest {
    #[schemars(description = "Id of the opponent to challenge, e.g. 'fire-easy'")]
    pub opponent_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct BattleRequest {
    #[schemars(description = "Id returned by start_battle")]
    pub battle_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SubmitActionRequest {
    #[schemars(description = "Id returned by start_battle")]
    pub battle_id: String,
    #[schemars(description = "One of the legal moves listed in the battle summary, as JSON")]
    pub action: String,
}

fn internal_error(error: PveError) -> McpError {
    McpError {
        code: ErrorCode(-32603),
        message: Cow::from(describe_error(&error)),
        data: None,
    }
}

#[tool_router]
impl PveMcpService {
    pub fn new(service: BattleService) -> Self {
        Self {
            tool_router: Self::tool_router(),
            service: Arc::new(service),
        }
    }

    #[tool(description = "List the opponents that can be challenged")]
    async fn list_opponents(&self) -> Result<CallToolResult, McpError> {
        let text = get_available_opponents_display(self.service.roster());
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(description = "Start a new battle against the selected opponent")]
    async fn start_battle(
        &self,
        Parameters(request): Parameters<StartBattleRequest>,
    ) -> Result<CallToolResult, McpError> {
        let view = self
            .service
            .create_battle(MCP_USER, &request.opponent_id, &starter_deck())
            .await
            .map_err(internal_error)?;
        Ok(CallToolResult::success(vec![Content::text(
            get_battle_status_summary(&view),
        )]))
    }

    #[tool(description = "Get the current battle state and legal moves")]
    async fn get_battle_state(
        &self,
        Parameters(request): Parameters<BattleRequest>,
    ) -> Result<CallToolResult, McpError> {
        let view = self
            .service
            .get_battle(&request.battle_id)
            .await
            .map_err(internal_error)?;
        Ok(CallToolResult::success(vec![Content::text(
            get_battle_status_summary(&view),
        )]))
    }

    #[tool(description = "Submit one of your legal moves")]
    async fn submit_action(
        &self,
        Parameters(request): Parameters<SubmitActionRequest>,
    ) -> Result<CallToolResult, McpError> {
        let text = match serde_json::from_str(&request.action) {
            Ok(payload) => {
                let outcome = self
                    .service
                    .submit_action_json(&request.battle_id, payload)
                    .await
                    .map_err(internal_error)?;
                describe_outcome(&outcome)
            }
            Err(e) => format!("Action rejected: malformed action: {}", e),
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool_handler]
impl ServerHandler for PveMcpService {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let service = PveMcpService::new(BattleService::in_memory(PveConfig::from_env()?)?);
    let transport = (stdin(), stdout());

    tracing::info!("starting PvE MCP server");
    let server = service.serve(transport).await?;

    let quit_reason = server.waiting().await?;
    tracing::info!(reason = ?quit_reason, "PvE MCP server exiting");
    Ok(())
}
