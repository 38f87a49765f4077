// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! Ondine CLI entrypoint.
//!
//! By default this serves MCP over streamable HTTP at
//! `http://127.0.0.1:<port>/mcp`.
//!
//! Use `--mcp` to serve MCP over stdio instead (intended for tool
//! integrations). Logs always go to stderr so stdio mode keeps stdout clean
//! for the protocol.
//!
//! The hosted planner is enabled by setting `OPENAI_API_KEY`
//! (`OPENAI_BASE_URL` and `OPENAI_MODEL` override the endpoint and model);
//! the remote tool-planning service by `--planner-url`.

use std::error::Error;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use rmcp::transport::{
    streamable_http_server::session::local::LocalSessionManager, StreamableHttpServerConfig,
    StreamableHttpService,
};

use ondine::budget::BudgetController;
use ondine::llm::{HostedPlanner, LlmPricing, OpenAiConfig, OpenAiPlanner};
use ondine::mcp::OndineMcp;
use ondine::orchestrator::{
    AllowAll, Orchestrator, PlannerMode, TracingAuditSink,
};
use ondine::plan::PlanLimits;
use ondine::remote::{HttpToolPlanningService, ToolPlanningService};
use ondine::store::{BoardFolder, BoardLocks, BoardStore, WriteDurability};

const DEFAULT_MCP_HTTP_PORT: u16 = 27461;
const DEFAULT_BUDGET_USD: f64 = 1.0;
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
const OPENAI_TIMEOUT: Duration = Duration::from_secs(20);
const REMOTE_PLANNER_TIMEOUT: Duration = Duration::from_secs(10);

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [<board-dir>] [--mode <mode>] [--budget-usd <usd>] [--planner-url <url>] [--durable-writes] [--mcp-http-port <port>]\n  {program} [--boards <dir>] [--mode <mode>] [--budget-usd <usd>] [--planner-url <url>] [--durable-writes] [--mcp-http-port <port>]\n  {program} [<board-dir>] [--mode <mode>] [--budget-usd <usd>] [--planner-url <url>] [--durable-writes] --mcp\n\nDefault mode serves MCP over streamable HTTP at `http://127.0.0.1:<port>/mcp`.\n--mcp-http-port selects the port (0 = ephemeral; default {DEFAULT_MCP_HTTP_PORT}).\n--mcp serves MCP over stdio instead and cannot be combined with --mcp-http-port.\n\nIf board-dir/--boards is omitted, the current working directory is used.\n--mode selects the planning policy: deterministic-only, hybrid (default), or openai-strict.\n--budget-usd caps hosted-planner spend for this process (default {DEFAULT_BUDGET_USD}).\n--planner-url points at a remote tool-planning JSON-RPC endpoint.\n--durable-writes opts into slower, best-effort durable persistence (fsync/sync where supported).\n\nThe hosted planner activates when OPENAI_API_KEY is set; OPENAI_BASE_URL and OPENAI_MODEL override the endpoint and model."
    );
}

#[derive(Debug, Default, Clone, PartialEq)]
struct CliOptions {
    mcp: bool,
    board_dir: Option<String>,
    mode: Option<PlannerMode>,
    budget_usd: Option<f64>,
    planner_url: Option<String>,
    mcp_http_port: Option<u16>,
    durable_writes: bool,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mcp" => {
                if options.mcp {
                    return Err(());
                }
                options.mcp = true;
            }
            "--boards" => {
                if options.board_dir.is_some() {
                    return Err(());
                }
                let dir = args.next().ok_or(())?;
                options.board_dir = Some(dir);
            }
            "--mode" => {
                if options.mode.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                let mode = PlannerMode::from_str(&raw).map_err(|_| ())?;
                options.mode = Some(mode);
            }
            "--budget-usd" => {
                if options.budget_usd.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                let budget: f64 = raw.parse().map_err(|_| ())?;
                if !budget.is_finite() || budget < 0.0 {
                    return Err(());
                }
                options.budget_usd = Some(budget);
            }
            "--planner-url" => {
                if options.planner_url.is_some() {
                    return Err(());
                }
                let url = args.next().ok_or(())?;
                options.planner_url = Some(url);
            }
            "--mcp-http-port" => {
                if options.mcp_http_port.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                let port: u16 = raw.parse().map_err(|_| ())?;
                options.mcp_http_port = Some(port);
            }
            "--durable-writes" => {
                if options.durable_writes {
                    return Err(());
                }
                options.durable_writes = true;
            }
            _ if arg.starts_with('-') => return Err(()),
            _ => {
                if options.board_dir.is_some() {
                    return Err(());
                }
                options.board_dir = Some(arg);
            }
        }
    }

    if options.mcp && options.mcp_http_port.is_some() {
        return Err(());
    }

    Ok(options)
}

fn hosted_planner_from_env() -> Result<Option<Arc<dyn HostedPlanner>>, Box<dyn Error>> {
    let Ok(api_key) = std::env::var("OPENAI_API_KEY") else {
        return Ok(None);
    };
    if api_key.is_empty() {
        return Ok(None);
    }
    let base_url = std::env::var("OPENAI_BASE_URL")
        .unwrap_or_else(|_| "https://api.openai.com/v1".to_owned());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_owned());
    let planner = OpenAiPlanner::new(OpenAiConfig {
        base_url,
        api_key,
        model,
        max_completion_tokens: 1024,
        timeout: OPENAI_TIMEOUT,
        pricing: LlmPricing { prompt_usd_per_1k: 0.00015, completion_usd_per_1k: 0.0006 },
    })?;
    Ok(Some(Arc::new(planner)))
}

fn build_server(options: &CliOptions) -> Result<OndineMcp, Box<dyn Error>> {
    let dir = options.board_dir.clone().unwrap_or_else(|| ".".to_owned());
    let folder = if options.durable_writes {
        BoardFolder::new(dir).with_durability(WriteDurability::Durable)
    } else {
        BoardFolder::new(dir)
    };
    let store: Arc<dyn BoardStore> = Arc::new(folder);

    let hosted = hosted_planner_from_env()?;
    let remote: Option<Arc<dyn ToolPlanningService>> = match &options.planner_url {
        Some(url) => {
            Some(Arc::new(HttpToolPlanningService::new(url.clone(), REMOTE_PLANNER_TIMEOUT)?))
        }
        None => None,
    };

    let mode = options.mode.unwrap_or(PlannerMode::Hybrid);
    if mode == PlannerMode::OpenAiStrict && hosted.is_none() {
        return Err("--mode openai-strict requires OPENAI_API_KEY".into());
    }

    let orchestrator = Orchestrator::new(
        store.clone(),
        BoardLocks::new(),
        BudgetController::new(options.budget_usd.unwrap_or(DEFAULT_BUDGET_USD)),
        hosted,
        remote,
        Arc::new(AllowAll),
        Arc::new(TracingAuditSink),
        mode,
        PlanLimits::default(),
        COMMAND_TIMEOUT,
    );
    Ok(OndineMcp::new(orchestrator, store))
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();

        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "ondine".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        let server = build_server(&options)?;
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

        if options.mcp {
            runtime.block_on(server.serve_stdio())?;
            return Ok(());
        }

        let mcp_http_port = options.mcp_http_port.unwrap_or(DEFAULT_MCP_HTTP_PORT);
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind(("127.0.0.1", mcp_http_port)).await?;
            let local_addr = listener.local_addr()?;
            eprintln!("ondine: serving MCP at http://{local_addr}/mcp");

            let config = StreamableHttpServerConfig {
                stateful_mode: true,
                ..StreamableHttpServerConfig::default()
            };
            let session_manager = Arc::new(LocalSessionManager::default());
            let mcp_service = StreamableHttpService::new(
                move || Ok(server.clone()),
                session_manager,
                config,
            );

            let router = Router::new().nest_service("/mcp", mcp_service);
            axum::serve(listener, router).await?;
            Ok::<(), Box<dyn Error>>(())
        })?;

        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("ondine: {err}");
        std::process::exit(1);
    }
}
