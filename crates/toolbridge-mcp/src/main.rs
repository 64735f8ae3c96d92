//! toolbridge-mcp: serve the built-in capabilities, or call tools directly.

use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use tokio_util::sync::CancellationToken;

use toolbridge::{with_bundle, Dispatcher, RequestContext, TracingMiddleware};
use toolbridge_mcp::config::{resolve_http_addr, resolve_log_level, resolve_token};
use toolbridge_mcp::types::{InitializeResult, ServerCapabilities, MCP_VERSION};
use toolbridge_mcp::{builtin_builder, McpServer};

#[derive(Parser)]
#[command(
    name = "toolbridge-mcp",
    about = "Serve registered tools, prompts and resources over MCP, or call tools directly",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server over stdio (default).
    Serve,

    /// Start MCP server over HTTP.
    #[cfg(feature = "http")]
    ServeHttp {
        /// Listen address (host:port). Also reads TOOLBRIDGE_HTTP_ADDR.
        #[arg(long)]
        addr: Option<String>,

        /// Bearer token for authentication. Also reads TOOLBRIDGE_TOKEN.
        #[arg(long)]
        token: Option<String>,
    },

    /// Call a tool directly, bypassing the protocol runtime.
    Call {
        /// Tool name.
        tool: String,

        /// JSON arguments.
        #[arg(default_value = "{}")]
        args: String,
    },

    /// List registered capabilities.
    List {
        #[arg(value_enum, default_value_t = ListKind::Tools)]
        kind: ListKind,
    },

    /// Print server capabilities as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   toolbridge-mcp completions bash > ~/.local/share/bash-completion/completions/toolbridge-mcp
    ///   toolbridge-mcp completions zsh > ~/.zfunc/_toolbridge-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },

    /// Launch interactive REPL mode.
    Repl,
}

#[derive(Clone, Copy, ValueEnum)]
enum ListKind {
    Tools,
    Prompts,
    Resources,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = resolve_log_level(cli.log_level.as_deref());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let builder = builtin_builder([with_bundle(TracingMiddleware)])
        .context("registering built-in capabilities")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let server = McpServer::from_builder(builder);
            let transport = toolbridge_mcp::StdioTransport::new(server.handler());
            server.serve(&transport, shutdown_on_ctrl_c()).await?;
        }

        #[cfg(feature = "http")]
        Commands::ServeHttp { addr, token } => {
            let addr = resolve_http_addr(addr.as_deref());
            let token = resolve_token(token.as_deref());
            let server = McpServer::from_builder(builder);
            let transport = toolbridge_mcp::HttpTransport::new(server.handler(), addr)
                .with_token(token);
            server.serve(&transport, shutdown_on_ctrl_c()).await?;
        }

        Commands::Call { tool, args } => {
            serde_json::from_str::<serde_json::Value>(&args)
                .context("arguments must be valid JSON")?;
            let dispatcher = builder.build();
            let segments = dispatcher
                .call_tool_direct(RequestContext::new(), &tool, args.as_bytes())
                .await?;
            for segment in segments {
                println!("{segment}");
            }
        }

        Commands::List { kind } => {
            let dispatcher = builder.build();
            let listing = match kind {
                ListKind::Tools => serde_json::to_value(dispatcher.list_tools())?,
                ListKind::Prompts => serde_json::to_value(dispatcher.list_prompts())?,
                ListKind::Resources => serde_json::to_value(dispatcher.list_resources())?,
            };
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }

        Commands::Info => {
            let dispatcher = builder.build();
            println!("{}", serde_json::to_string_pretty(&info(&dispatcher))?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "toolbridge-mcp", &mut std::io::stdout());
        }

        Commands::Repl => {
            let dispatcher = Arc::new(builder.build());
            let runtime = tokio::runtime::Handle::current();
            tokio::task::spawn_blocking(move || toolbridge_mcp::repl::run(dispatcher, runtime))
                .await??;
        }
    }

    Ok(())
}

fn info(dispatcher: &Dispatcher) -> serde_json::Value {
    let registry = dispatcher.registry();
    let init = InitializeResult::new(
        MCP_VERSION.to_string(),
        ServerCapabilities::for_counts(
            registry.tool_count(),
            registry.prompt_count(),
            registry.resource_count(),
        ),
    );
    let tools = dispatcher.list_tools();
    serde_json::json!({
        "server": init.server_info,
        "protocol_version": init.protocol_version,
        "capabilities": init.capabilities,
        "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
        "tool_count": tools.len(),
    })
}

/// Token cancelled on the first Ctrl+C.
fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, shutting down");
            trigger.cancel();
        }
    });
    token
}
