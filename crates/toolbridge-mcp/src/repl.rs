//! Interactive shell over the direct-invocation path.
//!
//! Launch with `toolbridge-mcp repl`. Tool calls bypass the middleware chain
//! and print raw output segments, the same as `toolbridge-mcp call`.

use std::sync::Arc;

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};
use tokio::runtime::Handle;
use toolbridge::{Dispatcher, RequestContext};

use crate::types::{MCP_VERSION, SERVER_NAME, SERVER_VERSION};

const COMMANDS: &[(&str, &str)] = &[
    ("/tools", "List registered tools"),
    ("/prompts", "List registered prompts"),
    ("/resources", "List registered resources"),
    ("/call", "Call a tool: /call <tool> [json-arguments]"),
    ("/info", "Show server name, version and counts"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

/// A parsed input line.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Tools,
    Prompts,
    Resources,
    Call { tool: &'a str, args: &'a str },
    Info,
    Clear,
    Help,
    Exit,
    Unknown(&'a str),
    Usage(&'static str),
}

fn parse_command(line: &str) -> Command<'_> {
    let input = line.trim();
    let input = input.strip_prefix('/').unwrap_or(input);
    let mut parts = input.splitn(2, ' ');
    let cmd = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("").trim();

    match cmd {
        "" | "help" | "h" | "?" => Command::Help,
        "exit" | "quit" => Command::Exit,
        "clear" | "cls" => Command::Clear,
        "info" => Command::Info,
        "tools" => Command::Tools,
        "prompts" => Command::Prompts,
        "resources" => Command::Resources,
        "call" => {
            let mut call = rest.splitn(2, char::is_whitespace);
            match call.next().filter(|t| !t.is_empty()) {
                Some(tool) => Command::Call {
                    tool,
                    args: call.next().unwrap_or("").trim(),
                },
                None => Command::Usage("/call <tool> [json-arguments]"),
            }
        }
        other => Command::Unknown(other),
    }
}

/// Completes command names, and tool names after `/call`.
struct BridgeHelper {
    tools: Vec<String>,
}

impl Completer for BridgeHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];

        if !input.contains(' ') {
            let matches: Vec<Pair> = COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(input))
                .map(|(cmd, desc)| Pair {
                    display: format!("{cmd:<16} {desc}"),
                    replacement: format!("{cmd} "),
                })
                .collect();
            return Ok((0, matches));
        }

        if let Some(partial) = input.strip_prefix("/call ") {
            if !partial.contains(' ') {
                let matches: Vec<Pair> = self
                    .tools
                    .iter()
                    .filter(|t| t.starts_with(partial))
                    .map(|t| Pair {
                        display: t.clone(),
                        replacement: format!("{t} "),
                    })
                    .collect();
                return Ok((input.len() - partial.len(), matches));
            }
        }

        Ok((pos, Vec::new()))
    }
}

impl Hinter for BridgeHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        if line.starts_with('/') && !line.contains(' ') {
            for (cmd, _) in COMMANDS {
                if cmd.starts_with(line) && *cmd != line {
                    return Some(cmd[line.len()..].to_string());
                }
            }
        }
        None
    }
}

impl Highlighter for BridgeHelper {}
impl Validator for BridgeHelper {}
impl Helper for BridgeHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// Run the REPL on the current thread. Blocks; call it from a blocking task.
pub fn run(dispatcher: Arc<Dispatcher>, runtime: Handle) -> anyhow::Result<()> {
    eprintln!();
    eprintln!("  \x1b[1m{SERVER_NAME} v{SERVER_VERSION}\x1b[0m");
    eprintln!();
    eprintln!(
        "    Press \x1b[36m/\x1b[0m to browse commands, \x1b[90mTab\x1b[0m to complete, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<BridgeHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    rl.set_helper(Some(BridgeHelper {
        tools: dispatcher.list_tools().into_iter().map(|t| t.name).collect(),
    }));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    let hist_path = std::path::PathBuf::from(&home).join(".toolbridge_history");
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let prompt = " \x1b[36mtoolbridge>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Command::Exit => {
                        eprintln!("  Goodbye!");
                        break;
                    }
                    Command::Help => cmd_help(),
                    Command::Clear => eprint!("\x1b[2J\x1b[H"),
                    Command::Info => cmd_info(&dispatcher),
                    Command::Tools => cmd_tools(&dispatcher),
                    Command::Prompts => cmd_prompts(&dispatcher),
                    Command::Resources => cmd_resources(&dispatcher),
                    Command::Call { tool, args } => cmd_call(&dispatcher, &runtime, tool, args),
                    Command::Usage(usage) => eprintln!("  Usage: {usage}"),
                    Command::Unknown(cmd) => {
                        eprintln!("  Unknown command '/{cmd}'. Type /help for commands.");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => {
                eprintln!("  Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    let _ = rl.save_history(&hist_path);

    Ok(())
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<18} {desc}");
    }
    eprintln!();
}

fn cmd_info(dispatcher: &Dispatcher) {
    let registry = dispatcher.registry();
    eprintln!();
    eprintln!("  Server:    {SERVER_NAME} v{SERVER_VERSION}");
    eprintln!("  Protocol:  {MCP_VERSION}");
    eprintln!("  Tools:     {}", registry.tool_count());
    eprintln!("  Prompts:   {}", registry.prompt_count());
    eprintln!("  Resources: {}", registry.resource_count());
    eprintln!();
}

fn cmd_tools(dispatcher: &Dispatcher) {
    let tools = dispatcher.list_tools();
    eprintln!();
    eprintln!("  {} tools:", tools.len());
    for tool in &tools {
        eprintln!("    {:<20} {}", tool.name, tool.description);
    }
    eprintln!();
}

fn cmd_prompts(dispatcher: &Dispatcher) {
    let prompts = dispatcher.list_prompts();
    eprintln!();
    eprintln!("  {} prompts:", prompts.len());
    for prompt in &prompts {
        let args: Vec<&str> = prompt.arguments.iter().map(|a| a.name.as_str()).collect();
        eprintln!(
            "    {:<20} {} ({})",
            prompt.name,
            prompt.description,
            args.join(", ")
        );
    }
    eprintln!();
}

fn cmd_resources(dispatcher: &Dispatcher) {
    let resources = dispatcher.list_resources();
    eprintln!();
    eprintln!("  {} resources:", resources.len());
    for resource in &resources {
        eprintln!(
            "    {:<20} {} [{}]",
            resource.uri, resource.description, resource.mime_type
        );
    }
    eprintln!();
}

fn cmd_call(dispatcher: &Dispatcher, runtime: &Handle, tool: &str, args: &str) {
    let raw = if args.is_empty() { "{}" } else { args };
    if let Err(e) = serde_json::from_str::<serde_json::Value>(raw) {
        eprintln!("  Invalid JSON arguments: {e}");
        return;
    }

    let result = runtime.block_on(dispatcher.call_tool_direct(
        RequestContext::new(),
        tool,
        raw.as_bytes(),
    ));
    match result {
        Ok(segments) => {
            for segment in segments {
                println!("{segment}");
            }
        }
        Err(e) => eprintln!("  Error: {e}"),
    }
}
