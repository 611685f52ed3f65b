//! LocLM terminal front-end.
//!
//! Reads prompts line by line from stdin and prints the agent's replies.
//! Lines starting with `/` are session commands.

use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use loclm_lib::model::{parse_model_override, ModelCatalog, ProviderId};
use loclm_lib::runtime::planner::format_plan;
use loclm_lib::{AgentConfig, AgentLoop, AgentMode, AgentResponse, AppError, ProviderConfig};

/// LocLM - a local coding agent
#[derive(Parser, Debug)]
#[command(name = "loclm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Workspace directory the agent may touch
    #[arg(short = 'C', long)]
    workspace: Option<PathBuf>,

    /// Start in `chat` or `agent` mode
    #[arg(long, default_value = "chat")]
    mode: String,

    /// LLM provider: groq, ollama or openai
    #[arg(long)]
    provider: Option<String>,

    /// Model name, optionally `<provider>/<model>`
    #[arg(long)]
    model: Option<String>,

    /// Directory of script tools
    #[arg(long)]
    tools_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Mode(Option<AgentMode>),
    Plan(String),
    Changes,
    Diff(Option<String>),
    Tools { json: bool },
    Models,
    Health,
    Reset,
    Quit,
    Help,
    Unknown(String),
}

impl Command {
    /// Parses a `/command arg` line. Returns None for ordinary prompts.
    fn parse(line: &str) -> Option<Self> {
        let rest = line.trim().strip_prefix('/')?;
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        let arg = (!arg.is_empty()).then(|| arg.to_string());
        Some(match name {
            "mode" => Command::Mode(arg.and_then(|a| AgentMode::from_str(&a).ok())),
            "plan" => match arg {
                Some(request) => Command::Plan(request),
                None => Command::Unknown("/plan needs a request".to_string()),
            },
            "changes" => Command::Changes,
            "diff" => Command::Diff(arg),
            "tools" => Command::Tools {
                json: arg.as_deref() == Some("json"),
            },
            "models" => Command::Models,
            "health" => Command::Health,
            "reset" => Command::Reset,
            "quit" | "exit" => Command::Quit,
            "help" => Command::Help,
            other => Command::Unknown(format!("unknown command /{other}")),
        })
    }
}

const HELP: &str = "Commands:
  /mode [chat|agent]  show or switch mode
  /plan <request>     ask for a plan without executing it
  /changes            summary of files changed this session
  /diff [path]        unified diff of one or all changed files
  /tools [json]       list available tools, or their JSON schemas
  /models             list known models per provider
  /health             check the provider
  /reset              clear history, changes and plan
  /quit               exit";

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let _ = dotenvy::dotenv();
    loclm_lib::init_tracing();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let mode = AgentMode::from_str(&cli.mode).map_err(AppError::Config)?;

    let mut agent = AgentLoop::new(config)?.with_mode(mode);
    let info = agent.model_info();
    println!(
        "loclm | {} {} | {} mode | workspace {}",
        info.provider,
        info.model,
        agent.mode(),
        agent.workspace().display()
    );
    println!("Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match Command::parse(line) {
            Some(Command::Quit) => break,
            Some(command) => run_command(&mut agent, command).await,
            None => {
                let response = agent.process(line).await;
                print_response(&response);
            }
        }
    }

    Ok(())
}

fn build_config(cli: &Cli) -> Result<AgentConfig, AppError> {
    let mut config = AgentConfig::from_env()?;
    if let Some(workspace) = &cli.workspace {
        config.workspace = workspace.clone();
    }
    if let Some(tools_dir) = &cli.tools_dir {
        config.tools_dir = Some(tools_dir.clone());
    }

    let (model_provider, model) = match &cli.model {
        Some(raw) => {
            let (provider, model) = parse_model_override(raw);
            (provider, Some(model))
        }
        None => (None, None),
    };
    let flag_provider = cli
        .provider
        .as_deref()
        .map(ProviderId::from_str)
        .transpose()
        .map_err(AppError::Config)?;

    if let Some(provider) = flag_provider.or(model_provider) {
        if provider != config.provider.provider {
            config.provider = ProviderConfig::from_env(provider);
        }
    }
    config.provider = config.provider.with_model(model);
    Ok(config)
}

async fn run_command(agent: &mut AgentLoop, command: Command) {
    match command {
        Command::Mode(None) => println!("mode: {}", agent.mode()),
        Command::Mode(Some(mode)) => {
            agent.set_mode(mode);
            println!("mode: {mode}");
        }
        Command::Plan(request) => match agent.plan(&request).await {
            Some(plan) => println!("{}", format_plan(&plan)),
            None => println!("No plan could be parsed from the model's reply."),
        },
        Command::Changes => {
            let summary = agent.change_summary();
            if summary.total_files == 0 {
                println!("No file changes.");
                return;
            }
            println!(
                "{} file(s): {} created, {} modified, {} deleted",
                summary.total_files, summary.created, summary.modified, summary.deleted
            );
            for file in summary.files {
                println!("  {} {}", file.operation, file.path);
            }
        }
        Command::Diff(path) => match agent.generate_diff(path.as_deref()) {
            Some(diff) => println!("{diff}"),
            None => println!("No changes."),
        },
        Command::Tools { json: false } => println!("{}", agent.tools().middleware().tool_help(None)),
        Command::Tools { json: true } => {
            match serde_json::to_string_pretty(&agent.tools().descriptors()) {
                Ok(catalog) => println!("{catalog}"),
                Err(err) => println!("Could not render tool catalog: {err}"),
            }
        }
        Command::Models => {
            let current = agent.model_info();
            for entry in ModelCatalog::all_models() {
                println!("{}:", entry.provider);
                for model in entry.models {
                    let marker = if model.name == current.model { "*" } else { " " };
                    println!(
                        " {marker} {} ({}k context) {}",
                        model.name,
                        model.context_window / 1000,
                        model.description
                    );
                }
            }
        }
        Command::Health => {
            let health = agent.check_provider_health().await;
            let status = if health.available { "available" } else { "unavailable" };
            println!("{}: {status}", health.provider);
        }
        Command::Reset => {
            agent.reset();
            println!("Session reset.");
        }
        Command::Help => println!("{HELP}"),
        Command::Unknown(message) => println!("{message}. Type /help for commands."),
        Command::Quit => {}
    }
}

fn print_response(response: &AgentResponse) {
    if let Some(plan) = &response.plan {
        println!("{}\n", format_plan(plan));
    }
    for call in &response.tool_calls {
        println!("[{}] {}", call.status, call.tool);
        for warning in &call.warnings {
            println!("  ! {warning}");
        }
    }
    println!("{}", response.response);
}
