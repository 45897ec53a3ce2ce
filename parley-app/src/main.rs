//! `parley` command-line chat with demo tools.

mod config;
mod tools;

use clap::{Parser, Subcommand};
use config::ParleyConfig;
use parley_agent::{Agent, CancellationToken, DebugObserver};
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Debug, Parser)]
#[command(name = "parley", version, about = "Chat with any LLM backend, with tool calling")]
struct Cli {
    /// Config file (default: ~/.parley/config.toml).
    #[arg(long, env = "PARLEY_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Model id; overrides the config file and PARLEY_MODEL.
    #[arg(long, global = true)]
    model: Option<String>,

    /// Log every provider request and response as pretty JSON.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive chat over stdin (default).
    Chat,
    /// Send one message and print the reply.
    Ask {
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing()?;
    install_panic_hook();

    let cli = Cli::parse();

    let mut cfg = ParleyConfig::load(cli.config.clone()).await?;
    if let Some(model) = cli.model.clone() {
        cfg.general.model = model;
    }
    cfg.validate()?;
    let mut agent = build_agent(&cfg, cli.debug)?;

    match cli.command.unwrap_or(Command::Chat) {
        Command::Ask { message } => {
            let reply = agent.run(&message.join(" ")).await?;
            println!("{reply}");
            Ok(())
        }
        Command::Chat => chat_loop(&mut agent).await,
    }
}

fn build_agent(cfg: &ParleyConfig, debug: bool) -> anyhow::Result<Agent> {
    let provider_kind = cfg.provider()?;
    let api_key = cfg.api_key().unwrap_or_default();
    let provider = parley_llm::build_provider(
        provider_kind,
        &api_key,
        &cfg.general.model,
        cfg.general.base_url.as_deref(),
        cfg.timeout(),
    );
    tracing::info!(
        provider = %provider_kind,
        model = %cfg.general.model,
        base_url = ?cfg.general.base_url,
        "provider configured"
    );

    let mut builder = Agent::builder(provider)
        .config(cfg.agent.clone())
        .tools(tools::demo_registry()?);
    if debug {
        builder = builder.observer(Arc::new(DebugObserver));
    }
    Ok(builder.build())
}

async fn chat_loop(agent: &mut Agent) -> anyhow::Result<()> {
    println!(
        "parley chat with {} ({} tools). /reset clears history, /usage shows tokens, /quit exits.",
        agent.model_name(),
        agent.tools().len()
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                agent.reset();
                println!("history cleared");
                continue;
            }
            "/usage" => {
                let u = agent.usage_totals();
                println!(
                    "prompt={} completion={} total={}",
                    u.prompt_tokens, u.completion_tokens, u.total_tokens
                );
                continue;
            }
            _ => {}
        }

        // Ctrl-C abandons the current turn but keeps the session.
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                trigger.cancel();
            }
        });
        let result = agent.run_with_cancel(&cancel, line).await;
        ctrl_c.abort();

        match result {
            Ok(reply) => println!("{reply}"),
            Err(e) => {
                tracing::warn!(error = %e, "chat turn failed");
                eprintln!("error: {e}");
            }
        }
    }
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(v) => v,
        Err(_) => EnvFilter::new(
            "warn,parley_app=info,parley_agent=info,parley_llm=info,parley_tools=info",
        ),
    };
    let log_format = std::env::var("PARLEY_LOG_FORMAT")
        .unwrap_or_else(|_| "compact".to_string())
        .to_ascii_lowercase();

    // Logs go to stderr so replies on stdout stay clean.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(true)
                .init();
        }
        "pretty" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .pretty()
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact()
                .init();
        }
        other => {
            return Err(anyhow::anyhow!(
                "unsupported PARLEY_LOG_FORMAT={other:?}; expected one of: json, pretty, compact"
            ));
        }
    }

    tracing::debug!(
        log_format = %log_format,
        env_filter = ?std::env::var("RUST_LOG").ok(),
        "tracing initialized"
    );
    Ok(())
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload(panic_info.payload());
        tracing::error!(
            panic_location = %location,
            panic_payload = %payload,
            "panic captured"
        );
        default_hook(panic_info);
    }));
}

fn panic_payload(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        return msg.to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}
