//! Tasklog CLI - Main entry point

mod cli;
mod output;

use clap::Parser;
use cli::{Args, Command, FetchArgs, FollowArgs};
use futures::StreamExt;
use output::{OutputFormat, Printer};
use std::process::ExitCode;
use tasklog_client::{LogStreamClient, StreamPhase, StreamRequest};
use tasklog_foundation::{ConfigLoader, Ordinal, StreamConfig};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Ctrl-C 종료 코드
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let config = load_config(&args)?;
    let client = LogStreamClient::from_config(config)?;
    let format = if args.json {
        OutputFormat::JsonLines
    } else {
        OutputFormat::Plain
    };

    match args.command {
        Command::Follow(follow) => follow_task(&client, follow, format).await,
        Command::Fetch(fetch) => fetch_once(&client, fetch, format).await,
    }
}

/// 설정 파일 + 환경변수 + CLI 플래그 순으로 병합
fn load_config(args: &Args) -> anyhow::Result<StreamConfig> {
    let working_dir = std::env::current_dir()?;
    let mut config = ConfigLoader::new(&working_dir).load()?;

    if let Some(mode) = args.transport {
        config.transport = mode;
    }
    if let Some(base_url) = &args.base_url {
        config.base_url = Some(base_url.clone());
    }
    config.validate()?;

    debug!("Effective config: {:?}", config);
    Ok(config)
}

async fn follow_task(
    client: &LogStreamClient,
    args: FollowArgs,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let request = StreamRequest::new(args.task_id)
        .resume_from(args.after.map(Ordinal::new))
        .recoverable(args.recoverable);

    let mut printer = Printer::stdout(format);
    let mut logs = client.subscribe(request);

    let code = loop {
        tokio::select! {
            item = logs.next() => match item {
                Some(Ok(event)) => printer.print(&event)?,
                Some(Err(e)) => {
                    eprintln!("error: {}", e);
                    break ExitCode::FAILURE;
                }
                None => {
                    break match logs.phase() {
                        StreamPhase::Completed => ExitCode::SUCCESS,
                        StreamPhase::Cancelled => ExitCode::from(EXIT_INTERRUPTED),
                        _ => ExitCode::FAILURE,
                    };
                }
            },
            _ = tokio::signal::ctrl_c() => {
                logs.cancel();
                break ExitCode::from(EXIT_INTERRUPTED);
            }
        }
    };

    if code != ExitCode::SUCCESS {
        if let Some(last) = logs.last_ordinal() {
            info!("Resume with: tasklog follow {} --after {}", logs.task_id(), last);
        }
    }

    Ok(code)
}

async fn fetch_once(
    client: &LogStreamClient,
    args: FetchArgs,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let events = client
        .fetch_events(&args.task_id.into(), args.after.map(Ordinal::new))
        .await?;

    let mut printer = Printer::stdout(format);
    for event in &events {
        printer.print(event)?;
    }

    Ok(ExitCode::SUCCESS)
}
