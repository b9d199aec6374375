// SPDX-License-Identifier: Apache-2.0

use clap::{Parser, ValueEnum};
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::time::Duration;
use tokio::select;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::metadata::LevelFilter;
use tracing::{error, info, warn};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use rotel_multiline::init::args::MultilineArgs;
use rotel_multiline::poller::Poller;
use rotel_multiline::sink::{JsonLinesSink, RecordSink, record_channel};
use rotel_multiline::{Error, LogSource, Result};

const SHUTDOWN_TIMEOUT_MILLIS: u64 = 5_000;

#[derive(Debug, Parser)]
#[command(name = "rotel-multiline")]
#[command(bin_name = "rotel-multiline")]
#[command(version, about, long_about = None)]
struct Arguments {
    #[arg(value_enum, long, env = "ROTEL_LOG_FORMAT", default_value = "text")]
    /// Log format
    log_format: LogFormatArg,

    #[command(flatten)]
    multiline: MultilineArgs,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

fn main() -> ExitCode {
    let opt = Arguments::parse();

    let _guard = match setup_logging(&opt.log_format) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ERROR: failed to setup logging: {}", e);
            return ExitCode::from(1);
        }
    };

    if let Err(e) = opt.multiline.build_config().validate() {
        error!(error = %e, "Invalid multiline configuration.");
        return ExitCode::from(2);
    }

    match run(opt.multiline) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Failed to run multiline reader.");
            ExitCode::from(1)
        }
    }
}

#[tokio::main]
async fn run(args: MultilineArgs) -> Result<()> {
    let config = args.build_config();
    let source = LogSource::open(&args.path, &config, args.start_at.into())?;
    info!(
        path = %args.path.display(),
        pattern = %config.pattern,
        mode = ?config.mode,
        negate = config.negate,
        "Opened multiline source"
    );

    let (records_tx, records_rx) = record_channel(args.channel_size);
    let cancel_token = CancellationToken::new();
    let mut tasks: JoinSet<Result<()>> = JoinSet::new();

    let poller = Poller::new(source, records_tx, args.poll_interval());
    let token = cancel_token.clone();
    tasks.spawn(async move {
        // Dropping the returned sink closes the channel and stops the writer
        let (_source, _sink, stats) = poller.run(token).await?;
        info!(
            cycles = stats.cycles,
            lines = stats.lines_read,
            records = stats.records_flushed,
            "Poller finished"
        );
        Ok(())
    });

    tasks.spawn_blocking(move || {
        let mut out = JsonLinesSink::new(io::stdout().lock());
        while let Some(record) = records_rx.recv_blocking() {
            out.deliver(record)?;
        }
        Ok(())
    });

    let mut sig_term = signal(SignalKind::terminate())?;
    let mut sig_int = signal(SignalKind::interrupt())?;

    select! {
        _ = sig_term.recv() => info!("Shutdown signal received."),
        _ = sig_int.recv() => info!("Shutdown signal received."),
        res = tasks.join_next() => {
            match res {
                Some(Ok(Ok(()))) => warn!("Unexpected early exit of task."),
                Some(Ok(Err(e))) => {
                    cancel_token.cancel();
                    return Err(e);
                }
                Some(Err(e)) => {
                    cancel_token.cancel();
                    return Err(Error::TaskJoin(e.to_string()));
                }
                None => {}
            }
        }
    }
    cancel_token.cancel();

    wait_for_tasks(
        &mut tasks,
        Instant::now() + Duration::from_millis(SHUTDOWN_TIMEOUT_MILLIS),
    )
    .await
}

async fn wait_for_tasks(tasks: &mut JoinSet<Result<()>>, stop_at: Instant) -> Result<()> {
    let mut result = Ok(());
    loop {
        match timeout_at(stop_at, tasks.join_next()).await {
            Err(_) => {
                result = Err(Error::TaskJoin(
                    "timed out waiting for tasks to complete".to_string(),
                ));
                break;
            }
            Ok(None) => break,
            Ok(Some(Ok(Ok(())))) => {}
            Ok(Some(Ok(Err(e)))) => result = Err(e),
            Ok(Some(Err(e))) => error!("Failed to join with task: {:?}", e),
        }
    }
    result
}

type LoggerGuard = tracing_appender::non_blocking::WorkerGuard;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn setup_logging(log_format: &LogFormatArg) -> std::result::Result<LoggerGuard, BoxError> {
    LogTracer::init()?;

    // Records go to stdout, so logs go to stderr
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(io::stderr());

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;

    if *log_format == LogFormatArg::Json {
        let app_name = format!("{}-{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        let bunyan_formatting_layer = BunyanFormattingLayer::new(app_name, non_blocking_writer);

        let subscriber = Registry::default()
            .with(filter)
            .with(JsonStorageLayer)
            .with(bunyan_formatting_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        // Skip color codes when not in a terminal
        let use_ansi = io::stderr().is_terminal();

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_target(false)
            .with_level(true)
            .with_ansi(use_ansi)
            .compact();

        let subscriber = Registry::default().with(filter).with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(guard)
}
