use std::process::ExitCode;
use std::sync::Arc;

use tokio::time::{Duration, sleep};
use tracing::info;
use tracing_subscriber::EnvFilter;

use hashloom_core::app::AppBuilder;
use hashloom_core::domain::RunState;
use hashloom_core::impls::FileSink;
use hashloom_core::ports::SystemClock;

fn parse_args() -> Option<(i64, i64, String)> {
    let mut args = std::env::args().skip(1);
    let start = args.next()?.parse().ok()?;
    let end = args.next()?.parse().ok()?;
    let out_dir = args.next().unwrap_or_else(|| "out".to_string());
    Some((start, end, out_dir))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some((start, end, out_dir)) = parse_args() else {
        eprintln!("usage: hashloom-cli <start> <end> [out_dir]");
        return ExitCode::from(2);
    };

    // (A) FileSink と Gateway を用意
    let gateway = match AppBuilder::new()
        .sink(Arc::new(FileSink::new(&out_dir, Arc::new(SystemClock))))
        .max_in_flight(16)
        .build()
    {
        Ok(gateway) => gateway,
        Err(error) => {
            eprintln!("failed to build app: {error}");
            return ExitCode::FAILURE;
        }
    };

    // (B) リクエスト投入（ack として run id が返る）
    let run_id = match gateway.submit(start, end).await {
        Ok(run_id) => run_id,
        Err(error) => {
            eprintln!("submit failed: {error}");
            return ExitCode::FAILURE;
        }
    };
    info!(%run_id, start, end, "submitted");

    // (C) 完了をポーリングで待つ（Done / Failed / Cancelled のいずれか）
    loop {
        let Some(status) = gateway.status(run_id).await else {
            eprintln!("run disappeared from the store");
            return ExitCode::FAILURE;
        };
        if status.state.is_terminal() {
            println!(
                "final status: state={:?} units={}/{} last_error={:?}",
                status.state, status.completed_units, status.total_units, status.last_error
            );
            return if status.state == RunState::Done {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
        }
        sleep(Duration::from_millis(50)).await;
    }
}
