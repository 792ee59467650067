//! # raw2dng
//!
//! Converts camera RAW files into DNG, one external converter call per file,
//! writing the results into a single output folder.

mod cli;
mod error;
mod logging;

use crate::cli::Cli;
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use raw2dng_batch::{BatchState, LocalResource, Orchestrator, ResourceHandle, Selection};
use raw2dng_config::Config;
use raw2dng_convert::{CommandConverter, ConverterHandle};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const EXIT_SETUP: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let (orchestrator, selection, output) = match setup(&cli) {
        Ok(prepared) => prepared,
        Err(e) => {
            tracing::debug!(error = ?e, "Setup failed");
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_SETUP);
        },
    };

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted: finishing in-flight conversions");
                cancel.cancel();
            }
        }
    });

    let mut handle = Arc::new(orchestrator).spawn(selection, output, cancel);
    while handle.state.changed().await.is_ok() {
        let state = handle.state.borrow_and_update().clone();
        print_progress(&state);
    }
    match handle.completion.await {
        Ok(completion) => {
            println!("{}", completion.summary);
            match completion.success {
                true => ExitCode::SUCCESS,
                false => ExitCode::FAILURE,
            }
        },
        Err(_) => {
            tracing::error!("Batch ended without reporting completion");
            ExitCode::FAILURE
        },
    }
}

/// Resolve configuration into everything a batch needs.
fn setup(cli: &Cli) -> Result<(Orchestrator, Selection, ResourceHandle)> {
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    cli.apply(&mut config);

    let Some(output) = config.output.clone() else {
        exn::bail!(ErrorKind::NoOutput);
    };
    std::fs::create_dir_all(&output).or_raise(|| ErrorKind::Output(output.clone()))?;

    let program = match &config.converter.program {
        Some(program) => program.clone(),
        None => CommandConverter::discover().or_raise(|| ErrorKind::Converter)?.program().to_path_buf(),
    };
    let converter = CommandConverter::new(&program, config.converter.args.iter().cloned())
        .or_raise(|| ErrorKind::Converter)?;
    tracing::info!(converter = %program.display(), output = %output.display(), jobs = config.jobs, "Ready");
    let converter: ConverterHandle = Arc::new(converter);

    let orchestrator = Orchestrator::new(converter, cli::options(&config));
    Ok((orchestrator, cli.selection(), LocalResource::directory(output).into_handle()))
}

fn print_progress(state: &BatchState) {
    // Once the batch has stopped, the summary says it all.
    if !state.running {
        return;
    }
    match &state.current_item {
        Some(item) => println!("[{}/{}] {} ({item})", state.completed, state.total, state.status),
        None => println!("[{}/{}] {}", state.completed, state.total, state.status),
    }
}
