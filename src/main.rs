use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context;
use tracing::{error, info};

use syncbench::logging::init_tracing;
use syncbench::{BenchConfig, BenchContext, report, run_row, warm_up};

fn main() -> ExitCode {
    init_tracing();

    // the title goes out even when the arguments are rejected
    if let Err(e) = report::write_title(&mut io::stdout().lock()) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    let config = match BenchConfig::from_env(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("benchmark aborted: {e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &BenchConfig) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    report::write_banner(&mut out, config)?;
    info!(?config, "starting benchmark");

    // one context for the whole run, reset after every trial
    let ctx = BenchContext::new();

    write!(out, "Warming up caches and branch predictors:  ")?;
    out.flush()?;
    warm_up(&ctx, config, |round| {
        // progress is cosmetic, a failed write must not stop the run
        let _ = write!(out, "\u{8}{round}");
        let _ = out.flush();
    })
    .context("warm-up failed")?;
    write!(out, "\u{8}completed\n\n")?;

    write!(out, "All values are in MILLISECONDS\n\n")?;
    let primitives = config.mode.primitives();
    report::write_header(&mut out, primitives)?;

    for threads in config.mode.thread_counts() {
        let row = run_row(&ctx, primitives, threads, config.test_count)
            .with_context(|| format!("trial with {threads} threads failed"))?;
        report::write_row(&mut out, &row)?;
        out.flush()?;
    }

    write!(out, "\nTest complete\n")?;
    info!("benchmark finished");
    Ok(())
}
