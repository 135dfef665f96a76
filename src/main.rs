//! Demonstration binary for `panictrace`.
//!
//! Panics a few calls deep under the supervisor picked on the command line.

mod cli;

use std::{error::Error, hint::black_box};

use clap::Parser;
use cli::{Cli, Mode};
use panictrace::{ColorChoice, Config, Reporter};

#[inline(never)]
fn descend(depth: usize, message: &str) {
    if depth == 0 {
        panic!("{message}");
    }
    descend(depth - 1, message);
    black_box(depth);
}

fn main() -> Result<(), Box<dyn Error>> {
    // Enable structured logging for demonstrations and integration tests.
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let reporter = Reporter::global();
    if let Some(color) = cli.color.as_deref() {
        let choice: ColorChoice = color.parse()?;
        reporter.set_color(Config::from_env().color(choice).stderr_color());
    }
    if cli.disable {
        panictrace::disable();
    }

    let Cli {
        depth,
        message,
        mode,
        no_exit,
        ..
    } = cli;
    match mode {
        Mode::Handle => {
            if panictrace::handle(!no_exit, None, None, || descend(depth, &message)).is_none() {
                println!("recovered");
            }
        }
        Mode::Go => {
            let task = panictrace::go(move || descend(depth, &message), None, None);
            if task.join().is_err() {
                return Err("supervised thread failed".into());
            }
        }
        Mode::Async => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(async move {
                panictrace::go_async(async move { descend(depth, &message) }, None, None).await
            })?;
        }
    }
    Ok(())
}
