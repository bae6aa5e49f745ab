use std::io;

use anyhow::{anyhow, Context};
use clap::Parser;
use log::{info, LevelFilter};

use otiowx::StationDecoderBuilder;

mod app;
mod cli;
mod spawner;
mod store;

use cli::{Args, CliError};
use store::FileRainStore;

fn main() {
    if let Err(err) = otiodec() {
        err.exit();
    }
}

fn otiodec() -> Result<(), CliError> {
    let args = Args::try_parse()?;
    log_setup(&args);

    let rx = StationDecoderBuilder::new().build();
    let mut rain_store = FileRainStore::new(&args.rain_state);
    info!("rain counter kept in \"{}\"", rain_store.path().display());

    if args.file.is_none() {
        app::run(&args, &rx, &mut rain_store);
        return Ok(());
    }

    let stdin = io::stdin();
    let stdin_handle = stdin.lock();
    let inbuf = file_setup(&args, stdin_handle)?;
    let lines = spawner::read_lines(inbuf).context("unable to read receiver output")?;

    app::run_input(&args, &rx, &mut rain_store, &lines);
    Ok(())
}

// -v picks the level for our own crates; RUST_LOG overrides it
fn log_setup(args: &Args) {
    if args.quiet {
        return;
    }

    if std::env::var_os("RUST_LOG").is_some() {
        pretty_env_logger::init();
        return;
    }

    let level = verbosity(args.verbose);
    pretty_env_logger::formatted_builder()
        .filter_module("otiowx", level)
        .filter_module("otiodec", level)
        .init();
}

fn verbosity(count: u8) -> LevelFilter {
    match count {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

// open the captured receiver output named by --file
fn file_setup<'stdin>(
    args: &Args,
    stdin: io::StdinLock<'stdin>,
) -> Result<Box<dyn io::BufRead + 'stdin>, anyhow::Error> {
    if args.input_is_stdin() {
        if is_terminal(&io::stdin()) {
            return Err(anyhow!(
                "--file - expects captured receiver output on standard input.

Try: rtl_433 -f 868304625 -q -A -T 50 2>&1 | otiodec --file -
or leave out --file and otiodec will run the receiver for you."
            ));
        }

        info!("decoding receiver output from standard input");
        return Ok(Box::new(io::BufReader::new(stdin)));
    }

    let path = args.file.as_deref().unwrap_or_default();
    info!("decoding receiver output from \"{}\"", path);
    let file = std::fs::File::open(path)
        .with_context(|| format!("unable to open receiver output --file \"{}\"", path))?;
    Ok(Box::new(io::BufReader::new(file)))
}

#[cfg(not(target_os = "windows"))]
fn is_terminal<S: std::os::fd::AsRawFd>(stream: &S) -> bool {
    terminal_size::terminal_size_using_fd(stream.as_raw_fd()).is_some()
}

#[cfg(target_os = "windows")]
fn is_terminal<S: std::os::windows::io::AsRawHandle>(stream: &S) -> bool {
    terminal_size::terminal_size_using_handle(stream.as_raw_handle()).is_some()
}
