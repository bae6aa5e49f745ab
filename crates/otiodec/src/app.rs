//! Polling loop
//!
//! Each cycle
//!
//! 1. obtains receiver output, either by running the receiver
//!    or from an input file;
//!
//! 2. decodes it, loading the rain counter before and saving
//!    it after; and
//!
//! 3. hands any reading to standard output and to the child
//!    process, if one was given.
//!
//! A cycle always runs to completion before the next one
//! begins. Cycles which fail to produce a reading are logged
//! and otherwise ignored.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::process::Child;
use std::time::Duration;

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use log::{debug, error, info, warn};
use otiowx::{unix_now, DecodeOutcome, RainStore, RawFrame, Reading, StationDecoder};

use crate::cli::Args;
use crate::spawner::{self, Receiver};

/// Configuration
#[derive(Clone, Debug)]
pub struct Config<'args> {
    child_args: Vec<&'args str>,
    frame_log: Option<&'args Path>,
    interval: Duration,
    quiet: bool,
}

impl<'args> From<&'args Args> for Config<'args> {
    fn from(args: &'args Args) -> Self {
        Self {
            child_args: args.child.iter().map(String::as_str).collect(),
            frame_log: args.frame_log.as_deref(),
            interval: Duration::from_secs(args.interval),
            quiet: args.quiet,
        }
    }
}

/// Run the receiver in a loop
///
/// Runs forever, unless `once` is set.
pub fn run<R>(args: &Args, decoder: &StationDecoder, store: &mut R)
where
    R: RainStore,
{
    let cfg = Config::from(args);
    let receiver = Receiver {
        program: args.receiver.clone(),
        sudo: args.sudo,
        frequency: args.frequency,
        listen_time: args.listen_time,
    };

    info!(
        "listening on {} Hz, {} s per cycle",
        receiver.frequency, receiver.listen_time
    );

    loop {
        match receiver.run() {
            Ok(lines) => {
                cycle(&cfg, decoder, store, &lines);
            }
            Err(err) => {
                error!("unable to run receiver \"{}\": {}", receiver.program, err);
            }
        }

        if args.single_cycle() {
            break;
        }

        if !cfg.interval.is_zero() {
            std::thread::sleep(cfg.interval);
        }
    }
}

/// Decode receiver output that was captured elsewhere
pub fn run_input<R>(args: &Args, decoder: &StationDecoder, store: &mut R, lines: &[String])
where
    R: RainStore,
{
    let cfg = Config::from(args);
    cycle(&cfg, decoder, store, lines);
}

/// Run one decoding cycle over `lines`
///
/// Returns the outcome after it has been reported.
pub fn cycle<R>(
    cfg: &Config<'_>,
    decoder: &StationDecoder,
    store: &mut R,
    lines: &[String],
) -> DecodeOutcome
where
    R: RainStore,
{
    let out = decoder.decode_with_store(lines, store, unix_now());

    if let (Some(path), Some(frame)) = (cfg.frame_log, measured_frame(&out)) {
        if let Err(err) = append_frame_log(path, frame) {
            warn!("{:#}", err);
        }
    }

    match &out {
        DecodeOutcome::Reading {
            reading,
            rain_count,
            ..
        } => report(cfg, reading, *rain_count),
        DecodeOutcome::NoData => error!("no data received"),
        DecodeOutcome::SignalError => error!("receiver communication error"),
        DecodeOutcome::NotFound => {
            info!("no valid data received");
            dump_lines(decoder, lines);
        }
        DecodeOutcome::ImplausibleData(_) => error!("{}", out),
        DecodeOutcome::MalformedFrame { .. } => {
            error!("{}", out);
            dump_lines(decoder, lines);
        }
    }

    out
}

// print and hand off an accepted reading
fn report(cfg: &Config<'_>, reading: &Reading, rain_count: u8) {
    let json = match serde_json::to_string(reading) {
        Ok(json) => json,
        Err(err) => {
            error!("unable to serialize reading: {}", err);
            return;
        }
    };

    info!("reading: {}", reading);
    if !cfg.quiet {
        println!("{}", json);
    }

    if cfg.child_args.is_empty() {
        debug!("no child process to spawn");
        return;
    }

    let mut child = match spawner::spawn(
        cfg.child_args[0],
        &cfg.child_args[1..],
        reading,
        rain_count,
    ) {
        Ok(child) => child,
        Err(err) => {
            error!("unable to spawn child process: {}", err);
            return;
        }
    };

    debug!("spawned child process PID {}", child.id());
    run_child(&mut child, &json);

    // run_child() closes the child's stdin
    // wait for the child to exit
    match child.wait() {
        Ok(exit) => {
            if exit.success() {
                debug!("child process exited successfully");
            } else {
                warn!(
                    "child process exited abnormally with status {}",
                    exit.code().unwrap_or(1)
                );
            }
        }
        Err(err) => {
            error!("unable to await child process exit: {}", err);
        }
    }
}

// write the reading to the child's stdin, then close it
fn run_child(child: &mut Child, json: &str) {
    let mut child_pipe = if let Some(pipe) = child.stdin.take() {
        pipe
    } else {
        error!("unable to create pipe to child process");
        return;
    };

    if let Err(err) = writeln!(child_pipe, "{}", json) {
        if err.kind() != io::ErrorKind::BrokenPipe {
            warn!("unable to write reading to child process: {}", err);
        }
    }
}

// log the receiver output when it held no usable frame
fn dump_lines(decoder: &StationDecoder, lines: &[String]) {
    for line in lines {
        if line.contains(decoder.extractor().channel_marker()) {
            debug!("{}", line);
        } else {
            debug!("no valid data received: \"{}\"", line);
        }
    }
}

// frame whose values were measured, plausible or not
fn measured_frame(out: &DecodeOutcome) -> Option<&RawFrame> {
    match out {
        DecodeOutcome::Reading { frame, .. } => Some(frame),
        DecodeOutcome::ImplausibleData(imp) => Some(&imp.frame),
        _ => None,
    }
}

// append one frame, with the current time, to the frame log
fn append_frame_log(path: &Path, frame: &RawFrame) -> Result<(), anyhow::Error> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("unable to open --frame-log \"{}\"", path.display()))?;

    writeln!(
        file,
        "{} {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        frame
    )
    .with_context(|| format!("unable to write --frame-log \"{}\"", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use clap::Parser;
    use otiowx::{MemoryRainStore, StationDecoderBuilder};

    fn scratch(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("otiodec-app-{}-{}", std::process::id(), name));
        let _ = std::fs::remove_file(&path);
        path
    }

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_cycle() {
        let args = Args::try_parse_from(["otiodec", "-q", "--once"]).unwrap();
        let cfg = Config::from(&args);
        let rx = StationDecoderBuilder::new().build();
        let mut store = MemoryRainStore::new(Some(0x1d));

        let input = lines(&[
            "Tuned to 868.305MHz.",
            "[00] {79} 8a 50 6d 43 78 05 0a 00 1e 00",
        ]);
        let out = cycle(&cfg, &rx, &mut store, &input);
        let rd = out.reading().expect("no reading");
        assert_eq!(rd.temperature, 27.4);
        assert_eq!(rd.rain_mm, 0.3);
        assert_eq!(store.get(), Some(0x1e));

        let input = lines(&["Time expired, exiting!"]);
        assert_eq!(cycle(&cfg, &rx, &mut store, &input), DecodeOutcome::NoData);
        assert_eq!(store.get(), Some(0x1e));
    }

    #[test]
    fn test_frame_log() {
        let path = scratch("frames");
        let path_str = path.to_string_lossy().into_owned();
        let args =
            Args::try_parse_from(["otiodec", "-q", "--frame-log", path_str.as_str()]).unwrap();
        let cfg = Config::from(&args);
        let rx = StationDecoderBuilder::new().build();
        let mut store = MemoryRainStore::default();

        // measured frames are logged, plausible or not
        let input = lines(&["[00] {79} 8a 50 65 43 78 05 0a 00 1e 00"]);
        assert!(cycle(&cfg, &rx, &mut store, &input).is_reading());
        let input = lines(&["[00] {79} 8a 50 67 e4 78 05 0a 00 1e 00"]);
        assert!(matches!(
            cycle(&cfg, &rx, &mut store, &input),
            DecodeOutcome::ImplausibleData(_)
        ));

        // frames which cannot be measured are not
        let input = lines(&["[00] {79} 8a 50 65"]);
        assert!(matches!(
            cycle(&cfg, &rx, &mut store, &input),
            DecodeOutcome::MalformedFrame { .. }
        ));
        let input = lines(&["Time expired, exiting!"]);
        cycle(&cfg, &rx, &mut store, &input);

        let log = std::fs::read_to_string(&path).unwrap();
        let logged: Vec<&str> = log.lines().collect();
        assert_eq!(logged.len(), 2);
        assert!(logged[0].ends_with(" [00] {79} 8a 50 65 43 78 05 0a 00 1e 00"));
        assert!(logged[1].ends_with(" [00] {79} 8a 50 67 e4 78 05 0a 00 1e 00"));
        let _ = std::fs::remove_file(&path);
    }
}
