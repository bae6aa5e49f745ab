use std::fmt::Display;
use std::path::PathBuf;

use clap::{error::ErrorKind, value_parser, CommandFactory, Parser};

/// Standard input filename
const STDIN_FILE: &str = "-";

const USAGE_SHORT: &str = r#"
This program runs rtl_433 in pulse analyzer mode, waits for a transmission from an OTIO WH5100 weather station, and prints each reading as JSON.

See --help for more details.
"#;

const USAGE_LONG: &str = r#"
This program runs rtl_433 in pulse analyzer mode, waits for a transmission from an OTIO WH5100 weather station, and prints each reading as JSON.

    otiodec --once

    {"date":1616883240.5,"temp":27.4,"hum":60,"wind":3.0,"gust":6.1,"rain":0.3}

By default, otiodec polls forever. Each cycle runs the receiver for --listen-time seconds and decodes the first frame it prints.

The rain gauge reports a running counter. The last counter value is kept in the --rain-state file so that rainfall can be computed across cycles and restarts.

You can also decode receiver output that you have captured yourself

    rtl_433 -f 868304625 -q -A -T 50 2>&1 \
        | otiodec --file -

Arguments which follow "--" will be used to spawn a child process for every reading. The child receives the JSON reading on its standard input. You can use this to upload readings

    otiodec -- curl -s -X POST \
        -H 'Content-Type: application/json; charset=utf-8' \
        --data-binary @- http://127.0.0.1:8088/api/meteo

The child process also receives the following environment variables:

  OTIODEC_DATE="1616883240.5" (UTC UNIX timestamp)
  OTIODEC_TEMP="27.4" (°C)
  OTIODEC_HUM="60" (%)
  OTIODEC_WIND="3.0"
  OTIODEC_GUST="6.1"
  OTIODEC_RAIN="0.3" (mm since the last reading)
  OTIODEC_RAIN_COUNT="30" (raw rain gauge counter)

Child processes MUST read or close standard input.
"#;

const RECEIVER: &str = "Receiver Options";

/// Top-level program arguments
#[derive(Parser, Clone, Debug)]
#[command(version)]
#[command(about, long_about = None)]
#[command(after_help = USAGE_SHORT, after_long_help = USAGE_LONG)]
#[command(max_term_width = 100)]
pub struct Args {
    /// Verbosity level (-vvv for more)
    #[arg(short, long, default_value_t = 0, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print NOTHING, not even readings
    #[arg(short, long)]
    pub quiet: bool,

    /// Decode once and exit
    #[arg(long)]
    pub once: bool,

    /// Seconds to wait between cycles
    #[arg(long, default_value_t = 0)]
    pub interval: u64,

    /// Rain counter state file
    ///
    /// Holds the last rain gauge counter. Created on the first
    /// reading.
    #[arg(long, default_value = "/tmp/old_rain")]
    pub rain_state: PathBuf,

    /// Append every decoded frame to this file
    #[arg(long)]
    pub frame_log: Option<PathBuf>,

    /// Read receiver output from a file (or "-" for stdin)
    ///
    /// The receiver is not started. The input is decoded once.
    #[arg(long)]
    pub file: Option<String>,

    /// Receiver frequency (Hz)
    #[arg(short, long, default_value_t = 868304625)]
    #[arg(help_heading = RECEIVER)]
    pub frequency: u32,

    /// Receiver listening time per cycle (s)
    #[arg(short = 'T', long, default_value_t = 50)]
    #[arg(value_parser = value_parser!(u32).range(1..))]
    #[arg(help_heading = RECEIVER)]
    pub listen_time: u32,

    /// Receiver program
    #[arg(long, default_value = "rtl_433")]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = RECEIVER)]
    pub receiver: String,

    /// Run the receiver with sudo
    #[arg(long)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = RECEIVER)]
    pub sudo: bool,

    /// Spawn child process to handle each reading. Optional.
    ///
    /// Arguments are provided VERBATIM to the child process
    /// without shell interpretation.
    #[arg(last = true)]
    pub child: Vec<String>,
}

impl Args {
    /// Return true if the user requests input from stdin
    pub fn input_is_stdin(&self) -> bool {
        self.file.as_deref() == Some(STDIN_FILE)
    }

    /// Return true if a single cycle was requested
    pub fn single_cycle(&self) -> bool {
        self.once || self.file.is_some()
    }
}

/// Fatal error, with the exit status to leave with
#[derive(Debug)]
pub struct CliError {
    error: anyhow::Error,
    exit_code: i32,
}

impl CliError {
    /// Wrap `error`, exiting with `exit_code`
    pub fn new(error: anyhow::Error, exit_code: i32) -> CliError {
        CliError { error, exit_code }
    }

    /// Exit status
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Report the error and exit
    ///
    /// Usage errors and `--help` output come from clap as-is;
    /// everything else is styled like a clap error.
    pub fn exit(&self) -> ! {
        let printed = match self.error.downcast_ref::<clap::Error>() {
            Some(usage) => usage.print(),
            None => Args::command()
                .error(ErrorKind::Format, self.to_string())
                .print(),
        };
        drop(printed);
        std::process::exit(self.exit_code());
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // alternate form includes the context chain
        write!(f, "{:#}", self.error)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> CliError {
        CliError::new(err, 1)
    }
}

impl From<clap::Error> for CliError {
    fn from(err: clap::Error) -> CliError {
        // --help and --version are not failures
        let exit_code = if err.use_stderr() { 2 } else { 0 };
        CliError::new(err.into(), exit_code)
    }
}
