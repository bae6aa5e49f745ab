//! Child processes: the receiver and the reading handler

use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader};
use std::process::{Child, Command, Stdio};

use log::debug;
use otiowx::Reading;

/// How to run the receiver
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receiver {
    /// Receiver executable
    pub program: String,

    /// Run the receiver via `sudo`
    pub sudo: bool,

    /// Frequency (Hz)
    pub frequency: u32,

    /// Listening time (s)
    pub listen_time: u32,
}

impl Receiver {
    /// Build the receiver command line
    ///
    /// Pulse analyzer mode (`-A`) prints every demodulated row
    /// to standard error. `-T` makes the receiver give up after
    /// the listening time.
    pub fn command(&self) -> Command {
        let receiver_args = [
            "-f".to_owned(),
            self.frequency.to_string(),
            "-q".to_owned(),
            "-A".to_owned(),
            "-T".to_owned(),
            self.listen_time.to_string(),
        ];

        let mut cmd = if self.sudo {
            let mut cmd = Command::new("sudo");
            cmd.arg(&self.program);
            cmd
        } else {
            Command::new(&self.program)
        };

        cmd.args(receiver_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }

    /// Run the receiver to completion
    ///
    /// Returns every line the receiver wrote to standard error.
    /// Lines which are not valid UTF-8 are converted lossily.
    pub fn run(&self) -> io::Result<Vec<String>> {
        let mut child = self.command().spawn()?;
        let lines = match child.stderr.take() {
            Some(stderr) => read_lines(BufReader::new(stderr))?,
            None => Vec::new(),
        };

        let status = child.wait()?;
        if !status.success() {
            debug!("receiver exited with status {}", status.code().unwrap_or(1));
        }

        Ok(lines)
    }
}

/// Read all lines from `input`
pub fn read_lines<R: BufRead>(mut input: R) -> io::Result<Vec<String>> {
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    while input.read_until(b'\n', &mut buf)? > 0 {
        let line = String::from_utf8_lossy(&buf);
        lines.push(line.trim_end_matches(['\r', '\n']).to_owned());
        buf.clear();
    }

    Ok(lines)
}

/// Spawn a child process to handle the given reading
///
/// The child process will receive the reading via the
/// environment. Higher-level logic should write the JSON
/// reading to the child's stdin.
pub fn spawn<C, A, B>(cmd: C, args: A, reading: &Reading, rain_count: u8) -> io::Result<Child>
where
    C: AsRef<OsStr>,
    B: AsRef<OsStr>,
    A: IntoIterator<Item = B>,
{
    Command::new(cmd)
        .stdin(Stdio::piped())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .args(args)
        .env(childenv::OTIODEC_DATE, reading.timestamp.to_string())
        .env(childenv::OTIODEC_TEMP, format!("{:.1}", reading.temperature))
        .env(childenv::OTIODEC_HUM, reading.humidity.to_string())
        .env(childenv::OTIODEC_WIND, format!("{:.1}", reading.wind_median))
        .env(childenv::OTIODEC_GUST, format!("{:.1}", reading.wind_gust))
        .env(childenv::OTIODEC_RAIN, format!("{:.1}", reading.rain_mm))
        .env(childenv::OTIODEC_RAIN_COUNT, rain_count.to_string())
        .spawn()
}

mod childenv {
    /// Reading time (UTC UNIX timestamp, in seconds)
    ///
    /// May have a fractional part.
    pub const OTIODEC_DATE: &str = "OTIODEC_DATE";

    /// Temperature, in °C
    pub const OTIODEC_TEMP: &str = "OTIODEC_TEMP";

    /// Relative humidity, in whole percent
    pub const OTIODEC_HUM: &str = "OTIODEC_HUM";

    /// Median wind speed
    pub const OTIODEC_WIND: &str = "OTIODEC_WIND";

    /// Wind gust speed
    pub const OTIODEC_GUST: &str = "OTIODEC_GUST";

    /// Rainfall since the previous reading, in mm
    pub const OTIODEC_RAIN: &str = "OTIODEC_RAIN";

    /// Raw rain gauge counter (0-255)
    ///
    /// The counter wraps around. It is provided so that
    /// clients can keep their own rain totals.
    pub const OTIODEC_RAIN_COUNT: &str = "OTIODEC_RAIN_COUNT";
}
