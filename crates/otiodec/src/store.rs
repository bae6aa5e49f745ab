//! Rain counter state file

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::warn;
use otiowx::RainStore;
use thiserror::Error;

/// Error reading or writing the state file
#[derive(Error, Debug)]
pub enum StateFileErr {
    /// The file could not be read or written
    #[error("rain state file \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file does not contain a counter value
    #[error(
        "rain state file \"{}\" contains \"{content}\", not a counter value (0-255)",
        path.display()
    )]
    Corrupt { path: PathBuf, content: String },
}

/// Keeps the rain counter in a text file
///
/// The file holds the counter as a decimal number. A missing
/// file means that there is no previous counter value yet,
/// and so does a file with anything else in it: the next
/// counter value heard becomes the new baseline and replaces
/// it.
///
/// New values are written to a sibling file which is then
/// renamed over the state file, so the state file always
/// holds either the old value or the new one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRainStore {
    path: PathBuf,
}

impl FileRainStore {
    /// Store backed by the file at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_owned(),
        }
    }

    /// Path to the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the counter, reporting unparseable contents
    pub fn read(&self) -> Result<Option<u8>, StateFileErr> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };

        let content = content.trim();
        content
            .parse::<u8>()
            .map(Some)
            .map_err(|_| StateFileErr::Corrupt {
                path: self.path.clone(),
                content: content.to_owned(),
            })
    }

    // write `count` next to the state file, then move it into place
    fn replace(&self, count: u8) -> Result<(), StateFileErr> {
        let staging = self.staging_path();
        fs::write(&staging, count.to_string()).map_err(|e| self.io_err(e))?;
        fs::rename(&staging, &self.path).map_err(|e| {
            let _ = fs::remove_file(&staging);
            self.io_err(e)
        })
    }

    // `.NAME.tmp` in the same directory, so the rename stays on one filesystem
    fn staging_path(&self) -> PathBuf {
        let mut name = OsString::from(".");
        if let Some(file_name) = self.path.file_name() {
            name.push(file_name);
        }
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_err(&self, source: io::Error) -> StateFileErr {
        StateFileErr::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl RainStore for FileRainStore {
    type Error = StateFileErr;

    fn load(&mut self) -> Result<Option<u8>, Self::Error> {
        match self.read() {
            Err(err @ StateFileErr::Corrupt { .. }) => {
                warn!("{}; starting a new baseline", err);
                Ok(None)
            }
            other => other,
        }
    }

    fn store(&mut self, previous: Option<u8>) -> Result<(), Self::Error> {
        match previous {
            Some(count) => self.replace(count),
            None => match fs::remove_file(&self.path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(self.io_err(e)),
                _ => Ok(()),
            },
        }
    }
}
