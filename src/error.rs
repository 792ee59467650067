//! Setup errors of the command-line front end.
//!
//! Anything that goes wrong before a batch is started ends the process with
//! exit code 2. Failures inside a batch are reported through its
//! [`Completion`](raw2dng_batch::Completion) instead.

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("unable to load configuration")]
    Config,
    #[display("no output folder given: pass --output or set `output` in the configuration file")]
    NoOutput,
    #[display("unable to create output folder: {}", _0.display())]
    Output(#[error(not(source))] PathBuf),
    #[display("no usable RAW to DNG converter")]
    Converter,
}
