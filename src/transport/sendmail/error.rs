//! Error and result type for sendmail transport

use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
    io,
    string::FromUtf8Error,
};

/// An enum of all error kinds.
#[derive(Debug)]
pub enum Error {
    /// The command exited with a failure status
    Client(String),
    /// The command wrote something other than UTF-8 to stderr
    Utf8Parsing(FromUtf8Error),
    /// The command could not be spawned or fed
    Io(io::Error),
}

impl Display for Error {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Error::Client(err) => err.fmt(fmt),
            Error::Utf8Parsing(err) => err.fmt(fmt),
            Error::Io(err) => err.fmt(fmt),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Utf8Parsing(err) => Some(err),
            Error::Client(_) => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<FromUtf8Error> for Error {
    fn from(err: FromUtf8Error) -> Error {
        Error::Utf8Parsing(err)
    }
}
