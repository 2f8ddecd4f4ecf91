//! Error type for message composition

use self::Error::*;
use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
};

use crate::address::AddressError;

/// Errors raised while composing a [`Message`](super::Message).
///
/// These come from malformed input and are not retryable.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Missing sender
    MissingFrom,
    /// Missing recipient
    MissingTo,
    /// Missing subject
    MissingSubject,
    /// Missing HTML body
    MissingBody,
    /// A header value contains a line break
    LineBreakInHeader(&'static str),
    /// An address could not be parsed
    Address(AddressError),
}

impl Display for Error {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            MissingFrom => fmt.write_str("missing source address, invalid envelope"),
            MissingTo => fmt.write_str("missing destination address, invalid envelope"),
            MissingSubject => fmt.write_str("missing subject"),
            MissingBody => fmt.write_str("missing html body"),
            LineBreakInHeader(name) => write!(fmt, "line break in {name} header"),
            Address(err) => write!(fmt, "invalid address: {err}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Address(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AddressError> for Error {
    fn from(err: AddressError) -> Error {
        Error::Address(err)
    }
}
