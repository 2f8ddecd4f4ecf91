//! The stub transport only logs message envelope and drops the content. It can be useful for
//! testing purposes.
//!
//! Clones share the same record, so a test can keep one handle and give the other
//! away.
//!
//! ```rust
//! use contact_mailer::{transport::stub::StubTransport, Message, Transport};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let email = Message::builder()
//!     .from("NoBody", "nobody@domain.tld".parse()?)
//!     .to("hei@domain.tld".parse()?)
//!     .subject("Happy new year")
//!     .html("<p>Be happy!</p>")
//!     .build()?;
//!
//! let sender = StubTransport::new_ok();
//! sender.send(&email)?;
//! assert_eq!(sender.messages().len(), 1);
//! # Ok(())
//! # }
//! ```

use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{address::Envelope, Transport};

/// An error returned by the stub transport
#[non_exhaustive]
#[derive(Debug, Copy, Clone)]
pub struct Error;

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("stub error")
    }
}

impl StdError for Error {}

/// This transport logs the message envelope and returns the given response
#[derive(Debug, Clone)]
pub struct StubTransport {
    name: &'static str,
    response: Result<(), Error>,
    message_log: Arc<Mutex<Vec<(Envelope, String)>>>,
}

impl StubTransport {
    /// Creates a new transport that always returns the given response
    pub fn new(response: Result<(), Error>) -> StubTransport {
        StubTransport {
            name: "stub",
            response,
            message_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Creates a new transport that always returns a success response
    pub fn new_ok() -> StubTransport {
        StubTransport::new(Ok(()))
    }

    /// Creates a new transport that always returns an error
    pub fn new_error() -> StubTransport {
        StubTransport::new(Err(Error))
    }

    /// Sets the name used by `Display`
    pub fn named(mut self, name: &'static str) -> StubTransport {
        self.name = name;
        self
    }

    /// Return every message handed to the transport, failed attempts included
    pub fn messages(&self) -> Vec<(Envelope, String)> {
        self.log().clone()
    }

    /// Number of send attempts, failed ones included
    pub fn attempts(&self) -> usize {
        self.log().len()
    }

    fn log(&self) -> MutexGuard<'_, Vec<(Envelope, String)>> {
        self.message_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Display for StubTransport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl Transport for StubTransport {
    type Ok = ();
    type Error = Error;

    fn send_raw(&self, envelope: &Envelope, email: &[u8]) -> Result<Self::Ok, Self::Error> {
        tracing::info!(from = %envelope.from(), to = %envelope.to(), "stub transport");
        self.log()
            .push((envelope.clone(), String::from_utf8_lossy(email).into()));
        self.response
    }
}
