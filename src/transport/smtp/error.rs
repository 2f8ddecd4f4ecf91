//! Error and result type for SMTP clients

use std::{error::Error as StdError, fmt, io};

use crate::{
    transport::smtp::{
        client::{Exchange, Phase},
        response::{Code, Reply, Response},
    },
    BoxError,
};

// Inspired by https://github.com/seanmonstar/reqwest/blob/a8566383168c0ef06c21f38cbc9213af6ff6db31/src/error.rs

/// The Errors that may occur when sending an email over SMTP
///
/// Every error raised during a session names the phase it happened in and, when
/// the server answered, its raw reply.
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    phase: Option<Phase>,
    reply: Option<String>,
    transcript: Vec<Exchange>,
    source: Option<BoxError>,
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, phase: Option<Phase>, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                phase,
                reply: None,
                transcript: Vec::new(),
                source: source.map(Into::into),
            }),
        }
    }

    fn with_reply(mut self, reply: &Reply) -> Error {
        if !reply.is_empty() {
            self.inner.reply = Some(reply.last().to_owned());
        }
        self
    }

    pub(crate) fn with_transcript(mut self, transcript: Vec<Exchange>) -> Error {
        self.inner.transcript = transcript;
        self
    }

    /// Returns true if the socket could not be opened
    pub fn is_connection(&self) -> bool {
        matches!(self.inner.kind, Kind::Connection)
    }

    /// Returns true if the server answered with an unexpected reply, or not at all
    pub fn is_response(&self) -> bool {
        matches!(self.inner.kind, Kind::Response)
    }

    /// Returns true if `AUTH LOGIN` was refused
    pub fn is_authentication(&self) -> bool {
        matches!(self.inner.kind, Kind::Authentication)
    }

    /// Returns true if the error is from TLS
    pub fn is_tls(&self) -> bool {
        matches!(self.inner.kind, Kind::Tls)
    }

    /// Returns true if reading or writing the socket failed
    pub fn is_network(&self) -> bool {
        matches!(self.inner.kind, Kind::Network)
    }

    /// Returns true if the error is caused by a timeout
    pub fn is_timeout(&self) -> bool {
        let mut source = self.source();

        while let Some(err) = source {
            if let Some(io_err) = err.downcast_ref::<io::Error>() {
                return matches!(
                    io_err.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                );
            }

            source = err.source();
        }

        false
    }

    /// The session phase the error happened in
    pub fn phase(&self) -> Option<Phase> {
        self.inner.phase
    }

    /// The raw final reply line, if the server sent one
    pub fn reply(&self) -> Option<&str> {
        self.inner.reply.as_deref()
    }

    /// The session up to the failure, credentials hidden
    ///
    /// Empty when the socket could not be opened.
    pub fn transcript(&self) -> &[Exchange] {
        &self.inner.transcript
    }

    /// Returns the status code, if the server sent a parseable reply
    pub fn status(&self) -> Option<Code> {
        self.reply()
            .and_then(|reply| reply.parse::<Response>().ok())
            .as_ref()
            .map(Response::code)
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Kind {
    /// Opening the socket failed
    Connection,
    /// Unexpected or missing reply
    Response,
    /// Credentials refused
    Authentication,
    /// Underlying network i/o error
    Network,
    /// TLS error
    Tls,
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("contact_mailer::transport::smtp::Error");

        builder.field("kind", &self.inner.kind);

        if let Some(phase) = self.inner.phase {
            builder.field("phase", &phase);
        }

        if let Some(ref reply) = self.inner.reply {
            builder.field("reply", reply);
        }

        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.kind {
            Kind::Connection => f.write_str("connection error")?,
            Kind::Response => f.write_str("response error")?,
            Kind::Authentication => f.write_str("authentication failed")?,
            Kind::Network => f.write_str("network error")?,
            Kind::Tls => f.write_str("tls error")?,
        };

        if let Some(phase) = self.inner.phase {
            write!(f, " during {phase}")?;
        }

        match (&self.inner.reply, self.inner.kind) {
            (Some(reply), _) => write!(f, ": {reply}")?,
            (None, Kind::Response | Kind::Authentication) => f.write_str(": no response")?,
            (None, _) => {}
        }

        if let Some(ref e) = self.inner.source {
            write!(f, ": {e}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| {
            let r: &(dyn StdError + 'static) = &**e;
            r
        })
    }
}

/// Picks the kind for a reply that did not carry the expected code
pub(crate) fn unexpected(phase: Phase, reply: &Reply) -> Error {
    if let Some(kind) = reply.io_error() {
        return network(phase, io::Error::from(kind)).with_reply(reply);
    }

    let kind = if phase.is_authentication() {
        Kind::Authentication
    } else {
        Kind::Response
    };
    Error::new(kind, Some(phase), None::<BoxError>).with_reply(reply)
}

pub(crate) fn connection<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Connection, Some(Phase::Connect), Some(e))
}

pub(crate) fn network<E: Into<BoxError>>(phase: Phase, e: E) -> Error {
    Error::new(Kind::Network, Some(phase), Some(e))
}

pub(crate) fn tls<E: Into<BoxError>>(phase: Phase, e: E) -> Error {
    Error::new(Kind::Tls, Some(phase), Some(e))
}

/// The TLS connector could not be built
pub(crate) fn tls_setup<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Tls, None, Some(e))
}

/// Invalid configuration, before any socket is opened
pub(crate) fn client<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Connection, None, Some(e))
}
