//! ### Sending Messages
//!
//! Two transports are available:
//!
//! * The [`SmtpTransport`](smtp::SmtpTransport) uses the SMTP protocol to send the message
//!   over the network. It is the preferred way of sending emails.
//! * The [`SendmailTransport`](sendmail::SendmailTransport) pipes the message to the local
//!   sendmail command. It is the fallback when the SMTP server can't be reached.
//!
//! [`Mailer`] wraps either one behind the same [`Transport`] interface. The
//! [`StubTransport`](stub::StubTransport) stands in for both in tests.

use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
};

use crate::{Envelope, Message};

pub mod sendmail;
pub mod smtp;
pub mod stub;

/// Blocking Transport method for emails
pub trait Transport {
    /// Response produced by the Transport
    type Ok;
    /// Error produced by the Transport
    type Error;

    /// Sends the email
    fn send(&self, message: &Message) -> Result<Self::Ok, Self::Error> {
        let raw = message.formatted();
        self.send_raw(&message.envelope(), &raw)
    }

    /// Sends an already formatted email
    fn send_raw(&self, envelope: &Envelope, email: &[u8]) -> Result<Self::Ok, Self::Error>;
}

/// Errors that may carry the SMTP session leading up to them
pub trait SessionTranscript {
    /// Exchanges with the server before the failure, credentials hidden
    fn transcript(&self) -> &[smtp::client::Exchange] {
        &[]
    }
}

impl SessionTranscript for smtp::Error {
    fn transcript(&self) -> &[smtp::client::Exchange] {
        smtp::Error::transcript(self)
    }
}

impl SessionTranscript for sendmail::Error {}

impl SessionTranscript for stub::Error {}

/// A delivery sink: the SMTP relay or the local sendmail command
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum Mailer {
    /// Submit over SMTP
    Smtp(smtp::SmtpTransport),
    /// Pipe to the local sendmail command
    LocalSubmission(sendmail::SendmailTransport),
}

impl Transport for Mailer {
    type Ok = ();
    type Error = Error;

    fn send(&self, message: &Message) -> Result<Self::Ok, Self::Error> {
        match self {
            Mailer::Smtp(transport) => transport.send(message).map(drop)?,
            Mailer::LocalSubmission(transport) => transport.send(message)?,
        }
        Ok(())
    }

    fn send_raw(&self, envelope: &Envelope, email: &[u8]) -> Result<Self::Ok, Self::Error> {
        match self {
            Mailer::Smtp(transport) => transport.send_raw(envelope, email).map(drop)?,
            Mailer::LocalSubmission(transport) => transport.send_raw(envelope, email)?,
        }
        Ok(())
    }
}

impl Display for Mailer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Mailer::Smtp(transport) => write!(f, "{}:{}", transport.server(), transport.port()),
            Mailer::LocalSubmission(transport) => {
                write!(f, "sendmail ({})", transport.command().to_string_lossy())
            }
        }
    }
}

/// Error returned by a [`Mailer`]
#[derive(Debug)]
pub enum Error {
    /// The SMTP session failed
    Smtp(smtp::Error),
    /// The sendmail command failed
    Sendmail(sendmail::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::Smtp(err) => err.fmt(f),
            Error::Sendmail(err) => err.fmt(f),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Smtp(err) => err.source(),
            Error::Sendmail(err) => err.source(),
        }
    }
}

impl SessionTranscript for Error {
    fn transcript(&self) -> &[smtp::client::Exchange] {
        match self {
            Error::Smtp(err) => err.transcript(),
            Error::Sendmail(_) => &[],
        }
    }
}

impl From<smtp::Error> for Error {
    fn from(err: smtp::Error) -> Self {
        Error::Smtp(err)
    }
}

impl From<sendmail::Error> for Error {
    fn from(err: sendmail::Error) -> Self {
        Error::Sendmail(err)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::Mailer;
    use crate::{SendmailTransport, SmtpTransport};

    #[test]
    fn mailer_display() {
        let smtp = Mailer::Smtp(
            SmtpTransport::builder_dangerous("mail.example.com")
                .port(2525)
                .build(),
        );
        assert_eq!(smtp.to_string(), "mail.example.com:2525");

        let local = Mailer::LocalSubmission(SendmailTransport::new());
        assert_eq!(local.to_string(), "sendmail (/usr/sbin/sendmail)");
    }
}
