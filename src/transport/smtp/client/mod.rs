//! SMTP client
//!
//! `SmtpConnection` allows manually sending SMTP commands.
//!
//! ```rust,no_run
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! use contact_mailer::transport::smtp::{
//!     client::{SmtpConnection, TlsParameters},
//!     extension::ClientId,
//!     SUBMISSION_PORT,
//! };
//!
//! let hello = ClientId::Domain("my_hostname".to_owned());
//! let mut conn = SmtpConnection::connect("mail.example.com", SUBMISSION_PORT, None, None)?;
//! conn.greet()?;
//! conn.ehlo(&hello)?;
//! conn.starttls(&TlsParameters::new("mail.example.com".to_owned())?, &hello)?;
//! conn.send(
//!     &contact_mailer::Envelope::new("user@localhost".parse()?, "root@localhost".parse()?),
//!     b"From: user@localhost\r\nTo: root@localhost\r\nSubject: Hello\r\n\r\nHello",
//! )?;
//! conn.quit()?;
//! # Ok(())
//! # }
//! ```

use std::fmt::{self, Display, Formatter};

pub use self::{
    connection::{Exchange, SmtpConnection},
    mock::MockStream,
    net::NetworkStream,
    tls::{Tls, TlsParameters, TlsParametersBuilder},
};

mod connection;
mod mock;
mod net;
mod tls;

/// Where a session stands, in protocol order
///
/// `StartTls` and `EhloAfterTls` only happen with [`Tls::StartTls`], the three
/// `Auth*` phases only when credentials are configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Opening the socket
    Connect,
    /// Waiting for the `220` greeting
    Greet,
    /// First `EHLO`
    Ehlo,
    /// `STARTTLS` and the handshake
    StartTls,
    /// `EHLO` on the encrypted connection
    EhloAfterTls,
    /// `AUTH LOGIN`, waiting for the username challenge
    AuthLoginPrompt,
    /// Username sent, waiting for the password challenge
    AuthUsername,
    /// Password sent, waiting for `235`
    AuthPassword,
    /// `MAIL FROM`
    MailFrom,
    /// `RCPT TO`
    RcptTo,
    /// `DATA`, waiting for `354`
    DataPrompt,
    /// Message written, waiting for `250`
    DataPayload,
    /// `QUIT`
    Quit,
    /// The socket is shut down
    Closed,
}

impl Phase {
    /// The reply code that lets the session move on
    pub fn expected_code(self) -> Option<u16> {
        Some(match self {
            Phase::Greet | Phase::StartTls => 220,
            Phase::Ehlo
            | Phase::EhloAfterTls
            | Phase::MailFrom
            | Phase::RcptTo
            | Phase::DataPayload => 250,
            Phase::AuthLoginPrompt | Phase::AuthUsername => 334,
            Phase::AuthPassword => 235,
            Phase::DataPrompt => 354,
            Phase::Connect | Phase::Quit | Phase::Closed => return None,
        })
    }

    pub(crate) fn is_authentication(self) -> bool {
        matches!(
            self,
            Phase::AuthLoginPrompt | Phase::AuthUsername | Phase::AuthPassword
        )
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Connect => "connect",
            Phase::Greet => "greeting",
            Phase::Ehlo => "EHLO",
            Phase::StartTls => "STARTTLS",
            Phase::EhloAfterTls => "EHLO after STARTTLS",
            Phase::AuthLoginPrompt => "AUTH LOGIN",
            Phase::AuthUsername => "AUTH LOGIN username",
            Phase::AuthPassword => "AUTH LOGIN password",
            Phase::MailFrom => "MAIL FROM",
            Phase::RcptTo => "RCPT TO",
            Phase::DataPrompt => "DATA",
            Phase::DataPayload => "message payload",
            Phase::Quit => "QUIT",
            Phase::Closed => "closed",
        })
    }
}

/// The codec used for transparency
///
/// Doubles every `.` starting a line so the payload cannot end the `DATA` early.
#[derive(Clone, Copy, Debug)]
pub struct ClientCodec {
    escape_count: u8,
}

impl Default for ClientCodec {
    fn default() -> Self {
        // The payload starts at the beginning of a line
        Self { escape_count: 2 }
    }
}

impl ClientCodec {
    /// Creates a new client codec
    pub fn new() -> Self {
        ClientCodec::default()
    }

    /// Adds transparency
    pub fn encode(&mut self, frame: &[u8], buf: &mut Vec<u8>) {
        let mut start = 0;
        for (idx, byte) in frame.iter().enumerate() {
            self.escape_count = match (self.escape_count, *byte) {
                (_, b'\r') => 1,
                (1, b'\n') => 2,
                (2, b'.') => 3,
                _ => 0,
            };
            if self.escape_count == 3 {
                self.escape_count = 0;
                buf.extend_from_slice(&frame[start..idx]);
                buf.push(b'.');
                start = idx;
            }
        }
        buf.extend_from_slice(&frame[start..]);
    }
}

/// Returns the string replacing all the CRLF with "\<CRLF\>"
///
/// Used for debug displays
pub(super) fn escape_crlf(string: &str) -> String {
    string.replace("\r\n", "<CRLF>")
}
