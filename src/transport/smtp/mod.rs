//! The SMTP transport sends emails using the SMTP protocol.
//!
//! This SMTP client follows [RFC 5321](https://tools.ietf.org/html/rfc5321), and is
//! designed to hand a single message to a relay server per connection.
//!
//! It implements the following extensions:
//!
//! * STARTTLS ([RFC 2487](http://tools.ietf.org/html/rfc2487))
//! * AUTH ([RFC 4954](http://tools.ietf.org/html/rfc4954)) with the LOGIN mechanism
//!
//! Every reply is checked against the single code expected at that step of the
//! session. Anything else stops the session with an [`Error`] naming the step and
//! the last server line.
//!
//! #### Simple example
//!
//! ```rust,no_run
//! use contact_mailer::{
//!     transport::smtp::authentication::Credentials, Message, SmtpTransport, Transport,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let email = Message::builder()
//!     .from("NoBody", "nobody@domain.tld".parse()?)
//!     .reply_to("yuin@domain.tld".parse()?)
//!     .to("hei@domain.tld".parse()?)
//!     .subject("Happy new year")
//!     .html("<p>Be happy!</p>")
//!     .build()?;
//!
//! let mailer = SmtpTransport::starttls_relay("smtp.example.com")?
//!     .credentials(Credentials::new("username".to_owned(), "password".to_owned()))
//!     .build();
//!
//! mailer.send(&email)?;
//! # Ok(())
//! # }
//! ```
//!
//! #### Checking the settings
//!
//! [`SmtpTransport::test_connection`] runs the handshake and login without sending
//! anything and reports every exchange:
//!
//! ```rust,no_run
//! use contact_mailer::SmtpTransport;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let report = SmtpTransport::relay("smtp.example.com")?.build().test_connection();
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

pub use self::{
    authentication::Credentials,
    client::Tls,
    error::Error,
    response::Response,
    transport::{ProbeReport, SmtpTransport, SmtpTransportBuilder},
};

pub mod authentication;
pub mod client;
pub mod commands;
mod connection_url;
mod error;
pub mod extension;
pub mod response;
mod transport;

// Registered port numbers:
// https://www.iana.org/assignments/service-names-port-numbers/service-names-port-numbers.xhtml

/// Default smtp port
pub const SMTP_PORT: u16 = 25;
/// Default submission port
pub const SUBMISSION_PORT: u16 = 587;
/// Default submission over TLS port
///
/// Defined in [RFC8314](https://tools.ietf.org/html/rfc8314)
pub const SUBMISSIONS_PORT: u16 = 465;

/// Default timeout for connecting, reading and writing
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
