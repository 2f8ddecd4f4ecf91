//! contact-mailer delivers contact form submissions by email.
//!
//! The primary path speaks SMTP directly: the [`SmtpTransport`] opens a socket, reads the
//! greeting, upgrades the connection with `STARTTLS` (or starts with implicit TLS),
//! authenticates with `AUTH LOGIN` and submits one `multipart/alternative` [`Message`].
//! When that fails the [`Dispatcher`] hands the same message to the local `sendmail`
//! binary through the [`SendmailTransport`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use contact_mailer::{
//!     transport::smtp::authentication::Credentials, Dispatcher, Mailer, Message,
//!     SendmailTransport, SmtpTransport,
//! };
//!
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! let message = Message::builder()
//!     .from("Contact Form", "noreply@example.com".parse()?)
//!     .to("sales@example.com".parse()?)
//!     .reply_to("visitor@example.org".parse()?)
//!     .subject("[Contact Form] Web Development - Jane")
//!     .html("<p>Hello <b>there</b></p>")
//!     .build()?;
//!
//! let smtp = SmtpTransport::starttls_relay("mail.example.com")?
//!     .credentials(Credentials::new("noreply@example.com".to_owned(), "secret".to_owned()))
//!     .build();
//!
//! let dispatcher = Dispatcher::new(
//!     Some(Mailer::Smtp(smtp)),
//!     Mailer::LocalSubmission(SendmailTransport::new()),
//! );
//! let result = dispatcher.deliver(&message, None);
//! assert!(result.succeeded);
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/contact-mailer/0.1.0")]
#![forbid(unsafe_code)]
#![deny(
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces,
    missing_debug_implementations,
    missing_docs,
    clippy::string_add,
    clippy::string_add_assign,
    clippy::clone_on_ref_ptr,
    clippy::verbose_file_reads,
    clippy::unnecessary_self_imports,
    clippy::string_to_string,
    clippy::mem_forget,
    clippy::cast_lossless,
    clippy::inefficient_to_string,
    clippy::inline_always,
    clippy::linkedlist,
    clippy::macro_use_imports,
    clippy::manual_assert,
    clippy::unnecessary_join,
    clippy::wildcard_imports,
    clippy::str_to_string,
    clippy::empty_structs_with_brackets,
    clippy::zero_sized_map_values,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::unnecessary_wraps,
    clippy::doc_markdown,
    clippy::explicit_iter_loop,
    clippy::redundant_closure_for_method_calls,
    // Rust 1.86: clippy::unnecessary_semicolon,
)]

pub mod address;
pub mod config;
pub mod delivery;
pub mod diagnostic;
pub mod message;
pub mod transport;

pub use crate::{
    address::{Address, Envelope},
    config::Config,
    delivery::{DeliveryResult, Dispatcher, Sink},
    diagnostic::DiagnosticLog,
    message::{Mailbox, Message},
    transport::{
        sendmail::SendmailTransport,
        smtp::{SmtpTransport, Tls},
        Mailer, Transport,
    },
};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;
