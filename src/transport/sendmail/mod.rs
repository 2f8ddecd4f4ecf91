//! The sendmail transport sends the email using the local sendmail command.
//!
//! #### Sendmail Transport
//!
//! The message is written to the standard input of `sendmail -i -f <from> <to>`. A
//! non-zero exit status is an error carrying whatever the command wrote to stderr.
//!
//! ```rust,no_run
//! use contact_mailer::{Message, SendmailTransport, Transport};
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
//! let sender = SendmailTransport::new();
//! sender.send(&email)?;
//! # Ok(())
//! # }
//! ```

use std::{
    ffi::{OsStr, OsString},
    io::Write,
    process::{Command, Output, Stdio},
};

pub use self::error::Error;
use crate::{address::Envelope, Message, Transport};

mod error;

const DEFAULT_SENDMAIL: &str = "/usr/sbin/sendmail";

/// Sends an email using the `sendmail` command
#[derive(Debug, Clone)]
pub struct SendmailTransport {
    command: OsString,
}

impl SendmailTransport {
    /// Creates a new transport with the default `/usr/sbin/sendmail` command
    pub fn new() -> SendmailTransport {
        SendmailTransport {
            command: DEFAULT_SENDMAIL.into(),
        }
    }

    /// Creates a new transport to the given sendmail command
    pub fn new_with_command<S: Into<OsString>>(command: S) -> SendmailTransport {
        SendmailTransport {
            command: command.into(),
        }
    }

    /// The command messages are piped to
    pub fn command(&self) -> &OsStr {
        &self.command
    }

    fn process(&self, envelope: &Envelope) -> Command {
        let mut c = Command::new(&self.command);
        c.arg("-i")
            .arg("-f")
            .arg(envelope.from().as_ref())
            .arg(envelope.to().as_ref())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        c
    }
}

impl Default for SendmailTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SendmailTransport {
    type Ok = ();
    type Error = Error;

    /// Sends the message with the `To` header first, as a local mailer expects
    fn send(&self, message: &Message) -> Result<Self::Ok, Self::Error> {
        let body = message.formatted_for_local_submission();
        let mut raw = format!("To: <{}>\r\n", message.to()).into_bytes();
        raw.extend_from_slice(&body);
        self.send_raw(&message.envelope(), &raw)
    }

    fn send_raw(&self, envelope: &Envelope, email: &[u8]) -> Result<Self::Ok, Self::Error> {
        tracing::debug!(
            command = %self.command.to_string_lossy(),
            to = %envelope.to(),
            "piping message to sendmail"
        );

        // Spawn the sendmail command
        let mut process = self.process(envelope).spawn()?;

        let mut stdin = process
            .stdin
            .take()
            .ok_or_else(|| Error::Client("sendmail stdin is not available".to_owned()))?;
        let written = stdin.write_all(email);
        // Closing stdin lets sendmail see the end of the message
        drop(stdin);

        let output = process.wait_with_output()?;
        if let Err(err) = written {
            // sendmail exited before reading everything, its stderr says why
            if !output.status.success() {
                return Err(failure(output));
            }
            return Err(err.into());
        }

        if output.status.success() {
            Ok(())
        } else {
            Err(failure(output))
        }
    }
}

fn failure(output: Output) -> Error {
    match String::from_utf8(output.stderr) {
        Ok(stderr) => Error::Client(format!("{} ({})", stderr.trim_end(), output.status)),
        Err(err) => err.into(),
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::SendmailTransport;
    use crate::address::Envelope;

    #[test]
    fn command_arguments() {
        let transport = SendmailTransport::new_with_command("/usr/lib/sendmail");
        let envelope = Envelope::new(
            "noreply@example.com".parse().unwrap(),
            "sales@example.com".parse().unwrap(),
        );

        let command = transport.process(&envelope);

        assert_eq!(command.get_program(), "/usr/lib/sendmail");
        assert_eq!(
            command.get_args().collect::<Vec<_>>(),
            vec!["-i", "-f", "noreply@example.com", "sales@example.com"]
        );
    }

    #[test]
    fn missing_command() {
        let transport = SendmailTransport::new_with_command("/nonexistent/sendmail");
        let envelope = Envelope::new(
            "noreply@example.com".parse().unwrap(),
            "sales@example.com".parse().unwrap(),
        );

        let err = crate::Transport::send_raw(&transport, &envelope, b"Subject: hi\r\n\r\nhi")
            .unwrap_err();
        assert!(matches!(err, super::Error::Io(_)));
    }
}
