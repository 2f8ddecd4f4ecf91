use std::{
    fmt::{self, Display, Formatter},
    io::{self, BufReader, Write},
    net::Shutdown,
    time::Duration,
};

use super::{escape_crlf, ClientCodec, NetworkStream, Phase, TlsParameters};
use crate::{
    address::Envelope,
    transport::smtp::{
        authentication::Credentials,
        commands::{AuthLogin, Data, Ehlo, Mail, Quit, Rcpt, Starttls},
        error::{self, Error},
        extension::ClientId,
        response::{read_reply, Reply, Response},
    },
};

/// Stands in for the base64 credentials in logs and transcripts
const HIDDEN: &str = "<credentials hidden>";

/// One step of a session: what was sent and what came back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Phase the step belongs to
    pub phase: Phase,
    /// Command line as sent, credentials replaced. `None` for the greeting.
    pub command: Option<String>,
    /// Server reply
    pub reply: Reply,
}

impl Display for Exchange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(command) = &self.command {
            writeln!(f, "C: {command}")?;
        }
        if self.reply.is_empty() {
            writeln!(f, "S: {}", self.reply)
        } else {
            for line in self.reply.full().lines() {
                writeln!(f, "S: {line}")?;
            }
            Ok(())
        }
    }
}

/// Structure that implements the SMTP client
///
/// Each step checks the reply against [`Phase::expected_code`], anything else is an
/// [`Error`] and the session is over. The socket is shut down when the connection is
/// dropped.
pub struct SmtpConnection {
    /// TCP stream between client and server
    stream: BufReader<NetworkStream>,
    /// Current phase
    phase: Phase,
    /// Every step so far
    transcript: Vec<Exchange>,
    /// Whether QUIT has been sent
    sent_quit: bool,
    /// The stream can no longer be used
    broken: bool,
    /// Only EHLO and STARTTLS may be sent before the stream is encrypted
    tls_required: bool,
}

impl SmtpConnection {
    /// Opens the socket, wrapped in TLS when `tls_parameters` is set
    ///
    /// The greeting is not read yet, see [`SmtpConnection::greet`].
    pub fn connect(
        host: &str,
        port: u16,
        timeout: Option<Duration>,
        tls_parameters: Option<&TlsParameters>,
    ) -> Result<SmtpConnection, Error> {
        let stream = NetworkStream::connect(host, port, timeout, tls_parameters)?;
        SmtpConnection::new(stream, timeout)
    }

    /// Starts a session over an already open stream
    pub fn new(stream: NetworkStream, timeout: Option<Duration>) -> Result<SmtpConnection, Error> {
        let mut conn = SmtpConnection {
            stream: BufReader::new(stream),
            phase: Phase::Connect,
            transcript: Vec::new(),
            sent_quit: false,
            broken: false,
            tls_required: false,
        };
        conn.set_timeout(timeout).map_err(error::connection)?;
        Ok(conn)
    }

    /// Marks the session as one that must be encrypted before anything but EHLO
    /// and STARTTLS is sent
    pub fn require_tls(&mut self) {
        self.tls_required = true;
    }

    /// Reads the `220` greeting
    pub fn greet(&mut self) -> Result<Response, Error> {
        self.phase = Phase::Greet;
        self.expect(None)
    }

    /// Sends EHLO
    ///
    /// Right after STARTTLS this is the [`Phase::EhloAfterTls`] step.
    pub fn ehlo(&mut self, hello_name: &ClientId) -> Result<Response, Error> {
        let phase = if self.phase == Phase::StartTls {
            Phase::EhloAfterTls
        } else {
            Phase::Ehlo
        };
        self.command(phase, Ehlo::new(hello_name.clone()))
    }

    /// Sends STARTTLS, upgrades the socket and sends EHLO again
    pub fn starttls(
        &mut self,
        tls_parameters: &TlsParameters,
        hello_name: &ClientId,
    ) -> Result<Response, Error> {
        self.command(Phase::StartTls, Starttls)?;

        // Anything already buffered arrived in plaintext after the 220
        if !self.stream.buffer().is_empty() {
            self.broken = true;
            return Err(error::tls(
                Phase::StartTls,
                "server sent data before the TLS handshake",
            ));
        }
        if let Err(err) = self
            .stream
            .get_mut()
            .upgrade_tls(tls_parameters, Phase::StartTls)
        {
            self.broken = true;
            return Err(err);
        }
        tracing::debug!("connection encrypted");

        self.ehlo(hello_name)
    }

    /// Authenticates with `AUTH LOGIN`
    ///
    /// Username and password each answer their own `334` challenge.
    pub fn auth_login(&mut self, credentials: &Credentials) -> Result<Response, Error> {
        self.command(Phase::AuthLoginPrompt, AuthLogin)?;
        self.secret(Phase::AuthUsername, &credentials.login_username())?;
        self.secret(Phase::AuthPassword, &credentials.login_password())
    }

    /// Sends MAIL FROM, RCPT TO and DATA, then the message itself
    pub fn send(&mut self, envelope: &Envelope, email: &[u8]) -> Result<Response, Error> {
        self.command(Phase::MailFrom, Mail::new(envelope.from().clone()))?;
        self.command(Phase::RcptTo, Rcpt::new(envelope.to().clone()))?;
        self.command(Phase::DataPrompt, Data)?;
        self.message(email)
    }

    /// Sends the message content
    pub fn message(&mut self, message: &[u8]) -> Result<Response, Error> {
        self.phase = Phase::DataPayload;

        let mut codec = ClientCodec::new();
        let mut out_buf = Vec::with_capacity(message.len() + 5);
        codec.encode(message, &mut out_buf);
        out_buf.extend_from_slice(b"\r\n.\r\n");
        self.write(&out_buf)?;
        tracing::debug!("Wrote: {}", escape_crlf(&String::from_utf8_lossy(&out_buf)));

        self.expect(Some(format!("<{} bytes of message>", message.len())))
    }

    /// Sends QUIT and closes the socket
    ///
    /// The reply is returned but whatever it says, the session is over.
    pub fn quit(&mut self) -> Result<Response, Error> {
        self.sent_quit = true;
        let result = self.command(Phase::Quit, Quit);
        self.close();
        result
    }

    /// Gives up on the session
    ///
    /// QUIT is written without waiting for the reply, unless it was already sent,
    /// the stream is broken or it would go out in plaintext on a session that
    /// requires TLS.
    pub fn abort(&mut self) {
        let plaintext = self.tls_required && !self.is_encrypted();
        if !self.sent_quit && !self.broken && !plaintext {
            self.sent_quit = true;
            let _ = self.write(Quit.to_string().as_bytes());
        }
        self.close();
    }

    fn close(&mut self) {
        if self.phase != Phase::Closed {
            let _ = self.stream.get_ref().shutdown(Shutdown::Both);
            self.phase = Phase::Closed;
        }
    }

    /// Where the session stands
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Every command sent and reply received so far, credentials hidden
    pub fn transcript(&self) -> &[Exchange] {
        &self.transcript
    }

    /// The last reply received
    pub fn last_reply(&self) -> Option<&Reply> {
        self.transcript.last().map(|exchange| &exchange.reply)
    }

    /// Tells if the stream can no longer be used
    pub fn has_broken(&self) -> bool {
        self.broken
    }

    /// Tells if the underlying stream is currently encrypted
    pub fn is_encrypted(&self) -> bool {
        self.stream.get_ref().is_encrypted()
    }

    /// Set timeout
    pub fn set_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        self.stream.get_mut().set_read_timeout(duration)?;
        self.stream.get_mut().set_write_timeout(duration)
    }

    /// Sends an SMTP command and checks the reply
    pub fn command<C: Display>(&mut self, phase: Phase, command: C) -> Result<Response, Error> {
        let command = command.to_string();
        self.phase = phase;
        self.write(command.as_bytes())?;
        tracing::debug!("Wrote: {}", escape_crlf(&command));

        self.expect(Some(command.trim_end().to_owned()))
    }

    /// Like `command`, for lines that must not be logged
    fn secret(&mut self, phase: Phase, line: &str) -> Result<Response, Error> {
        self.phase = phase;
        self.write(line.as_bytes())?;
        tracing::debug!("Wrote: {HIDDEN}");

        self.expect(Some(HIDDEN.to_owned()))
    }

    /// Writes a string to the server
    fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if self.broken {
            return Err(error::network(self.phase, "connection is broken"));
        }

        let stream = self.stream.get_mut();
        if let Err(err) = stream.write_all(bytes).and_then(|()| stream.flush()) {
            self.broken = true;
            return Err(error::network(self.phase, err));
        }
        Ok(())
    }

    /// Reads the reply and checks it against the current phase
    fn expect(&mut self, command: Option<String>) -> Result<Response, Error> {
        let reply = read_reply(&mut self.stream);
        tracing::debug!("<< {}", escape_crlf(reply.full()));

        let expected = self.phase.expected_code();
        let response = reply
            .response()
            .filter(|response| expected.map_or(true, |code| response.has_code(code)));

        let result = match response {
            Some(response) if reply.io_error().is_none() => Ok(response),
            _ => {
                if reply.is_empty() || reply.io_error().is_some() {
                    self.broken = true;
                }
                Err(error::unexpected(self.phase, &reply))
            }
        };

        self.transcript.push(Exchange {
            phase: self.phase,
            command,
            reply,
        });
        result
    }
}

impl fmt::Debug for SmtpConnection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConnection")
            .field("phase", &self.phase)
            .field("encrypted", &self.is_encrypted())
            .field("broken", &self.broken)
            .finish_non_exhaustive()
    }
}

impl Drop for SmtpConnection {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{SmtpConnection, HIDDEN};
    use crate::transport::smtp::{
        authentication::Credentials,
        client::{MockStream, NetworkStream, Phase, TlsParameters},
        extension::ClientId,
    };

    fn connection(replies: &str) -> (SmtpConnection, MockStream) {
        let mock = MockStream::with_vec(replies.as_bytes().to_vec());
        let conn = SmtpConnection::new(NetworkStream::Mock(mock.clone()), None).unwrap();
        (conn, mock)
    }

    fn hello() -> ClientId {
        ClientId::Domain("client.example".to_owned())
    }

    #[test]
    fn greet_and_ehlo() {
        let (mut conn, mock) = connection(
            "220 mail.example.com ESMTP\r\n250-mail.example.com\r\n250-STARTTLS\r\n250 AUTH LOGIN\r\n",
        );

        assert!(conn.greet().unwrap().has_code(220));
        assert_eq!(conn.phase(), Phase::Greet);
        conn.ehlo(&hello()).unwrap();
        assert_eq!(conn.phase(), Phase::Ehlo);
        assert_eq!(mock.written(), "EHLO client.example\r\n");
        assert_eq!(conn.last_reply().unwrap().last(), "250 AUTH LOGIN");
    }

    #[test]
    fn wrong_greeting_code() {
        let (mut conn, _mock) = connection("554 go away\r\n");

        let err = conn.greet().unwrap_err();
        assert!(err.is_response());
        assert_eq!(err.phase(), Some(Phase::Greet));
        assert_eq!(err.reply(), Some("554 go away"));
    }

    #[test]
    fn no_greeting() {
        let (mut conn, mock) = connection("");

        let err = conn.greet().unwrap_err();
        assert_eq!(err.reply(), None);
        assert!(conn.has_broken());

        // nothing is written to a broken stream
        conn.abort();
        assert_eq!(mock.written(), "");
        assert_eq!(conn.phase(), Phase::Closed);
    }

    #[test]
    fn starttls_then_ehlo_again() {
        let (mut conn, mock) = connection(concat!(
            "220 ready\r\n",
            "250-mail.example.com\r\n250 STARTTLS\r\n",
            "220 go ahead\r\n",
            "250-mail.example.com\r\n250 AUTH LOGIN\r\n",
        ));
        conn.greet().unwrap();
        conn.ehlo(&hello()).unwrap();
        assert!(!conn.is_encrypted());

        let tls = TlsParameters::new("mail.example.com".to_owned()).unwrap();
        conn.starttls(&tls, &hello()).unwrap();

        assert!(conn.is_encrypted());
        assert_eq!(conn.phase(), Phase::EhloAfterTls);
        assert_eq!(
            mock.written(),
            "EHLO client.example\r\nSTARTTLS\r\nEHLO client.example\r\n"
        );
    }

    #[test]
    fn failed_handshake_is_terminal() {
        let mock = MockStream::with_vec(b"220 ready\r\n220 go ahead\r\n".to_vec()).refuse_tls();
        let mut conn = SmtpConnection::new(NetworkStream::Mock(mock.clone()), None).unwrap();
        conn.greet().unwrap();

        let tls = TlsParameters::new("mail.example.com".to_owned()).unwrap();
        let err = conn.starttls(&tls, &hello()).unwrap_err();

        assert!(err.is_tls());
        assert_eq!(err.phase(), Some(Phase::StartTls));
        assert!(!conn.is_encrypted());
        conn.abort();
        assert_eq!(mock.written(), "STARTTLS\r\n");
    }

    #[test]
    fn refused_starttls_closes_without_quit() {
        let (mut conn, mock) = connection(concat!(
            "220 ready\r\n",
            "250-mail.example.com\r\n250 STARTTLS\r\n",
            "454 4.7.0 TLS not available\r\n",
        ));
        conn.require_tls();
        conn.greet().unwrap();
        conn.ehlo(&hello()).unwrap();

        let tls = TlsParameters::new("mail.example.com".to_owned()).unwrap();
        let err = conn.starttls(&tls, &hello()).unwrap_err();
        assert!(err.is_response());
        assert_eq!(err.phase(), Some(Phase::StartTls));
        assert!(!conn.has_broken());

        conn.abort();
        assert_eq!(mock.written(), "EHLO client.example\r\nSTARTTLS\r\n");
        assert_eq!(conn.phase(), Phase::Closed);
    }

    #[test]
    fn auth_login_hides_credentials() {
        let (mut conn, mock) = connection(concat!(
            "334 VXNlcm5hbWU6\r\n",
            "334 UGFzc3dvcmQ6\r\n",
            "235 2.7.0 Authentication successful\r\n",
        ));

        conn.auth_login(&Credentials::from(("alice", "wonderland")))
            .unwrap();

        assert_eq!(
            mock.written(),
            "AUTH LOGIN\r\nYWxpY2U=\r\nd29uZGVybGFuZA==\r\n"
        );
        let transcript = conn
            .transcript()
            .iter()
            .map(ToString::to_string)
            .collect::<String>();
        assert!(!transcript.contains("YWxpY2U="));
        assert!(!transcript.contains("d29uZGVybGFuZA=="));
        assert_eq!(transcript.matches(HIDDEN).count(), 2);
    }

    #[test]
    fn refused_password() {
        let (mut conn, _mock) = connection(concat!(
            "334 VXNlcm5hbWU6\r\n",
            "334 UGFzc3dvcmQ6\r\n",
            "535 5.7.8 Authentication credentials invalid\r\n",
        ));

        let err = conn
            .auth_login(&Credentials::from(("alice", "wrong")))
            .unwrap_err();

        assert!(err.is_authentication());
        assert_eq!(err.phase(), Some(Phase::AuthPassword));
        assert!(!err.to_string().contains("wrong"));
    }

    #[test]
    fn send_is_dot_stuffed() {
        let (mut conn, mock) = connection("250 ok\r\n250 ok\r\n354 go ahead\r\n250 queued\r\n");
        let envelope = crate::address::Envelope::new(
            "from@example.com".parse().unwrap(),
            "to@example.com".parse().unwrap(),
        );

        conn.send(&envelope, b"Subject: hi\r\n\r\n.leading dot")
            .unwrap();

        assert_eq!(
            mock.written(),
            concat!(
                "MAIL FROM:<from@example.com>\r\n",
                "RCPT TO:<to@example.com>\r\n",
                "DATA\r\n",
                "Subject: hi\r\n\r\n..leading dot\r\n.\r\n",
            )
        );
        assert_eq!(conn.phase(), Phase::DataPayload);
    }

    #[test]
    fn quit_closes() {
        let (mut conn, mock) = connection("221 bye\r\n");

        assert!(conn.quit().unwrap().has_code(221));
        assert_eq!(conn.phase(), Phase::Closed);

        // no second QUIT
        conn.abort();
        assert_eq!(mock.written(), "QUIT\r\n");
    }
}
