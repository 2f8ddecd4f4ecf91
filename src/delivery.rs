//! Delivery orchestration
//!
//! A [`Dispatcher`] tries the SMTP relay first and falls back to local submission
//! once when it fails. Callers never see an error, only a [`DeliveryResult`].

use std::fmt::{self, Display, Formatter};

use crate::{
    diagnostic::DiagnosticLog,
    transport::{Mailer, SessionTranscript},
    Message, Transport,
};

/// Which sink accepted the message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    /// The SMTP relay
    Smtp,
    /// The local sendmail command
    LocalSubmission,
}

impl Display for Sink {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sink::Smtp => "smtp",
            Sink::LocalSubmission => "local submission",
        })
    }
}

/// Outcome of [`Dispatcher::deliver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResult {
    /// One of the sinks accepted the message
    pub succeeded: bool,
    /// The sink that accepted it
    pub sink: Option<Sink>,
    /// Failure details, only filled in debug mode
    ///
    /// Never contains credentials or the session transcript, which only goes to the
    /// diagnostic log.
    pub diagnostic: String,
}

/// Sends a message through SMTP, with local submission as the fallback
#[derive(Debug, Clone)]
pub struct Dispatcher<T = Mailer> {
    smtp: Option<T>,
    local: T,
    log: Option<DiagnosticLog>,
    debug: bool,
    acknowledge: bool,
}

impl<T> Dispatcher<T>
where
    T: Transport + Display,
    T::Error: Display + SessionTranscript,
{
    /// Creates a dispatcher, SMTP is disabled when `smtp` is `None`
    pub fn new(smtp: Option<T>, local: T) -> Self {
        Dispatcher {
            smtp,
            local,
            log: None,
            debug: false,
            acknowledge: true,
        }
    }

    /// Writes delivery events to a diagnostic log
    pub fn with_log(mut self, log: DiagnosticLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Attach failure details to results
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Send the acknowledgement passed to [`Dispatcher::deliver`], on by default
    pub fn acknowledge(mut self, acknowledge: bool) -> Self {
        self.acknowledge = acknowledge;
        self
    }

    /// Delivers `message`, then `acknowledgement` when there is one
    ///
    /// The acknowledgement only goes out once `message` was accepted, always through
    /// local submission, and its failure does not change the result. It is dropped
    /// when acknowledgements are turned off.
    pub fn deliver(&self, message: &Message, acknowledgement: Option<&Message>) -> DeliveryResult {
        let mut failures = Vec::new();

        let sink = match &self.smtp {
            Some(smtp) => match smtp.send(message) {
                Ok(_) => {
                    tracing::info!(relay = %smtp, to = %message.to(), "email sent over SMTP");
                    Some(Sink::Smtp)
                }
                Err(err) => {
                    tracing::warn!(relay = %smtp, "SMTP delivery failed: {err}");
                    self.record(&format!(
                        "SMTP error: Failed to send email to {} via {smtp}: {err}",
                        message.to()
                    ));
                    failures.push(format!("SMTP {smtp}: {err}"));
                    self.record_transcript(&err);

                    self.record("Attempting fallback to local submission");
                    match self.local.send(message) {
                        Ok(_) => {
                            tracing::info!(to = %message.to(), "fallback local submission succeeded");
                            self.record("Fallback local submission succeeded");
                            Some(Sink::LocalSubmission)
                        }
                        Err(err) => {
                            tracing::warn!("fallback local submission failed: {err}");
                            self.record("Fallback local submission also failed");
                            failures.push(format!("{}: {err}", self.local));
                            None
                        }
                    }
                }
            },
            None => match self.local.send(message) {
                Ok(_) => {
                    tracing::info!(to = %message.to(), "email sent by local submission");
                    Some(Sink::LocalSubmission)
                }
                Err(err) => {
                    tracing::warn!("local submission failed: {err}");
                    self.record(&format!(
                        "Local submission error: Failed to send email to {}: {err}",
                        message.to()
                    ));
                    failures.push(format!("{}: {err}", self.local));
                    None
                }
            },
        };

        if let (Some(_), Some(acknowledgement), true) =
            (sink, acknowledgement, self.acknowledge)
        {
            if let Err(err) = self.local.send(acknowledgement) {
                tracing::warn!(to = %acknowledgement.to(), "auto-reply failed: {err}");
                self.record(&format!(
                    "Auto-reply to {} failed: {err}",
                    acknowledgement.to()
                ));
            }
        }

        if sink.is_none() {
            let summary = match &self.smtp {
                Some(smtp) => format!("Failed to send email. SMTP: {smtp}"),
                None => "Failed to send email.".to_owned(),
            };
            tracing::warn!("{summary}");
            self.record(&summary);
        }

        DeliveryResult {
            succeeded: sink.is_some(),
            sink,
            diagnostic: if self.debug && sink.is_none() {
                failures.join("; ")
            } else {
                String::new()
            },
        }
    }

    fn record_transcript(&self, err: &T::Error) {
        let transcript = err.transcript();
        if transcript.is_empty() {
            return;
        }
        let session = transcript
            .iter()
            .map(ToString::to_string)
            .collect::<String>();
        self.record(&format!("SMTP transcript: {}", session.trim_end()));
    }

    fn record(&self, line: &str) {
        if let Some(log) = &self.log {
            log.record(line);
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, SystemTime};

    use pretty_assertions::assert_eq;

    use super::{Dispatcher, Sink};
    use crate::{
        message::header::Date, transport::stub::StubTransport, DiagnosticLog, Message,
    };

    fn message(to: &str) -> Message {
        Message::builder()
            .from("Contact Form", "noreply@example.com".parse().unwrap())
            .to(to.parse().unwrap())
            .subject("[Contact Form] Other - Jane")
            .html("<p>Hello</p>")
            .date(Date::from(SystemTime::UNIX_EPOCH + Duration::from_secs(1)))
            .build()
            .unwrap()
    }

    #[test]
    fn smtp_success_skips_fallback() {
        let smtp = StubTransport::new_ok().named("mail.example.com:587");
        let local = StubTransport::new_ok();
        let dispatcher = Dispatcher::new(Some(smtp.clone()), local.clone());

        let result = dispatcher.deliver(&message("sales@example.com"), None);

        assert!(result.succeeded);
        assert_eq!(result.sink, Some(Sink::Smtp));
        assert_eq!(smtp.attempts(), 1);
        assert_eq!(local.attempts(), 0);
    }

    #[test]
    fn smtp_failure_falls_back_once() {
        let smtp = StubTransport::new_error().named("mail.example.com:587");
        let local = StubTransport::new_ok();
        let dispatcher = Dispatcher::new(Some(smtp.clone()), local.clone());

        let result = dispatcher.deliver(&message("sales@example.com"), None);

        assert!(result.succeeded);
        assert_eq!(result.sink, Some(Sink::LocalSubmission));
        assert_eq!(smtp.attempts(), 1);
        assert_eq!(local.attempts(), 1);
        assert_eq!(result.diagnostic, "");
    }

    #[test]
    fn smtp_disabled() {
        let local = StubTransport::new_ok();
        let dispatcher = Dispatcher::new(None, local.clone());

        let result = dispatcher.deliver(&message("sales@example.com"), None);

        assert_eq!(result.sink, Some(Sink::LocalSubmission));
        assert_eq!(local.attempts(), 1);
    }

    #[test]
    fn total_failure_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let log = DiagnosticLog::new(dir.path().join("contact_errors.log"));
        let smtp = StubTransport::new_error().named("mail.example.com:587");
        let local = StubTransport::new_error().named("sendmail");
        let dispatcher = Dispatcher::new(Some(smtp), local)
            .with_log(log.clone())
            .debug(true);

        let result = dispatcher.deliver(&message("sales@example.com"), None);

        assert!(!result.succeeded);
        assert_eq!(result.sink, None);
        assert_eq!(
            result.diagnostic,
            "SMTP mail.example.com:587: stub error; sendmail: stub error"
        );

        let content = std::fs::read_to_string(log.path()).unwrap();
        let messages = content
            .lines()
            .map(|line| line.split_once("] ").unwrap().1)
            .collect::<Vec<_>>();
        assert_eq!(
            messages,
            vec![
                "SMTP error: Failed to send email to sales@example.com via mail.example.com:587: stub error",
                "Attempting fallback to local submission",
                "Fallback local submission also failed",
                "Failed to send email. SMTP: mail.example.com:587",
            ]
        );
    }

    #[test]
    fn diagnostic_needs_debug_mode() {
        let dispatcher = Dispatcher::new(None, StubTransport::new_error());
        let result = dispatcher.deliver(&message("sales@example.com"), None);
        assert!(!result.succeeded);
        assert_eq!(result.diagnostic, "");
    }

    #[test]
    fn acknowledgement_after_success_only() {
        let smtp = StubTransport::new_ok();
        let local = StubTransport::new_ok();
        let dispatcher = Dispatcher::new(Some(smtp.clone()), local.clone());
        let ack = message("visitor@example.org");

        dispatcher.deliver(&message("sales@example.com"), Some(&ack));

        // the acknowledgement goes through local submission
        let sent = local.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.to().to_string(), "visitor@example.org");
        assert_eq!(smtp.attempts(), 1);

        let failing = Dispatcher::new(None, StubTransport::new_error());
        let result = failing.deliver(&message("sales@example.com"), Some(&ack));
        assert!(!result.succeeded);
    }

    #[test]
    fn acknowledgement_turned_off() {
        let local = StubTransport::new_ok();
        let dispatcher = Dispatcher::new(None, local.clone()).acknowledge(false);
        let ack = message("visitor@example.org");

        let result = dispatcher.deliver(&message("sales@example.com"), Some(&ack));

        assert!(result.succeeded);
        let sent = local.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.to().to_string(), "sales@example.com");
    }

    #[test]
    fn failed_acknowledgement_keeps_success() {
        let smtp = StubTransport::new_ok();
        let local = StubTransport::new_error();
        let dispatcher = Dispatcher::new(Some(smtp), local.clone());
        let ack = message("visitor@example.org");

        let result = dispatcher.deliver(&message("sales@example.com"), Some(&ack));

        assert!(result.succeeded);
        assert_eq!(result.sink, Some(Sink::Smtp));
        // never retried
        assert_eq!(local.attempts(), 1);
    }
}
