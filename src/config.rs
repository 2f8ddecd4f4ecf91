//! Delivery settings
//!
//! Settings are read from TOML and then overridden by environment variables:
//!
//! | variable           | field             |
//! |--------------------|-------------------|
//! | `SMTP_HOST`        | `smtp_host`       |
//! | `SMTP_PORT`        | `smtp_port`       |
//! | `SMTP_USERNAME`    | `smtp_username`   |
//! | `SMTP_PASSWORD`    | `smtp_password`   |
//! | `SMTP_ENCRYPTION`  | `smtp_encryption` |
//! | `CONTACT_LOG_FILE` | `log_file`        |
//!
//! The same variables can come from a `.env` file of `KEY=VALUE` lines, see
//! [`read_env_file`].
//!
//! ```rust
//! use contact_mailer::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_toml_str(
//!     r#"
//!     recipient_email = "sales@example.com"
//!     from_email = "noreply@example.com"
//!     smtp_host = "mail.example.com"
//!     smtp_encryption = "ssl"
//!     smtp_port = 465
//!     "#,
//! )?;
//! let dispatcher = config.dispatcher()?;
//! # Ok(())
//! # }
//! ```

use std::{
    collections::HashMap,
    error::Error as StdError,
    fmt::{self, Display, Formatter},
    fs, io,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use serde::Deserialize;

use crate::{
    address::{Address, AddressError},
    delivery::Dispatcher,
    diagnostic::DiagnosticLog,
    message::Mailbox,
    transport::{
        sendmail::SendmailTransport,
        smtp::{self, authentication::Credentials, SmtpTransport, SUBMISSION_PORT},
        Mailer,
    },
};

/// How the SMTP connection is secured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Encryption {
    /// Plain connection upgraded with `STARTTLS`
    #[default]
    #[serde(alias = "starttls")]
    Tls,
    /// TLS from the first byte
    Ssl,
    /// No encryption
    None,
}

impl FromStr for Encryption {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tls" | "starttls" => Ok(Encryption::Tls),
            "ssl" => Ok(Encryption::Ssl),
            "none" | "" => Ok(Encryption::None),
            other => Err(Error::Invalid {
                field: "smtp_encryption",
                reason: format!("unknown value '{other}'"),
            }),
        }
    }
}

/// Delivery settings
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where form submissions are sent
    pub recipient_email: String,
    /// Sender address
    pub from_email: String,
    /// Sender display name
    pub from_name: String,
    /// Send the visitor an acknowledgement after a successful delivery
    pub send_copy_to_sender: bool,
    /// Try SMTP before local submission
    pub smtp_enabled: bool,
    /// SMTP relay host
    pub smtp_host: String,
    /// SMTP relay port
    pub smtp_port: u16,
    /// `AUTH LOGIN` username, empty to skip authentication
    pub smtp_username: String,
    /// `AUTH LOGIN` password
    pub smtp_password: String,
    /// Connection security
    pub smtp_encryption: Encryption,
    /// Connect, read and write timeout in seconds
    pub timeout_secs: u64,
    /// Local submission command
    pub sendmail_command: Option<PathBuf>,
    /// Diagnostic log file
    pub log_file: Option<PathBuf>,
    /// Attach failure details to delivery results
    pub debug_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            recipient_email: String::new(),
            from_email: String::new(),
            from_name: String::new(),
            send_copy_to_sender: false,
            smtp_enabled: true,
            smtp_host: "localhost".to_owned(),
            smtp_port: SUBMISSION_PORT,
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_encryption: Encryption::Tls,
            timeout_secs: smtp::DEFAULT_TIMEOUT.as_secs(),
            sendmail_command: None,
            log_file: None,
            debug_mode: false,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let password = if self.smtp_password.is_empty() {
            ""
        } else {
            "********"
        };

        f.debug_struct("Config")
            .field("recipient_email", &self.recipient_email)
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .field("send_copy_to_sender", &self.send_copy_to_sender)
            .field("smtp_enabled", &self.smtp_enabled)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &password)
            .field("smtp_encryption", &self.smtp_encryption)
            .field("timeout_secs", &self.timeout_secs)
            .field("sendmail_command", &self.sendmail_command)
            .field("log_file", &self.log_file)
            .field("debug_mode", &self.debug_mode)
            .finish()
    }
}

impl Config {
    /// Parses settings from TOML, missing fields take their default
    pub fn from_toml_str(s: &str) -> Result<Config, Error> {
        toml::from_str(s).map_err(Error::Toml)
    }

    /// Reads a TOML file, then applies the process environment
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
        let mut config = Config::from_toml_str(&fs::read_to_string(path)?)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Applies overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), Error> {
        self.apply_vars(std::env::vars())
    }

    /// Applies overrides from `KEY=VALUE` pairs
    ///
    /// Unknown keys are ignored.
    pub fn apply_vars<I, K, V>(&mut self, vars: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let value = value.into();
            match key.as_ref() {
                "SMTP_HOST" => self.smtp_host = value,
                "SMTP_PORT" => {
                    self.smtp_port = value.trim().parse().map_err(|_| Error::Invalid {
                        field: "smtp_port",
                        reason: format!("'{value}' is not a port number"),
                    })?;
                }
                "SMTP_USERNAME" => self.smtp_username = value,
                "SMTP_PASSWORD" => self.smtp_password = value,
                "SMTP_ENCRYPTION" => self.smtp_encryption = value.parse()?,
                "CONTACT_LOG_FILE" => self.log_file = Some(PathBuf::from(value)),
                _ => {}
            }
        }
        Ok(())
    }

    /// Where form submissions are sent
    pub fn recipient(&self) -> Result<Address, Error> {
        parse_address("recipient_email", &self.recipient_email)
    }

    /// The sender mailbox, named when `from_name` is set
    pub fn sender(&self) -> Result<Mailbox, Error> {
        let email = parse_address("from_email", &self.from_email)?;
        let name = Some(self.from_name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_owned);
        Ok(Mailbox::new(name, email))
    }

    /// Connect, read and write timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Builds the SMTP transport, `None` when SMTP is disabled
    pub fn smtp_transport(&self) -> Result<Option<SmtpTransport>, Error> {
        if !self.smtp_enabled {
            return Ok(None);
        }

        let host = self.smtp_host.as_str();
        let builder = match self.smtp_encryption {
            Encryption::Tls => SmtpTransport::starttls_relay(host)?,
            Encryption::Ssl => SmtpTransport::relay(host)?,
            Encryption::None => SmtpTransport::builder_dangerous(host),
        };
        let mut builder = builder
            .port(self.smtp_port)
            .timeout(Some(self.timeout()));

        if !self.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.smtp_username.clone(),
                self.smtp_password.clone(),
            ));
        }

        Ok(Some(builder.build()))
    }

    /// Builds the local submission transport
    pub fn sendmail_transport(&self) -> SendmailTransport {
        self.sendmail_command
            .as_ref()
            .map_or_else(SendmailTransport::new, SendmailTransport::new_with_command)
    }

    /// Builds the delivery orchestrator
    pub fn dispatcher(&self) -> Result<Dispatcher, Error> {
        let smtp = self.smtp_transport()?.map(Mailer::Smtp);
        let local = Mailer::LocalSubmission(self.sendmail_transport());

        let mut dispatcher = Dispatcher::new(smtp, local)
            .debug(self.debug_mode)
            .acknowledge(self.send_copy_to_sender);
        if let Some(log_file) = &self.log_file {
            dispatcher = dispatcher.with_log(DiagnosticLog::new(log_file));
        }
        Ok(dispatcher)
    }
}

fn parse_address(field: &'static str, value: &str) -> Result<Address, Error> {
    value.parse().map_err(|err: AddressError| Error::Invalid {
        field,
        reason: err.to_string(),
    })
}

/// Reads `KEY=VALUE` lines from a `.env` file
///
/// Blank lines and lines starting with `#` are skipped. Keys and values are trimmed
/// and one pair of matching single or double quotes around a value is removed. A
/// missing file yields no variables.
pub fn read_env_file<P: AsRef<Path>>(path: P) -> Result<HashMap<String, String>, Error> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(parse_env(&content)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(err) => Err(Error::Io(err)),
    }
}

fn parse_env(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_owned(), unquote(value.trim()).to_owned()))
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Configuration error
#[derive(Debug)]
pub enum Error {
    /// The file could not be read
    Io(io::Error),
    /// The file is not valid TOML for these settings
    Toml(toml::de::Error),
    /// A setting has an unusable value
    Invalid {
        /// Setting name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
    /// The SMTP transport could not be built
    Smtp(smtp::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "could not read configuration: {err}"),
            Error::Toml(err) => write!(f, "invalid configuration: {err}"),
            Error::Invalid { field, reason } => write!(f, "invalid {field}: {reason}"),
            Error::Smtp(err) => err.fmt(f),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Toml(err) => Some(err),
            Error::Smtp(err) => Some(err),
            Error::Invalid { .. } => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<smtp::Error> for Error {
    fn from(err: smtp::Error) -> Self {
        Error::Smtp(err)
    }
}
