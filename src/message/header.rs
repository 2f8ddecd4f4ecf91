//! Header values written by the composer
// https://tools.ietf.org/html/rfc5322#section-3.6

use std::{
    fmt::{self, Display, Formatter, Write},
    time::{SystemTime, UNIX_EPOCH},
};

use base64::{engine::general_purpose::STANDARD, Engine};
use httpdate::HttpDate;
use sha2::{Digest, Sha256};

use super::error::Error;
use crate::address::Address;

/// Value of the `X-Mailer` header
pub(crate) const MAILER: &str = concat!("contact-mailer/", env!("CARGO_PKG_VERSION"));

/// Message `Date` header
///
/// Defined in [RFC2822](https://tools.ietf.org/html/rfc2822#section-3.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date(HttpDate);

impl Date {
    /// Build a `Date` from [`SystemTime`]
    pub fn new(st: SystemTime) -> Self {
        Self(st.into())
    }

    /// Get the current date
    pub fn now() -> Self {
        Self::new(SystemTime::now())
    }
}

impl Display for Date {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = self.0.to_string();
        // `GMT` is the obsolete zone form for email, see
        // https://tools.ietf.org/html/rfc2822#appendix-A.6.2
        match s.strip_suffix("GMT") {
            Some(stripped) => write!(f, "{stripped}-0000"),
            None => f.write_str(&s),
        }
    }
}

impl From<SystemTime> for Date {
    fn from(st: SystemTime) -> Self {
        Self::new(st)
    }
}

impl From<Date> for SystemTime {
    fn from(this: Date) -> SystemTime {
        this.0.into()
    }
}

/// Builds `<unix-seconds.digest@sender-domain>`, the digest covering recipient and subject.
pub(crate) fn make_message_id(at: SystemTime, to: &Address, subject: &str, from: &Address) -> String {
    let seconds = at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let digest = Sha256::new()
        .chain_update(to.to_string())
        .chain_update(subject)
        .finalize();

    let mut hash = String::with_capacity(32);
    for byte in &digest[..16] {
        let _ = write!(hash, "{byte:02x}");
    }

    format!("<{seconds}.{hash}@{}>", from.domain())
}

fn allowed_char(c: char) -> bool {
    c >= 1 as char && c <= 9 as char
        || c == 11 as char
        || c == 12 as char
        || c >= 14 as char && c <= 127 as char
}

/// Writes non-ASCII text as an RFC 2047 `utf-8` base64 encoded word.
pub(crate) fn encode_word(s: &str) -> String {
    if s.chars().all(allowed_char) {
        s.into()
    } else {
        format!("=?utf-8?b?{}?=", STANDARD.encode(s))
    }
}

/// Formats a display name for a mailbox, quoting it when it contains specials.
pub(crate) fn display_name(name: &str) -> String {
    const SPECIALS: &[char] = &['(', ')', '<', '>', '[', ']', ':', ';', '@', '\\', ',', '.', '"'];

    if !name.is_ascii() {
        return encode_word(name);
    }

    if name.contains(SPECIALS) {
        let mut quoted = String::with_capacity(name.len() + 2);
        quoted.push('"');
        for c in name.chars() {
            if c == '"' || c == '\\' {
                quoted.push('\\');
            }
            quoted.push(c);
        }
        quoted.push('"');
        quoted
    } else {
        name.to_owned()
    }
}

/// Rejects values that would end the header early.
pub(crate) fn check_value(name: &'static str, value: &str) -> Result<(), Error> {
    if value.contains(['\r', '\n']) {
        Err(Error::LineBreakInHeader(name))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, SystemTime};

    use pretty_assertions::assert_eq;

    use super::{check_value, display_name, encode_word, make_message_id, Date};
    use crate::message::error::Error;

    #[test]
    fn format_date() {
        // Tue, 15 Nov 1994 08:12:31 GMT
        let date = Date::from(SystemTime::UNIX_EPOCH + Duration::from_secs(784887151));
        assert_eq!(date.to_string(), "Tue, 15 Nov 1994 08:12:31 -0000");
    }

    #[test]
    fn message_id_shape() {
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let id = make_message_id(
            at,
            &"sales@example.com".parse().unwrap(),
            "Hello",
            &"noreply@mydharm.example".parse().unwrap(),
        );

        assert!(id.starts_with("<1700000000."));
        assert!(id.ends_with("@mydharm.example>"));
        let hash = &id["<1700000000.".len()..id.len() - "@mydharm.example>".len()];
        assert_eq!(hash.len(), 32);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn message_id_depends_on_subject() {
        let at = SystemTime::UNIX_EPOCH;
        let to = "sales@example.com".parse().unwrap();
        let from = "noreply@example.com".parse().unwrap();
        assert_ne!(
            make_message_id(at, &to, "first", &from),
            make_message_id(at, &to, "second", &from)
        );
    }

    #[test]
    fn encoded_words() {
        assert_eq!(&encode_word("Kayo. ?"), "Kayo. ?");
        assert_eq!(
            &encode_word("Привет, мир!"),
            "=?utf-8?b?0J/RgNC40LLQtdGCLCDQvNC40YAh?="
        );
    }

    #[test]
    fn display_names() {
        assert_eq!(display_name("Contact Form"), "Contact Form");
        assert_eq!(display_name("Doe, Jane"), "\"Doe, Jane\"");
        assert_eq!(display_name("say \"hi\""), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn line_breaks_are_rejected() {
        assert_eq!(check_value("Subject", "fine"), Ok(()));
        assert_eq!(
            check_value("Subject", "Hi\r\nBcc: x@example.com"),
            Err(Error::LineBreakInHeader("Subject"))
        );
    }
}
