//! SMTP replies: reading them off the wire and parsing their status code

use std::{
    fmt::{self, Display, Formatter},
    io::{self, BufRead},
    str::FromStr,
};

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{one_of, satisfy},
    combinator::{opt, value},
    IResult, Parser,
};

/// The first digit indicates severity
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Severity {
    /// 2yx
    PositiveCompletion = 2,
    /// 3yz
    PositiveIntermediate = 3,
    /// 4yz
    TransientNegativeCompletion = 4,
    /// 5yz
    PermanentNegativeCompletion = 5,
}

/// Second digit
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Category {
    /// x0z
    Syntax = 0,
    /// x1z
    Information = 1,
    /// x2z
    Connections = 2,
    /// x3z
    Unspecified3 = 3,
    /// x4z
    Unspecified4 = 4,
    /// x5z
    MailSystem = 5,
}

/// Represents a 3 digit SMTP response code
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct Code {
    /// First digit of the response code
    pub severity: Severity,
    /// Second digit of the response code
    pub category: Category,
    /// Third digit, `0` to `9`
    pub detail: u8,
}

impl Code {
    /// Tells if the response is positive
    pub fn is_positive(self) -> bool {
        matches!(
            self.severity,
            Severity::PositiveCompletion | Severity::PositiveIntermediate
        )
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u16::from(*self))
    }
}

impl From<Code> for u16 {
    fn from(code: Code) -> Self {
        u16::from(code.detail) + 10 * code.category as u16 + 100 * code.severity as u16
    }
}

/// A reply as read from the server
///
/// `last` is the trimmed final status line, `full` every line read, line endings
/// included. When nothing could be read both are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    last: String,
    full: String,
    interrupted: Option<io::ErrorKind>,
}

impl Reply {
    /// The final status line, trimmed
    pub fn last(&self) -> &str {
        &self.last
    }

    /// All the lines of the reply
    pub fn full(&self) -> &str {
        &self.full
    }

    /// Nothing usable was received
    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }

    /// The I/O error that stopped reading, if any
    ///
    /// A read timeout shows up as [`io::ErrorKind::WouldBlock`] or
    /// [`io::ErrorKind::TimedOut`] depending on the platform.
    pub fn io_error(&self) -> Option<io::ErrorKind> {
        self.interrupted
    }

    /// Parses the status line, together with the text of every line
    pub fn response(&self) -> Option<Response> {
        let mut response = self.last.parse::<Response>().ok()?;
        response.message = self
            .full
            .lines()
            .map(|line| line.get(4..).unwrap_or_default().trim_end().to_owned())
            .collect();
        Some(response)
    }

    /// Appends a line and tells whether it ends the reply
    fn push_line(&mut self, raw: &[u8]) -> bool {
        let line = String::from_utf8_lossy(raw);
        self.full.push_str(&line);
        line.trim().clone_into(&mut self.last);

        // `250-` announces more lines, `250 ` or a bare `250` is the last one
        self.last.as_bytes().get(3) != Some(&b'-')
    }
}

impl Display for Reply {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("no response")
        } else {
            f.write_str(&self.last)
        }
    }
}

/// Reads one complete, possibly multi-line, reply
///
/// Reading stops at the end of the reply, at end of input or at the first I/O
/// error, including a read timeout. What was read until then is returned.
pub fn read_reply<R: BufRead>(reader: &mut R) -> Reply {
    let mut reply = Reply::default();
    let mut line = Vec::with_capacity(128);

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {
                if reply.push_line(&line) {
                    break;
                }
            }
            Err(err) => {
                if !line.is_empty() {
                    reply.push_line(&line);
                }
                reply.interrupted = Some(err.kind());
                break;
            }
        }
    }

    reply
}

/// Contains an SMTP reply, with separated code and message
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Response {
    /// Response code
    code: Code,
    /// Text of each line of the reply
    message: Vec<String>,
}

impl Response {
    /// Creates a new `Response`
    pub fn new(code: Code, message: Vec<String>) -> Response {
        Response { code, message }
    }

    /// Tells if the response is positive
    pub fn is_positive(&self) -> bool {
        self.code.is_positive()
    }

    /// Tests code equality
    pub fn has_code(&self, code: u16) -> bool {
        u16::from(self.code) == code
    }

    /// Returns only the first line of the message if possible
    pub fn first_line(&self) -> Option<&str> {
        self.message.first().map(String::as_str)
    }

    /// Response code
    pub fn code(&self) -> Code {
        self.code
    }

    /// Server response string (array of lines)
    pub fn message(&self) -> impl Iterator<Item = &str> {
        self.message.iter().map(String::as_str)
    }
}

impl FromStr for Response {
    type Err = ParseResponseError;

    /// Parses a single status line such as `250 OK`
    fn from_str(s: &str) -> Result<Response, ParseResponseError> {
        parse_status_line(s.trim())
            .map(|(_, response)| response)
            .map_err(|_| ParseResponseError)
    }
}

/// The line does not start with a reply code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseResponseError;

impl Display for ParseResponseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("invalid reply code")
    }
}

impl std::error::Error for ParseResponseError {}

fn parse_severity(i: &str) -> IResult<&str, Severity> {
    alt((
        value(Severity::PositiveCompletion, tag("2")),
        value(Severity::PositiveIntermediate, tag("3")),
        value(Severity::TransientNegativeCompletion, tag("4")),
        value(Severity::PermanentNegativeCompletion, tag("5")),
    ))
    .parse(i)
}

fn parse_category(i: &str) -> IResult<&str, Category> {
    alt((
        value(Category::Syntax, tag("0")),
        value(Category::Information, tag("1")),
        value(Category::Connections, tag("2")),
        value(Category::Unspecified3, tag("3")),
        value(Category::Unspecified4, tag("4")),
        value(Category::MailSystem, tag("5")),
    ))
    .parse(i)
}

fn parse_detail(i: &str) -> IResult<&str, u8> {
    satisfy(|c| c.is_ascii_digit())
        .map(|c| c as u8 - b'0')
        .parse(i)
}

fn parse_code(i: &str) -> IResult<&str, Code> {
    (parse_severity, parse_category, parse_detail)
        .map(|(severity, category, detail)| Code {
            severity,
            category,
            detail,
        })
        .parse(i)
}

fn parse_status_line(i: &str) -> IResult<&str, Response> {
    let (i, code) = parse_code(i)?;
    let (i, separator) = opt(one_of(" -")).parse(i)?;
    if separator.is_none() && !i.is_empty() {
        // `2500` is not a reply code
        return Err(nom::Err::Error(nom::error::Error::new(
            i,
            nom::error::ErrorKind::Char,
        )));
    }

    Ok((
        "",
        Response {
            code,
            message: vec![i.trim().to_owned()],
        },
    ))
}
