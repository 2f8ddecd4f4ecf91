//! `multipart/alternative` body with a plain text and an HTML part

use std::fmt::Write;

/// Length of generated boundaries
const BOUNDARY_LENGTH: usize = 40;

/// Create a random MIME boundary.
pub(crate) fn make_boundary() -> String {
    std::iter::repeat_with(fastrand::alphanumeric)
        .take(BOUNDARY_LENGTH)
        .collect()
}

/// One part of an alternative body
#[derive(Debug, Clone, Copy)]
pub(crate) struct SinglePart<'a> {
    content_type: &'static str,
    body: &'a str,
}

impl<'a> SinglePart<'a> {
    pub(crate) fn plain(body: &'a str) -> Self {
        Self {
            content_type: "text/plain; charset=UTF-8",
            body,
        }
    }

    pub(crate) fn html(body: &'a str) -> Self {
        Self {
            content_type: "text/html; charset=UTF-8",
            body,
        }
    }

    fn format(&self, out: &mut String) {
        let _ = write!(out, "Content-Type: {}\r\n", self.content_type);
        out.push_str("Content-Transfer-Encoding: 8bit\r\n\r\n");
        push_crlf_normalized(out, self.body);
        out.push_str("\r\n\r\n");
    }
}

/// Writes `parts` delimited by `--boundary` lines and closed by `--boundary--`.
pub(crate) fn format_alternative(out: &mut String, boundary: &str, parts: &[SinglePart<'_>]) {
    for part in parts {
        let _ = write!(out, "--{boundary}\r\n");
        part.format(out);
    }
    let _ = write!(out, "--{boundary}--");
}

/// 8bit bodies must use CRLF line endings.
fn push_crlf_normalized(out: &mut String, body: &str) {
    let mut lines = body.split('\n').peekable();
    while let Some(line) = lines.next() {
        out.push_str(line.strip_suffix('\r').unwrap_or(line));
        if lines.peek().is_some() {
            out.push_str("\r\n");
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;

    use super::{format_alternative, make_boundary, SinglePart};

    #[test]
    fn test_make_boundary() {
        let mut boundaries = HashSet::with_capacity(10);
        for _ in 0..1000 {
            boundaries.insert(make_boundary());
        }

        // Ensure there are no duplicates
        assert_eq!(1000, boundaries.len());

        // Ensure correct length
        for boundary in boundaries {
            assert_eq!(40, boundary.len());
            assert!(boundary.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn alternative_layout() {
        let mut out = String::new();
        format_alternative(
            &mut out,
            "XYZ",
            &[SinglePart::plain("Hello"), SinglePart::html("<p>Hello</p>")],
        );

        assert_eq!(
            out,
            concat!(
                "--XYZ\r\n",
                "Content-Type: text/plain; charset=UTF-8\r\n",
                "Content-Transfer-Encoding: 8bit\r\n",
                "\r\n",
                "Hello\r\n",
                "\r\n",
                "--XYZ\r\n",
                "Content-Type: text/html; charset=UTF-8\r\n",
                "Content-Transfer-Encoding: 8bit\r\n",
                "\r\n",
                "<p>Hello</p>\r\n",
                "\r\n",
                "--XYZ--"
            )
        );
    }

    #[test]
    fn bare_line_feeds_become_crlf() {
        let mut out = String::new();
        format_alternative(&mut out, "B", &[SinglePart::plain("one\ntwo\r\nthree")]);
        assert!(out.contains("one\r\ntwo\r\nthree\r\n\r\n--B--"));
    }
}
