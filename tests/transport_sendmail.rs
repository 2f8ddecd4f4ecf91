#[cfg(unix)]
mod test {
    use std::{
        fs,
        os::unix::fs::PermissionsExt,
        path::{Path, PathBuf},
    };

    use contact_mailer::{Message, SendmailTransport, Transport};
    use pretty_assertions::assert_eq;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    // All scripts are written before either runs, forked children could otherwise
    // inherit a write handle and fail with "text file busy".
    #[test]
    fn sendmail_transport() {
        let dir = tempfile::tempdir().unwrap();
        let args = dir.path().join("args");
        let stdin = dir.path().join("stdin");
        let accepting = script(
            dir.path(),
            "sendmail",
            &format!(
                "printf '%s\\n' \"$@\" > '{}'\ncat > '{}'",
                args.display(),
                stdin.display()
            ),
        );
        let refusing = script(
            dir.path(),
            "sendmail-down",
            "cat > /dev/null\necho 'sendmail: cannot connect to queue' >&2\nexit 75",
        );
        let early_exit = script(
            dir.path(),
            "sendmail-full",
            "echo 'sendmail: queue full' >&2\nexit 75",
        );

        let email = Message::builder()
            .from("Contact Form", "noreply@example.com".parse().unwrap())
            .to("sales@example.com".parse().unwrap())
            .reply_to("jane@visitor.example".parse().unwrap())
            .subject("[Contact Form] Other - Jane")
            .html("<p>Hello</p>")
            .build()
            .unwrap();

        SendmailTransport::new_with_command(&accepting)
            .send(&email)
            .unwrap();

        assert_eq!(
            fs::read_to_string(&args).unwrap(),
            "-i\n-f\nnoreply@example.com\nsales@example.com\n"
        );
        let piped = fs::read_to_string(&stdin).unwrap();
        assert!(piped.starts_with(
            "To: <sales@example.com>\r\nFrom: Contact Form <noreply@example.com>\r\n"
        ));
        assert_eq!(piped.matches("To: <sales@example.com>").count(), 1);
        assert!(piped.contains("Subject: [Contact Form] Other - Jane\r\n"));

        let err = SendmailTransport::new_with_command(&refusing)
            .send(&email)
            .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("sendmail: cannot connect to queue"));

        // larger than a pipe buffer, so the write fails once the command is gone
        let large = Message::builder()
            .from("Contact Form", "noreply@example.com".parse().unwrap())
            .to("sales@example.com".parse().unwrap())
            .subject("[Contact Form] Other - Jane")
            .html(format!("<p>{}</p>", "lorem ipsum ".repeat(40_000)))
            .build()
            .unwrap();
        let err = SendmailTransport::new_with_command(&early_exit)
            .send(&large)
            .unwrap_err();
        assert!(err.to_string().starts_with("sendmail: queue full"));
    }
}
