use std::borrow::Cow;

use url::Url;

use super::{
    authentication::Credentials,
    client::{Tls, TlsParameters},
    error,
    extension::ClientId,
    Error, SmtpTransportBuilder, SMTP_PORT, SUBMISSIONS_PORT, SUBMISSION_PORT,
};

/// Create a new `SmtpTransportBuilder` from a connection URL
pub(crate) fn from_connection_url(connection_url: &str) -> Result<SmtpTransportBuilder, Error> {
    let connection_url = Url::parse(connection_url).map_err(error::client)?;
    let tls: Option<String> = connection_url
        .query_pairs()
        .find(|(k, _)| k == "tls")
        .map(|(_, v)| v.into_owned());

    let host = connection_url
        .host_str()
        .ok_or_else(|| error::client("smtp host undefined"))?;

    let mut builder = SmtpTransportBuilder::new(host);

    match (connection_url.scheme(), tls.as_deref()) {
        ("smtp", None | Some("none")) => {
            builder = builder.port(connection_url.port().unwrap_or(SMTP_PORT));
        }
        ("smtp", Some("starttls")) => {
            builder = builder
                .port(connection_url.port().unwrap_or(SUBMISSION_PORT))
                .tls(Tls::StartTls(TlsParameters::new(host.into())?));
        }
        ("smtps", _) => {
            builder = builder
                .port(connection_url.port().unwrap_or(SUBMISSIONS_PORT))
                .tls(Tls::Wrapper(TlsParameters::new(host.into())?));
        }
        (scheme, tls) => {
            return Err(error::client(format!(
                "Unknown scheme '{scheme}' or tls parameter '{tls:?}'"
            )))
        }
    }

    // use the path segment of the URL as name in the EHLO command
    if connection_url.path().len() > 1 {
        let name = connection_url.path().trim_matches('/').to_owned();
        builder = builder.hello_name(ClientId::Domain(name));
    }

    if let Some(password) = connection_url.password() {
        let percent_decode = |s: &str| {
            percent_encoding::percent_decode_str(s)
                .decode_utf8()
                .map(Cow::into_owned)
                .map_err(error::client)
        };
        let credentials = Credentials::new(
            percent_decode(connection_url.username())?,
            percent_decode(password)?,
        );
        builder = builder.credentials(credentials);
    }

    Ok(builder)
}

#[cfg(test)]
mod test {
    use super::from_connection_url;

    #[test]
    fn unknown_scheme_or_tls() {
        assert!(from_connection_url("http://mail.example.com").is_err());
        assert!(from_connection_url("smtp://mail.example.com?tls=sometimes").is_err());
        assert!(from_connection_url("not a url").is_err());
    }
}
