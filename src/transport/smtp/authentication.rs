//! `AUTH LOGIN` credentials

use std::fmt::{self, Debug, Formatter};

use base64::{engine::general_purpose::STANDARD, Engine};

/// Contains user credentials
///
/// Neither field is ever printed, including by `Debug`.
#[derive(PartialEq, Eq, Clone, Hash)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Create a `Credentials` struct from username and password
    pub fn new(username: String, password: String) -> Credentials {
        Credentials { username, password }
    }

    /// Answer to the `Username:` challenge
    pub(crate) fn login_username(&self) -> String {
        format!("{}\r\n", STANDARD.encode(&self.username))
    }

    /// Answer to the `Password:` challenge
    pub(crate) fn login_password(&self) -> String {
        format!("{}\r\n", STANDARD.encode(&self.password))
    }
}

impl<S, T> From<(S, T)> for Credentials
where
    S: Into<String>,
    T: Into<String>,
{
    fn from((username, password): (S, T)) -> Self {
        Credentials::new(username.into(), password.into())
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}
