//! Bearer credentials for the upstream APIs.

use std::fmt;

use reqwest::RequestBuilder;

/// Upstream credential sent as `Authorization: Bearer ...`. `Debug` never prints it.
#[derive(Clone)]
pub struct Token(String);

impl Token {
    /// Wrap a secret, trimming surrounding whitespace left by `.env` files.
    pub fn new(secret: impl AsRef<str>) -> Self {
        Self(secret.as_ref().trim().to_owned())
    }

    /// Attach the credential to an outgoing request.
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.0)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&"<redacted>").finish()
    }
}
