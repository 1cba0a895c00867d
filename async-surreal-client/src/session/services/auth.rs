// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! Authentication and namespace selection. Successful auth results are
//! remembered so the session can be restored after a reconnect; tokens
//! never reach the logs.

use std::sync::Arc;

use surreal_core::messages::methods;
use surreal_types::{Error, Result, Value};

use crate::credentials::Credentials;
use crate::session::Session;

impl Session {
    /// Select the namespace and database for subsequent operations. The
    /// pair is remembered and replayed on session restore.
    pub async fn use_ns_db(&self, namespace: &str, database: &str) -> Result<()> {
        if namespace.is_empty() || database.is_empty() {
            return Err(Error::Validation(
                "namespace and database must not be empty".to_string(),
            ));
        }
        self.send_request(
            methods::USE,
            Some(vec![
                Value::Strand(namespace.to_string()),
                Value::Strand(database.to_string()),
            ]),
        )
        .await?;
        self.inner
            .selection
            .store(Some(Arc::new((namespace.to_string(), database.to_string()))));
        self.inner
            .transport
            .set_selection(Some((namespace, database)));
        Ok(())
    }

    /// Sign in with the given credentials, storing the returned token
    /// for the session restore hook. Returns the token.
    pub async fn signin(&self, credentials: Credentials) -> Result<String> {
        let result = self
            .send_request(methods::SIGNIN, Some(vec![credentials.into_value()]))
            .await?;
        self.accept_token(methods::SIGNIN, result)
    }

    /// Register and sign in with record-access credentials. Returns the
    /// token.
    pub async fn signup(&self, credentials: Credentials) -> Result<String> {
        if !credentials.is_record_access() {
            return Err(Error::Validation(
                "signup requires record-access credentials".to_string(),
            ));
        }
        let result = self
            .send_request(methods::SIGNUP, Some(vec![credentials.into_value()]))
            .await?;
        self.accept_token(methods::SIGNUP, result)
    }

    /// Authenticate with a previously issued token, and remember it for
    /// session restore.
    pub async fn authenticate(&self, token: &str) -> Result<()> {
        self.send_request(
            methods::AUTHENTICATE,
            Some(vec![Value::Strand(token.to_string())]),
        )
        .await?;
        self.store_token(Some(token));
        Ok(())
    }

    /// Invalidate the current authentication and forget the stored
    /// token.
    pub async fn invalidate(&self) -> Result<()> {
        self.send_request(methods::INVALIDATE, None).await?;
        self.store_token(None);
        Ok(())
    }

    /// An auth method must return a token string; anything else is an
    /// authentication error and the token state is left untouched.
    fn accept_token(&self, method: &str, result: Value) -> Result<String> {
        match result {
            Value::Strand(token) => {
                self.store_token(Some(&token));
                Ok(token)
            }
            other => Err(Error::Authentication(format!(
                "{method} returned {} instead of a token string",
                other.kind()
            ))),
        }
    }
}
