// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! Credential payloads for the authentication operations.
//!
//! The engine treats these as opaque: they convert to a wire value that
//! is passed to `signin`/`signup` verbatim. Credentials are never logged.

use surreal_types::{Object, Value};

/// The level a set of credentials authenticates at.
#[derive(Clone)]
pub enum Credentials {
    /// Root-level user.
    Root {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// Namespace-level user.
    Namespace {
        /// The namespace the user belongs to.
        namespace: String,
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// Database-level user.
    Database {
        /// The namespace the database lives in.
        namespace: String,
        /// The database the user belongs to.
        database: String,
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// Record-access credentials, used with `signin` and `signup`
    /// against an access method defined in the database.
    Record {
        /// The namespace the database lives in.
        namespace: String,
        /// The database the access method is defined in.
        database: String,
        /// The access method name.
        access: String,
        /// Parameters handed to the access method, e.g. email and
        /// password fields.
        params: Object,
    },
}

impl Credentials {
    /// Root-level credentials.
    pub fn root(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Root {
            username: username.into(),
            password: password.into(),
        }
    }

    /// True when these credentials can be used with `signup`, which only
    /// accepts record access.
    pub fn is_record_access(&self) -> bool {
        matches!(self, Credentials::Record { .. })
    }

    /// The wire value sent as the single parameter of the auth methods.
    pub(crate) fn into_value(self) -> Value {
        let mut map = Object::new();
        match self {
            Credentials::Root { username, password } => {
                map.insert("user".to_string(), Value::Strand(username));
                map.insert("pass".to_string(), Value::Strand(password));
            }
            Credentials::Namespace {
                namespace,
                username,
                password,
            } => {
                map.insert("ns".to_string(), Value::Strand(namespace));
                map.insert("user".to_string(), Value::Strand(username));
                map.insert("pass".to_string(), Value::Strand(password));
            }
            Credentials::Database {
                namespace,
                database,
                username,
                password,
            } => {
                map.insert("ns".to_string(), Value::Strand(namespace));
                map.insert("db".to_string(), Value::Strand(database));
                map.insert("user".to_string(), Value::Strand(username));
                map.insert("pass".to_string(), Value::Strand(password));
            }
            Credentials::Record {
                namespace,
                database,
                access,
                params,
            } => {
                map.insert("ns".to_string(), Value::Strand(namespace));
                map.insert("db".to_string(), Value::Strand(database));
                map.insert("ac".to_string(), Value::Strand(access));
                for (k, v) in params {
                    map.entry(k).or_insert(v);
                }
            }
        }
        Value::Object(map)
    }
}

// Credentials stay out of logs; only the variant name is printed.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self {
            Credentials::Root { .. } => "Root",
            Credentials::Namespace { .. } => "Namespace",
            Credentials::Database { .. } => "Database",
            Credentials::Record { .. } => "Record",
        };
        write!(f, "Credentials::{level}(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_credentials_use_wire_keys() {
        let value = Credentials::root("root", "secret").into_value();
        let obj = value.as_object().unwrap();
        assert_eq!(obj["user"], Value::Strand("root".into()));
        assert_eq!(obj["pass"], Value::Strand("secret".into()));
    }

    #[test]
    fn record_params_do_not_override_access_keys() {
        let mut params = Object::new();
        params.insert("ns".to_string(), Value::Strand("spoofed".into()));
        params.insert("email".to_string(), Value::Strand("a@b".into()));
        let value = Credentials::Record {
            namespace: "n".into(),
            database: "d".into(),
            access: "user".into(),
            params,
        }
        .into_value();
        let obj = value.as_object().unwrap();
        assert_eq!(obj["ns"], Value::Strand("n".into()));
        assert_eq!(obj["email"], Value::Strand("a@b".into()));
    }

    #[test]
    fn debug_never_prints_secrets() {
        let creds = Credentials::root("root", "hunter2");
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
