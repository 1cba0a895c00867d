// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! Endpoint URL handling for the two transports.

use url::Url;

use surreal_types::{Error, Result};

/// Parse and normalize a persistent-transport endpoint.
///
/// Accepts `ws://` and `wss://` URLs; an empty or `/` path is rewritten
/// to `/rpc`, which is where the server mounts its RPC channel.
pub fn ws_endpoint(s: &str) -> Result<Url> {
    let mut url =
        Url::parse(s).map_err(|e| Error::connection(format!("invalid endpoint `{s}`: {e}")))?;
    match url.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(Error::connection(format!(
                "unsupported scheme `{other}` for the persistent transport, expected ws or wss"
            )))
        }
    }
    if url.path().is_empty() || url.path() == "/" {
        url.set_path("/rpc");
    }
    Ok(url)
}

/// Parse and normalize a stateless-transport base URL.
///
/// Accepts `http://` and `https://` URLs; the RPC endpoint is `POST
/// /rpc` relative to the base.
pub fn http_endpoint(s: &str) -> Result<Url> {
    let mut url =
        Url::parse(s).map_err(|e| Error::connection(format!("invalid endpoint `{s}`: {e}")))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(Error::connection(format!(
                "unsupported scheme `{other}` for the stateless transport, expected http or https"
            )))
        }
    }
    if url.path().is_empty() || url.path() == "/" {
        url.set_path("/rpc");
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_path_is_rewritten() {
        assert_eq!(ws_endpoint("ws://localhost:8000").unwrap().path(), "/rpc");
        assert_eq!(ws_endpoint("ws://localhost:8000/").unwrap().path(), "/rpc");
        assert_eq!(
            ws_endpoint("wss://db.example.com/custom").unwrap().path(),
            "/custom"
        );
    }

    #[test]
    fn schemes_are_checked() {
        assert!(ws_endpoint("http://localhost").is_err());
        assert!(http_endpoint("ws://localhost").is_err());
        assert!(ws_endpoint("not a url").is_err());
    }

    #[test]
    fn http_base_gets_rpc_path() {
        assert_eq!(
            http_endpoint("http://localhost:8000").unwrap().as_str(),
            "http://localhost:8000/rpc"
        );
        assert_eq!(
            http_endpoint("https://db.example.com/").unwrap().path(),
            "/rpc"
        );
    }
}
