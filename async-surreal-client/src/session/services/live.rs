// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! Live queries. Persistent transport only: the stateless transport has
//! no notification path and refuses these operations up front.

use surreal_core::messages::methods;
use surreal_types::{validate_table_name, Error, Result, Value};

use crate::live::LiveStream;
use crate::session::{resolve_target, Session};

impl Session {
    /// Start a live query on a table, returning the server-assigned
    /// subscription id and a stream of notifications.
    ///
    /// With `diff` set, notifications carry patches rather than whole
    /// records. The subscription ends with `kill`, with a server-side
    /// `close` notification, or when the connection drops; it is not
    /// re-issued on reconnect.
    pub async fn live(&self, table: &str, diff: bool) -> Result<(String, LiveStream)> {
        self.require_notifications("live")?;
        validate_table_name(table)?;
        let (table, param) = resolve_target(table)?;
        let result = self
            .send_request(methods::LIVE, Some(vec![param, Value::Bool(diff)]))
            .await?;
        let id = match result {
            Value::Strand(id) => id,
            other => {
                return Err(Error::InvalidResponse(format!(
                    "live returned {} instead of a subscription id",
                    other.kind()
                )))
            }
        };
        let stream = self.inner.live.register(&id, Some(&table));
        Ok((id, stream))
    }

    /// Attach another consumer stream to an existing subscription id.
    /// Each consumer observes the full notification sequence from the
    /// moment it subscribes.
    pub async fn subscribe_live(&self, id: &str) -> Result<LiveStream> {
        self.require_notifications("subscribe_live")?;
        Ok(self.inner.live.register(id, None))
    }

    /// Kill a live query and finish every stream attached to it.
    pub async fn kill(&self, id: &str) -> Result<()> {
        self.require_notifications("kill")?;
        self.send_request(methods::KILL, Some(vec![Value::Strand(id.to_string())]))
            .await?;
        self.inner.live.close(id);
        Ok(())
    }
}
