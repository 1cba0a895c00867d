// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! CRUD, query and utility operations.
//!
//! Read paths (`select`, and `query` when the caller supplies a
//! dependency set) consult the cache before dispatch; write paths
//! invalidate the affected table after a successful call. Plain
//! `query()` is never cached because its dependent tables cannot be
//! inferred reliably from the SQL.

use serde::de::DeserializeOwned;
use serde::Serialize;

use surreal_core::messages::methods;
use surreal_types::{validate_ident, validate_table_name, Error, Object, RecordId, Result, Value};

use crate::cache::CacheKey;
use crate::session::{resolve_target, Session};

impl Session {
    /// Round-trip a `ping` to the server.
    pub async fn ping(&self) -> Result<()> {
        self.send_request(methods::PING, None).await?;
        Ok(())
    }

    /// The server version string.
    pub async fn version(&self) -> Result<String> {
        let result = self.send_request(methods::VERSION, None).await?;
        match result {
            Value::Strand(version) => Ok(version),
            other => Err(Error::InvalidResponse(format!(
                "version returned {} instead of a string",
                other.kind()
            ))),
        }
    }

    /// Information about the authenticated session.
    pub async fn info(&self) -> Result<Value> {
        self.send_request(methods::INFO, None).await
    }

    /// Define a connection-scoped variable. Persistent transport only.
    pub async fn set(&self, name: &str, value: impl Serialize) -> Result<()> {
        self.require_notifications("set")?;
        validate_ident(name)?;
        let value = self.encode_data(methods::LET, &value)?;
        self.send_request(
            methods::LET,
            Some(vec![Value::Strand(name.to_string()), value]),
        )
        .await?;
        Ok(())
    }

    /// Remove a connection-scoped variable. Persistent transport only.
    pub async fn unset(&self, name: &str) -> Result<()> {
        self.require_notifications("unset")?;
        validate_ident(name)?;
        self.send_request(methods::UNSET, Some(vec![Value::Strand(name.to_string())]))
            .await?;
        Ok(())
    }

    /// Execute a query string with optional variables. Returns one wire
    /// value per statement. Never cached; see
    /// [`Session::query_with_tables`].
    pub async fn query(&self, sql: &str, vars: Option<Object>) -> Result<Vec<Value>> {
        self.query_inner(sql, vars, None).await
    }

    /// Execute a query string and cache the result under the given
    /// table dependency set. The caller owns the correctness of the
    /// set: the entry is invalidated when any listed table is mutated
    /// through this session.
    pub async fn query_with_tables(
        &self,
        sql: &str,
        vars: Option<Object>,
        tables: &[&str],
    ) -> Result<Vec<Value>> {
        for table in tables {
            validate_table_name(table)?;
        }
        let tables = tables.iter().map(|t| t.to_string()).collect();
        self.query_inner(sql, vars, Some(tables)).await
    }

    async fn query_inner(
        &self,
        sql: &str,
        vars: Option<Object>,
        cache_tables: Option<Vec<String>>,
    ) -> Result<Vec<Value>> {
        if sql.trim().is_empty() {
            return Err(Error::InvalidQuery("empty query string".to_string()));
        }
        let mut params = vec![Value::Strand(sql.to_string())];
        // Zero variables means a one-element parameter list, not a
        // trailing empty object.
        if let Some(vars) = vars {
            if !vars.is_empty() {
                params.push(Value::Object(vars));
            }
        }

        let cache_key = cache_tables
            .as_ref()
            .map(|_| CacheKey::new(methods::QUERY, sql, &params));
        if let (Some(cache), Some(key)) = (&self.inner.cache, &cache_key) {
            if let Some(value) = cache.get(key).await {
                return value.into_array().ok_or_else(|| {
                    Error::InvalidResponse("cached query result is not an array".to_string())
                });
            }
        }

        let result = self.send_request(methods::QUERY, Some(params)).await?;
        let Value::Array(results) = result else {
            return Err(Error::InvalidResponse(format!(
                "query returned {} instead of an array of results",
                result.kind()
            )));
        };
        if let (Some(cache), Some(key), Some(tables)) =
            (&self.inner.cache, &cache_key, cache_tables)
        {
            cache
                .set(key, Value::Array(results.clone()), tables)
                .await;
        }
        Ok(results)
    }

    /// Select a table or a single record, decoded into the caller's
    /// type. Consults the cache first; a miss populates it.
    pub async fn select<T: DeserializeOwned>(&self, target: &str) -> Result<Vec<T>> {
        let value = self.select_value(target).await?;
        self.decode_array(methods::SELECT, value)
    }

    /// Value-level variant of [`Session::select`].
    pub async fn select_value(&self, target: &str) -> Result<Value> {
        let (table, param) = resolve_target(target)?;
        let params = vec![param];
        let key = CacheKey::new(methods::SELECT, target, &params);
        if let Some(cache) = &self.inner.cache {
            if let Some(value) = cache.get(&key).await {
                return Ok(value);
            }
        }
        let value = self.send_request(methods::SELECT, Some(params)).await?;
        if let Some(cache) = &self.inner.cache {
            cache.set(&key, value.clone(), vec![table]).await;
        }
        Ok(value)
    }

    /// Create a record. The result decodes into the caller's type.
    pub async fn create<T: DeserializeOwned>(
        &self,
        target: &str,
        data: Option<impl Serialize>,
    ) -> Result<T> {
        let data = self.encode_optional(methods::CREATE, data)?;
        let value = self.create_value(target, data).await?;
        self.decode_flat(methods::CREATE, value)
    }

    /// Value-level variant of [`Session::create`].
    pub async fn create_value(&self, target: &str, data: Option<Value>) -> Result<Value> {
        self.run_mutation(methods::CREATE, target, data).await
    }

    /// Insert one or more records into a table.
    pub async fn insert<T: DeserializeOwned>(
        &self,
        target: &str,
        data: impl Serialize,
    ) -> Result<Vec<T>> {
        let data = self.encode_data(methods::INSERT, &data)?;
        let value = self.insert_value(target, data).await?;
        self.decode_array(methods::INSERT, value)
    }

    /// Value-level variant of [`Session::insert`].
    pub async fn insert_value(&self, target: &str, data: Value) -> Result<Value> {
        self.run_mutation(methods::INSERT, target, Some(data)).await
    }

    /// Replace the content of a record or a whole table.
    pub async fn update<T: DeserializeOwned>(
        &self,
        target: &str,
        data: Option<impl Serialize>,
    ) -> Result<T> {
        let data = self.encode_optional(methods::UPDATE, data)?;
        let value = self.update_value(target, data).await?;
        self.decode_flat(methods::UPDATE, value)
    }

    /// Value-level variant of [`Session::update`].
    pub async fn update_value(&self, target: &str, data: Option<Value>) -> Result<Value> {
        self.run_mutation(methods::UPDATE, target, data).await
    }

    /// Create the record if missing, update it otherwise.
    pub async fn upsert<T: DeserializeOwned>(
        &self,
        target: &str,
        data: Option<impl Serialize>,
    ) -> Result<T> {
        let data = self.encode_optional(methods::UPSERT, data)?;
        let value = self.upsert_value(target, data).await?;
        self.decode_flat(methods::UPSERT, value)
    }

    /// Value-level variant of [`Session::upsert`].
    pub async fn upsert_value(&self, target: &str, data: Option<Value>) -> Result<Value> {
        self.run_mutation(methods::UPSERT, target, data).await
    }

    /// Merge the given data into a record or a whole table.
    pub async fn merge<T: DeserializeOwned>(
        &self,
        target: &str,
        data: impl Serialize,
    ) -> Result<T> {
        let data = self.encode_data(methods::MERGE, &data)?;
        let value = self.merge_value(target, data).await?;
        self.decode_flat(methods::MERGE, value)
    }

    /// Value-level variant of [`Session::merge`].
    pub async fn merge_value(&self, target: &str, data: Value) -> Result<Value> {
        self.run_mutation(methods::MERGE, target, Some(data)).await
    }

    /// Apply JSON-patch style operations to a record or a whole table.
    pub async fn patch<T: DeserializeOwned>(
        &self,
        target: &str,
        patches: impl Serialize,
    ) -> Result<T> {
        let patches = self.encode_data(methods::PATCH, &patches)?;
        let value = self.patch_value(target, patches).await?;
        self.decode_flat(methods::PATCH, value)
    }

    /// Value-level variant of [`Session::patch`].
    pub async fn patch_value(&self, target: &str, patches: Value) -> Result<Value> {
        self.run_mutation(methods::PATCH, target, Some(patches)).await
    }

    /// Delete a record or every record in a table.
    pub async fn delete(&self, target: &str) -> Result<()> {
        self.run_mutation(methods::DELETE, target, None).await?;
        Ok(())
    }

    /// Relate two records through an edge table.
    pub async fn relate<T: DeserializeOwned>(
        &self,
        from: &RecordId,
        edge: &str,
        to: &RecordId,
        data: Option<impl Serialize>,
    ) -> Result<T> {
        let data = self.encode_optional(methods::RELATE, data)?;
        let value = self.relate_value(from, edge, to, data).await?;
        self.decode_flat(methods::RELATE, value)
    }

    /// Value-level variant of [`Session::relate`].
    pub async fn relate_value(
        &self,
        from: &RecordId,
        edge: &str,
        to: &RecordId,
        data: Option<Value>,
    ) -> Result<Value> {
        validate_table_name(edge)?;
        let mut params = vec![
            Value::RecordId(from.clone()),
            Value::Strand(edge.to_string()),
            Value::RecordId(to.clone()),
        ];
        if let Some(data) = data {
            params.push(data);
        }
        let value = self.send_request(methods::RELATE, Some(params)).await?;
        if let Some(cache) = &self.inner.cache {
            cache.invalidate(edge).await;
        }
        Ok(value)
    }

    /// Dispatch a data-mutating method and invalidate the affected
    /// table's cache entries on success.
    async fn run_mutation(
        &self,
        method: &'static str,
        target: &str,
        data: Option<Value>,
    ) -> Result<Value> {
        let (table, param) = resolve_target(target)?;
        let mut params = vec![param];
        if let Some(data) = data {
            params.push(data);
        }
        let value = self.send_request(method, Some(params)).await?;
        if let Some(cache) = &self.inner.cache {
            cache.invalidate(&table).await;
        }
        Ok(value)
    }

    fn encode_optional(
        &self,
        method: &'static str,
        data: Option<impl Serialize>,
    ) -> Result<Option<Value>> {
        match data {
            Some(data) => Ok(Some(self.encode_data(method, &data)?)),
            None => Ok(None),
        }
    }
}
