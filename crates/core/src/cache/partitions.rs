//! SQLite-backed partition operations.
//!
//! Implements [`CacheStore`] for [`CacheDb`]. Entries are keyed by
//! `(partition, key_hash)` and removed with their partition through a
//! cascading foreign key.

use super::connection::CacheDb;
use super::store::{CacheStore, Partition};
use super::RequestKey;
use crate::{Error, ResponseSnapshot};
use chrono::Utc;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Raw stored row: status, headers_json, body.
type StoredRow = (i64, String, Vec<u8>);

fn decode(row: StoredRow) -> Result<ResponseSnapshot, Error> {
    let (status, headers_json, body) = row;
    let status = u16::try_from(status).map_err(|e| Error::CorruptEntry(e.to_string()))?;
    ResponseSnapshot::from_stored(status, &headers_json, body)
}

#[async_trait::async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, name: &str) -> Result<Partition, Error> {
        if name.is_empty() {
            return Err(Error::InvalidInput("partition name cannot be empty".into()));
        }

        let owned = name.to_string();
        let opened_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO partitions (name, opened_at, open_seq)
                    VALUES (?1, ?2, (SELECT COALESCE(MAX(open_seq), 0) + 1 FROM partitions))
                    ON CONFLICT(name) DO NOTHING",
                    params![owned, opened_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Partition::new(name))
    }

    async fn find(&self, name: &str) -> Result<Option<Partition>, Error> {
        let owned = name.to_string();
        let exists = self
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM partitions WHERE name = ?1", params![owned], |row| row.get(0))?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)?;

        Ok(exists.then(|| Partition::new(name)))
    }

    async fn put(&self, partition: &Partition, key: &RequestKey, response: &ResponseSnapshot) -> Result<(), Error> {
        let partition = partition.name().to_string();
        let key_hash = key.digest();
        let method = key.method().to_string();
        let url = key.url().to_string();
        let status = i64::from(response.status.as_u16());
        let headers_json = response.headers_json();
        let body = response.body.to_vec();
        let stored_at = Utc::now().to_rfc3339();
        let quota = self.quota_bytes;

        self.conn
            .call(move |conn| -> Result<(), Error> {
                if let Some(quota) = quota {
                    let used: i64 = conn.query_row(
                        "SELECT COALESCE(SUM(length(body)), 0) FROM entries
                        WHERE NOT (partition = ?1 AND key_hash = ?2)",
                        params![partition, key_hash],
                        |row| row.get(0),
                    )?;
                    let used = used.max(0) as u64;
                    let needed = body.len() as u64;
                    if used + needed > quota {
                        return Err(Error::QuotaExceeded { needed, available: quota.saturating_sub(used) });
                    }
                }

                conn.execute(
                    "INSERT INTO entries (partition, key_hash, method, url, status, headers_json, body, stored_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(partition, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![partition, key_hash, method, url, status, headers_json, body, stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn match_request(
        &self, key: &RequestKey, scope: Option<&Partition>,
    ) -> Result<Option<ResponseSnapshot>, Error> {
        let key_hash = key.digest();
        let scope = scope.map(|p| p.name().to_string());

        let row = self
            .conn
            .call(move |conn| -> Result<Option<StoredRow>, Error> {
                let result = match scope {
                    Some(partition) => conn.query_row(
                        "SELECT status, headers_json, body FROM entries
                        WHERE partition = ?1 AND key_hash = ?2",
                        params![partition, key_hash],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                    ),
                    None => conn.query_row(
                        "SELECT e.status, e.headers_json, e.body FROM entries e
                        JOIN partitions p ON p.name = e.partition
                        WHERE e.key_hash = ?1
                        ORDER BY p.open_seq DESC
                        LIMIT 1",
                        params![key_hash],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                    ),
                };

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(decode).transpose()
    }

    async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY open_seq ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn entry_count(&self, partition: &Partition) -> Result<u64, Error> {
        let partition = partition.name().to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![partition], |row| {
                        row.get(0)
                    })?;
                Ok(count.max(0) as u64)
            })
            .await
            .map_err(Error::from)
    }
}
