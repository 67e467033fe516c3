//! SQLite grant store implementation.

use crate::{Error, Grant, GrantEvent, GrantKey, Result};
use authz::{Coins, SendAuthorization};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::time::Duration;

/// How long a writer waits for another connection's transaction.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// SQLite-backed store for grants, balances and the grant event log.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS grants (
                granter TEXT NOT NULL,
                grantee TEXT NOT NULL,
                msg_type_url TEXT NOT NULL,
                authorization TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (granter, grantee, msg_type_url)
            );
            CREATE INDEX IF NOT EXISTS idx_grants_grantee
                ON grants(grantee);

            CREATE TABLE IF NOT EXISTS balances (
                address TEXT PRIMARY KEY,
                coins TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS events (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                timestamp TEXT NOT NULL,
                granter TEXT NOT NULL,
                grantee TEXT NOT NULL,
                msg_type_url TEXT NOT NULL,
                kind TEXT NOT NULL,
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_events_granter
                ON events(granter, seq);
            "#,
        )?;
        Ok(())
    }

    /// Run `f` inside a write transaction. Everything `f` writes through this
    /// store is committed if it returns `Ok` and rolled back otherwise.
    ///
    /// The transaction takes the database write lock up front (`BEGIN
    /// IMMEDIATE`), so reads made inside `f` cannot be invalidated by another
    /// connection before the commit. A second writer waits for the lock, up
    /// to the busy timeout.
    pub fn atomically<T, E>(
        &self,
        f: impl FnOnce(&Self) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<Error>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(Error::from)?;

        match f(self) {
            Ok(value) => {
                if let Err(e) = self.conn.execute_batch("COMMIT") {
                    self.rollback();
                    return Err(Error::from(e).into());
                }
                Ok(value)
            }
            Err(e) => {
                self.rollback();
                Err(e)
            }
        }
    }

    fn rollback(&self) {
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            tracing::warn!(error = %e, "rollback failed");
        }
    }

    /// Look up the grant stored under `key`.
    pub fn get_grant(&self, key: &GrantKey) -> Result<Option<Grant>> {
        let row = self
            .conn
            .query_row(
                "SELECT granter, grantee, msg_type_url, authorization, created_at FROM grants
                 WHERE granter = ?1 AND grantee = ?2 AND msg_type_url = ?3",
                params![key.granter, key.grantee, key.msg_type_url],
                grant_row,
            )
            .optional()?;

        row.map(decode_grant).transpose()
    }

    /// Insert a grant, replacing any grant with the same key.
    pub fn put_grant(&self, grant: &Grant) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO grants
                 (granter, grantee, msg_type_url, authorization, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                grant.key.granter,
                grant.key.grantee,
                grant.key.msg_type_url,
                serde_json::to_string(&grant.authorization)?,
                grant.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Delete the grant under `key`. Returns whether one existed.
    pub fn delete_grant(&self, key: &GrantKey) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM grants WHERE granter = ?1 AND grantee = ?2 AND msg_type_url = ?3",
            params![key.granter, key.grantee, key.msg_type_url],
        )?;
        Ok(deleted > 0)
    }

    /// All grants, ordered by key.
    pub fn all_grants(&self) -> Result<Vec<Grant>> {
        self.query_grants(
            "SELECT granter, grantee, msg_type_url, authorization, created_at FROM grants
             ORDER BY granter, grantee, msg_type_url",
            params![],
        )
    }

    /// Grants issued by `granter`.
    pub fn grants_by_granter(&self, granter: &str) -> Result<Vec<Grant>> {
        self.query_grants(
            "SELECT granter, grantee, msg_type_url, authorization, created_at FROM grants
             WHERE granter = ?1 ORDER BY grantee, msg_type_url",
            [granter],
        )
    }

    /// Grants held by `grantee`.
    pub fn grants_by_grantee(&self, grantee: &str) -> Result<Vec<Grant>> {
        self.query_grants(
            "SELECT granter, grantee, msg_type_url, authorization, created_at FROM grants
             WHERE grantee = ?1 ORDER BY granter, msg_type_url",
            [grantee],
        )
    }

    fn query_grants(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Grant>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, grant_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(decode_grant).collect()
    }

    /// Balance held by `address`; empty if the address is unknown.
    pub fn balance(&self, address: &str) -> Result<Coins> {
        let coins: Option<String> = self
            .conn
            .query_row(
                "SELECT coins FROM balances WHERE address = ?1",
                [address],
                |row| row.get(0),
            )
            .optional()?;

        match coins {
            Some(coins) => coins
                .parse()
                .map_err(|e| Error::Corrupt(format!("balance of {address}: {e}"))),
            None => Ok(Coins::empty()),
        }
    }

    /// Overwrite the balance held by `address`.
    pub fn set_balance(&self, address: &str, coins: &Coins) -> Result<()> {
        if coins.is_zero() {
            self.conn
                .execute("DELETE FROM balances WHERE address = ?1", [address])?;
        } else {
            self.conn.execute(
                "INSERT OR REPLACE INTO balances (address, coins) VALUES (?1, ?2)",
                params![address, coins.to_string()],
            )?;
        }
        Ok(())
    }

    /// Append an event to the log.
    pub fn append(&self, event: &GrantEvent) -> Result<()> {
        self.conn.execute(
            "INSERT INTO events (id, timestamp, granter, grantee, msg_type_url, kind, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.id.to_string(),
                event.timestamp.to_rfc3339(),
                event.key.granter,
                event.key.grantee,
                event.key.msg_type_url,
                event.kind.name(),
                serde_json::to_string(&event.kind)?,
            ],
        )?;
        Ok(())
    }

    /// Load events in the order they were appended.
    ///
    /// `granter` and `kind` narrow the result when given.
    pub fn load_events(
        &self,
        granter: Option<&str>,
        kind: Option<&str>,
    ) -> Result<Vec<GrantEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, granter, grantee, msg_type_url, data FROM events
             WHERE (?1 IS NULL OR granter = ?1) AND (?2 IS NULL OR kind = ?2)
             ORDER BY seq",
        )?;

        let rows = stmt
            .query_map(params![granter, kind], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    GrantKey {
                        granter: row.get(2)?,
                        grantee: row.get(3)?,
                        msg_type_url: row.get(4)?,
                    },
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, timestamp, key, data)| {
                Ok(GrantEvent {
                    id: id
                        .parse()
                        .map_err(|e| Error::Corrupt(format!("event id {id}: {e}")))?,
                    timestamp: parse_timestamp(&timestamp)?,
                    key,
                    kind: serde_json::from_str(&data)?,
                })
            })
            .collect()
    }
}

type GrantRow = (GrantKey, String, String);

fn grant_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<GrantRow> {
    Ok((
        GrantKey {
            granter: row.get(0)?,
            grantee: row.get(1)?,
            msg_type_url: row.get(2)?,
        },
        row.get(3)?,
        row.get(4)?,
    ))
}

fn decode_grant((key, authorization, created_at): GrantRow) -> Result<Grant> {
    let authorization: SendAuthorization = serde_json::from_str(&authorization)?;
    Ok(Grant {
        key,
        authorization,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Corrupt(format!("timestamp {s}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GrantEventKind;

    fn auth(limit: &str, allow: &[&str]) -> SendAuthorization {
        SendAuthorization::new(limit.parse().unwrap(), allow.iter().copied())
    }

    #[test]
    fn test_grant_roundtrip_and_replace() {
        let store = Store::in_memory().unwrap();
        let grant = Grant::new("alice", "bob", auth("100atom", &["carol"]));
        store.put_grant(&grant).unwrap();

        let loaded = store.get_grant(&grant.key).unwrap().unwrap();
        assert_eq!(loaded.authorization, grant.authorization);

        let replacement = Grant::new("alice", "bob", auth("5atom", &[]));
        store.put_grant(&replacement).unwrap();
        let loaded = store.get_grant(&grant.key).unwrap().unwrap();
        assert_eq!(loaded.authorization.spend_limit.amount_of("atom"), 5);
        assert_eq!(store.all_grants().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_grant() {
        let store = Store::in_memory().unwrap();
        let grant = Grant::new("alice", "bob", auth("100atom", &[]));
        store.put_grant(&grant).unwrap();

        assert!(store.delete_grant(&grant.key).unwrap());
        assert!(!store.delete_grant(&grant.key).unwrap());
        assert!(store.get_grant(&grant.key).unwrap().is_none());
    }

    #[test]
    fn test_grants_by_party() {
        let store = Store::in_memory().unwrap();
        store.put_grant(&Grant::new("alice", "bob", auth("1atom", &[]))).unwrap();
        store.put_grant(&Grant::new("alice", "carol", auth("2atom", &[]))).unwrap();
        store.put_grant(&Grant::new("dave", "bob", auth("3atom", &[]))).unwrap();

        assert_eq!(store.grants_by_granter("alice").unwrap().len(), 2);
        let bobs = store.grants_by_grantee("bob").unwrap();
        assert_eq!(bobs.len(), 2);
        assert_eq!(bobs[0].key.granter, "alice");
        assert_eq!(bobs[1].key.granter, "dave");
    }

    #[test]
    fn test_balances() {
        let store = Store::in_memory().unwrap();
        assert!(store.balance("alice").unwrap().is_empty());

        store.set_balance("alice", &"10atom,3stake".parse().unwrap()).unwrap();
        assert_eq!(store.balance("alice").unwrap().amount_of("stake"), 3);

        store.set_balance("alice", &Coins::empty()).unwrap();
        assert!(store.balance("alice").unwrap().is_empty());
    }

    #[test]
    fn test_atomically_rolls_back_on_error() {
        let store = Store::in_memory().unwrap();
        let grant = Grant::new("alice", "bob", auth("100atom", &[]));

        let result: Result<()> = store.atomically(|s| {
            s.put_grant(&grant)?;
            Err(Error::Corrupt("forced".into()))
        });
        assert!(result.is_err());
        assert!(store.get_grant(&grant.key).unwrap().is_none());

        store.atomically(|s| s.put_grant(&grant)).unwrap();
        assert!(store.get_grant(&grant.key).unwrap().is_some());
    }

    #[test]
    fn test_event_log_filters() {
        let store = Store::in_memory().unwrap();
        let key = GrantKey::new("alice", "bob", authz::MSG_SEND_TYPE_URL);
        let other = GrantKey::new("dave", "bob", authz::MSG_SEND_TYPE_URL);

        store
            .append(&GrantEvent::new(
                key.clone(),
                GrantEventKind::Granted {
                    authorization: auth("100atom", &[]),
                },
            ))
            .unwrap();
        store
            .append(&GrantEvent::new(key.clone(), GrantEventKind::Revoked))
            .unwrap();
        store
            .append(&GrantEvent::new(other, GrantEventKind::Revoked))
            .unwrap();

        let events = store.load_events(Some("alice"), None).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind.name(), "granted");
        assert_eq!(events[1].kind, GrantEventKind::Revoked);

        assert_eq!(store.load_events(None, Some("revoked")).unwrap().len(), 2);
        assert_eq!(store.load_events(None, None).unwrap().len(), 3);
    }
}
