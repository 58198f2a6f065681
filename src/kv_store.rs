use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Transaction};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

/// A flat string key-value store, the same shape as browser local storage.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;

    fn remove_item(&mut self, key: &str) -> Result<()>;

    /// Writes all `items` in order. Backends with transactions make this
    /// atomic; the default is just a sequence of `set_item`.
    fn set_items(&mut self, items: &[(String, String)]) -> Result<()> {
        for (key, value) in items {
            self.set_item(key, value)?;
        }
        Ok(())
    }
}

#[derive(Default, Debug, Clone)]
pub struct MemoryStore {
    items: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            items: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.items.remove(key);
        Ok(())
    }
}

/* SQLite backed store. A single `kv` table plus `db_metadata` for the schema
version. Unlike browser storage, `set_items` runs in one transaction so a
waypoint append can never be half written.
*/
pub struct SqliteStore {
    conn: Connection,
}

pub const DB_FILE_NAME: &str = "triplog.db";

fn get_version(tx: &Transaction) -> Result<usize> {
    tx.execute(
        "CREATE TABLE IF NOT EXISTS `db_metadata` (
        `key`	TEXT NOT NULL,
        `value`	TEXT,
        PRIMARY KEY(`key`)
        )",
        (),
    )?;
    let version_str: Option<String> = tx
        .query_row(
            "SELECT `value` FROM `db_metadata` WHERE key='version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(match version_str {
        None => 0,
        Some(s) => s.parse()?,
    })
}

#[allow(clippy::type_complexity)]
fn open_db_and_run_migration(
    dir: &str,
    file_name: &str,
    migrations: &[&dyn Fn(&Transaction) -> Result<()>],
) -> Result<Connection> {
    debug!("open and run migration for {}", file_name);
    let mut conn = Connection::open(Path::new(dir).join(file_name))?;
    let tx = conn.transaction()?;

    let version = get_version(&tx)?;
    let target_version = migrations.len();
    debug!(
        "current version = {}, target_version = {}",
        version, target_version
    );
    match version.cmp(&target_version) {
        Ordering::Equal => (),
        Ordering::Less => {
            for (i, f) in migrations.iter().enumerate().skip(version) {
                info!("running migration for version: {}", i + 1);
                f(&tx)?;
            }
            tx.execute(
                "INSERT OR REPLACE INTO `db_metadata` (key, value) VALUES (?1, ?2)",
                ("version", target_version.to_string()),
            )?;
        }
        Ordering::Greater => {
            bail!(
                "version too high: current version = {}, target_version = {}",
                version,
                target_version
            );
        }
    }
    tx.commit()?;
    Ok(conn)
}

impl SqliteStore {
    pub fn open(dir: &str) -> Result<SqliteStore> {
        let conn = open_db_and_run_migration(
            dir,
            DB_FILE_NAME,
            &[&|tx| {
                let sql = "
                CREATE TABLE kv (
                    key    TEXT    PRIMARY KEY
                                   NOT NULL
                                   UNIQUE,
                    value  TEXT    NOT NULL
                );
                ";
                for s in sql_split::split(sql) {
                    tx.execute(&s, ())?;
                }
                Ok(())
            }],
        )?;
        Ok(SqliteStore { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let mut query = self
            .conn
            .prepare_cached("SELECT value FROM kv WHERE key = ?1;")?;
        Ok(query.query_row([key], |row| row.get(0)).optional()?)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2);",
            (key, value),
        )?;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1;", (key,))?;
        Ok(())
    }

    fn set_items(&mut self, items: &[(String, String)]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt =
                tx.prepare_cached("INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2);")?;
            for (key, value) in items {
                stmt.execute((key, value))?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
