//! `rusqlite`-backed [`super::MemoryAdapter`].
//!
//! Each model gets one table with a fixed two-column shape: `id TEXT PRIMARY
//! KEY` and `data TEXT` (a JSON-encoded row). The dynamic `where`-clause
//! grammar this adapter supports doesn't map cleanly onto diesel's
//! compile-time query builder, so rows are loaded and filtered in process
//! with [`super::matches_where`] — the same evaluator the in-memory fake
//! uses, kept identical on purpose so both backends agree on semantics.

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::Connection;
use serde_json::Value;

use super::{generate_id, matches_where, migrations, Model, MemoryError, Result, SortBy, WhereClause};

pub struct SqliteMemoryAdapter {
    conn: Mutex<Connection>,
}

impl SqliteMemoryAdapter {
    pub fn open(path: &std::path::Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| MemoryError::Connection(e.to_string()))?;
        migrations::apply(&conn).map_err(|e| MemoryError::Connection(e.to_string()))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| MemoryError::Connection(e.to_string()))?;
        migrations::apply(&conn).map_err(|e| MemoryError::Connection(e.to_string()))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn load_all(conn: &Connection, model: Model) -> rusqlite::Result<Vec<Value>> {
        let table = model.table_name();
        let mut stmt = conn.prepare(&format!("SELECT data FROM {table}"))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for r in rows {
            let raw = r?;
            if let Ok(v) = serde_json::from_str::<Value>(&raw) {
                out.push(v);
            }
        }
        Ok(out)
    }

    fn put_row(conn: &Connection, model: Model, id: &str, row: &Value) -> rusqlite::Result<()> {
        let table = model.table_name();
        let data = serde_json::to_string(row).unwrap_or_else(|_| "{}".to_string());
        conn.execute(
            &format!("INSERT INTO {table} (id, data) VALUES (?1, ?2) ON CONFLICT(id) DO UPDATE SET data = excluded.data"),
            rusqlite::params![id, data],
        )?;
        Ok(())
    }

    fn remove_row(conn: &Connection, model: Model, id: &str) -> rusqlite::Result<()> {
        let table = model.table_name();
        conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), [id])?;
        Ok(())
    }
}

#[async_trait]
impl super::MemoryAdapter for SqliteMemoryAdapter {
    async fn create(&self, model: Model, mut data: Value) -> Result<Value> {
        let conn = self.conn.lock();
        let id = match data.get("id").and_then(|v| v.as_str()) {
            Some(id) => id.to_string(),
            None => {
                let id = generate_id();
                if let Some(obj) = data.as_object_mut() {
                    obj.insert("id".into(), Value::String(id.clone()));
                }
                id
            }
        };
        let existing: Option<i64> = conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE id = ?1", model.table_name()),
                [&id],
                |r| r.get(0),
            )
            .ok();
        if existing.is_some() {
            return Err(MemoryError::Conflict);
        }
        Self::put_row(&conn, model, &id, &data).map_err(|e| MemoryError::Connection(e.to_string()))?;
        Ok(data)
    }

    async fn find_one(&self, model: Model, where_: &[WhereClause]) -> Result<Option<Value>> {
        let conn = self.conn.lock();
        let rows = Self::load_all(&conn, model).map_err(|e| MemoryError::Connection(e.to_string()))?;
        Ok(rows.into_iter().find(|r| matches_where(r, where_)))
    }

    async fn find_many(
        &self,
        model: Model,
        where_: &[WhereClause],
        sort_by: Option<SortBy>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Value>> {
        let conn = self.conn.lock();
        let mut rows: Vec<Value> = Self::load_all(&conn, model)
            .map_err(|e| MemoryError::Connection(e.to_string()))?
            .into_iter()
            .filter(|r| matches_where(r, where_))
            .collect();
        if let Some(sort) = sort_by {
            rows.sort_by(|a, b| {
                let ord = a.get(&sort.field).map(|v| v.to_string()).cmp(&b.get(&sort.field).map(|v| v.to_string()));
                if sort.descending { ord.reverse() } else { ord }
            });
        }
        let rows: Vec<Value> = rows.into_iter().skip(offset.unwrap_or(0)).collect();
        Ok(match limit {
            Some(n) => rows.into_iter().take(n).collect(),
            None => rows,
        })
    }

    async fn count(&self, model: Model, where_: &[WhereClause]) -> Result<usize> {
        Ok(self.find_many(model, where_, None, None, None).await?.len())
    }

    async fn update(&self, model: Model, where_: &[WhereClause], patch: Value) -> Result<Option<Value>> {
        let conn = self.conn.lock();
        let rows = Self::load_all(&conn, model).map_err(|e| MemoryError::Connection(e.to_string()))?;
        let Some(mut row) = rows.into_iter().find(|r| matches_where(r, where_)) else {
            return Ok(None);
        };
        merge_patch(&mut row, &patch);
        let id = row.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
        Self::put_row(&conn, model, &id, &row).map_err(|e| MemoryError::Connection(e.to_string()))?;
        Ok(Some(row))
    }

    async fn update_many(&self, model: Model, where_: &[WhereClause], patch: Value) -> Result<usize> {
        let conn = self.conn.lock();
        let rows = Self::load_all(&conn, model).map_err(|e| MemoryError::Connection(e.to_string()))?;
        let mut n = 0;
        for mut row in rows.into_iter().filter(|r| matches_where(r, where_)) {
            merge_patch(&mut row, &patch);
            let id = row.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            Self::put_row(&conn, model, &id, &row).map_err(|e| MemoryError::Connection(e.to_string()))?;
            n += 1;
        }
        Ok(n)
    }

    async fn upsert(
        &self,
        model: Model,
        where_: &[WhereClause],
        create: Value,
        update: Value,
    ) -> Result<Option<Value>> {
        // A single `conn` lock guard serializes concurrent upserts against the
        // same `where`, giving us match-then-merge atomicity without a
        // separate transaction.
        let conn = self.conn.lock();
        let rows = Self::load_all(&conn, model).map_err(|e| MemoryError::Connection(e.to_string()))?;
        if let Some(mut row) = rows.into_iter().find(|r| matches_where(r, where_)) {
            merge_patch(&mut row, &update);
            let id = row.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            Self::put_row(&conn, model, &id, &row).map_err(|e| MemoryError::Connection(e.to_string()))?;
            return Ok(Some(row));
        }
        let mut merged = create;
        merge_patch(&mut merged, &update);
        let id = match merged.get("id").and_then(|v| v.as_str()) {
            Some(id) => id.to_string(),
            None => {
                let id = generate_id();
                if let Some(obj) = merged.as_object_mut() {
                    obj.insert("id".into(), Value::String(id.clone()));
                }
                id
            }
        };
        Self::put_row(&conn, model, &id, &merged).map_err(|e| MemoryError::Connection(e.to_string()))?;
        Ok(Some(merged))
    }

    async fn delete(&self, model: Model, where_: &[WhereClause]) -> Result<()> {
        let conn = self.conn.lock();
        let rows = Self::load_all(&conn, model).map_err(|e| MemoryError::Connection(e.to_string()))?;
        for row in rows.iter().filter(|r| matches_where(r, where_)) {
            if let Some(id) = row.get("id").and_then(|v| v.as_str()) {
                Self::remove_row(&conn, model, id).map_err(|e| MemoryError::Connection(e.to_string()))?;
            }
        }
        Ok(())
    }

    async fn delete_many(&self, model: Model, where_: &[WhereClause]) -> Result<usize> {
        let conn = self.conn.lock();
        let rows = Self::load_all(&conn, model).map_err(|e| MemoryError::Connection(e.to_string()))?;
        let mut n = 0;
        for row in rows.iter().filter(|r| matches_where(r, where_)) {
            if let Some(id) = row.get("id").and_then(|v| v.as_str()) {
                Self::remove_row(&conn, model, id).map_err(|e| MemoryError::Connection(e.to_string()))?;
                n += 1;
            }
        }
        Ok(n)
    }
}

fn merge_patch(target: &mut Value, patch: &Value) {
    let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) else {
        return;
    };
    for (k, v) in patch {
        target.insert(k.clone(), v.clone());
    }
}
