//! In-memory conformance fake for [`super::MemoryAdapter`], used by unit
//! tests across the crate and by the gateway's `--ephemeral` mode.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::{generate_id, matches_where, Model, Result, SortBy, WhereClause};

#[derive(Default)]
struct Table {
    rows: Vec<Value>,
}

/// `HashMap`-backed, `parking_lot::Mutex`-guarded fake adapter.
///
/// Not durable, not suitable for production — exists so tests can exercise
/// the [`super::MemoryAdapter`] contract without a filesystem.
pub struct InMemoryAdapter {
    tables: Mutex<HashMap<Model, Table>>,
}

impl InMemoryAdapter {
    pub fn new() -> Self {
        let mut tables = HashMap::new();
        tables.insert(Model::Thread, Table::default());
        tables.insert(Model::Message, Table::default());
        tables.insert(Model::Todo, Table::default());
        Self {
            tables: Mutex::new(tables),
        }
    }
}

impl Default for InMemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl super::MemoryAdapter for InMemoryAdapter {
    async fn create(&self, model: Model, mut data: Value) -> Result<Value> {
        let mut tables = self.tables.lock();
        let table = tables.entry(model).or_default();
        if data.get("id").and_then(|v| v.as_str()).is_none() {
            if let Some(obj) = data.as_object_mut() {
                obj.insert("id".into(), Value::String(generate_id()));
            }
        }
        table.rows.push(data.clone());
        Ok(data)
    }

    async fn find_one(&self, model: Model, where_: &[WhereClause]) -> Result<Option<Value>> {
        let tables = self.tables.lock();
        let table = tables.get(&model);
        Ok(table.and_then(|t| t.rows.iter().find(|r| matches_where(r, where_)).cloned()))
    }

    async fn find_many(
        &self,
        model: Model,
        where_: &[WhereClause],
        sort_by: Option<SortBy>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Value>> {
        let tables = self.tables.lock();
        let mut rows: Vec<Value> = tables
            .get(&model)
            .map(|t| t.rows.iter().filter(|r| matches_where(r, where_)).cloned().collect())
            .unwrap_or_default();
        if let Some(sort) = sort_by {
            rows.sort_by(|a, b| {
                let av = a.get(&sort.field);
                let bv = b.get(&sort.field);
                let ord = av.map(|v| v.to_string()).cmp(&bv.map(|v| v.to_string()));
                if sort.descending { ord.reverse() } else { ord }
            });
        }
        let start = offset.unwrap_or(0);
        let rows: Vec<Value> = rows.into_iter().skip(start).collect();
        Ok(match limit {
            Some(n) => rows.into_iter().take(n).collect(),
            None => rows,
        })
    }

    async fn count(&self, model: Model, where_: &[WhereClause]) -> Result<usize> {
        Ok(self.find_many(model, where_, None, None, None).await?.len())
    }

    async fn update(&self, model: Model, where_: &[WhereClause], patch: Value) -> Result<Option<Value>> {
        let mut tables = self.tables.lock();
        let table = tables.entry(model).or_default();
        let found = table.rows.iter_mut().find(|r| matches_where(r, where_));
        match found {
            Some(row) => {
                merge_patch(row, &patch);
                Ok(Some(row.clone()))
            }
            None => Ok(None),
        }
    }

    async fn update_many(&self, model: Model, where_: &[WhereClause], patch: Value) -> Result<usize> {
        let mut tables = self.tables.lock();
        let table = tables.entry(model).or_default();
        let mut n = 0;
        for row in table.rows.iter_mut().filter(|r| matches_where(r, where_)) {
            merge_patch(row, &patch);
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
        let mut tables = self.tables.lock();
        let table = tables.entry(model).or_default();
        if let Some(row) = table.rows.iter_mut().find(|r| matches_where(r, where_)) {
            merge_patch(row, &update);
            return Ok(Some(row.clone()));
        }
        let mut merged = create;
        merge_patch(&mut merged, &update);
        if merged.get("id").and_then(|v| v.as_str()).is_none() {
            if let Some(obj) = merged.as_object_mut() {
                obj.insert("id".into(), Value::String(generate_id()));
            }
        }
        table.rows.push(merged.clone());
        Ok(Some(merged))
    }

    async fn delete(&self, model: Model, where_: &[WhereClause]) -> Result<()> {
        let mut tables = self.tables.lock();
        if let Some(table) = tables.get_mut(&model) {
            table.rows.retain(|r| !matches_where(r, where_));
        }
        Ok(())
    }

    async fn delete_many(&self, model: Model, where_: &[WhereClause]) -> Result<usize> {
        let mut tables = self.tables.lock();
        let Some(table) = tables.get_mut(&model) else {
            return Ok(0);
        };
        let before = table.rows.len();
        table.rows.retain(|r| !matches_where(r, where_));
        Ok(before - table.rows.len())
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryAdapter as _;
    use serde_json::json;

    #[tokio::test]
    async fn create_assigns_id_when_absent() {
        let adapter = InMemoryAdapter::new();
        let row = adapter.create(Model::Thread, json!({"title": "t"})).await.unwrap();
        assert!(row.get("id").and_then(|v| v.as_str()).is_some());
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_matching_where() {
        let adapter = InMemoryAdapter::new();
        let where_ = vec![WhereClause::eq("threadId", "t1")];
        adapter
            .upsert(Model::Todo, &where_, json!({"threadId": "t1", "todos": []}), json!({}))
            .await
            .unwrap();
        adapter
            .upsert(
                Model::Todo,
                &where_,
                json!({"threadId": "t1", "todos": []}),
                json!({"todos": [{"id": "1"}]}),
            )
            .await
            .unwrap();
        assert_eq!(adapter.count(Model::Todo, &where_).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_many_cascades() {
        let adapter = InMemoryAdapter::new();
        adapter
            .create(Model::Message, json!({"id": "m1", "threadId": "t1"}))
            .await
            .unwrap();
        adapter
            .create(Model::Message, json!({"id": "m2", "threadId": "t1"}))
            .await
            .unwrap();
        let n = adapter
            .delete_many(Model::Message, &[WhereClause::eq("threadId", "t1")])
            .await
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(
            adapter
                .count(Model::Message, &[WhereClause::eq("threadId", "t1")])
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn find_many_respects_limit_and_offset() {
        let adapter = InMemoryAdapter::new();
        for i in 0..5 {
            adapter
                .create(Model::Message, json!({"id": format!("m{i}"), "threadId": "t1", "seq": i}))
                .await
                .unwrap();
        }
        let rows = adapter
            .find_many(Model::Message, &[], None, Some(2), Some(1))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }
}
