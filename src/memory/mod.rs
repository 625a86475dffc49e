//! The Memory Adapter: a storage-engine-agnostic facade over a small set of
//! relational operations against a fixed schema (`thread`, `message`,
//! `todo`). This is the only way the rest of the core touches persistent
//! state.

pub mod in_memory;
pub mod migrations;
pub mod model;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use in_memory::InMemoryAdapter;
pub use sqlite::SqliteMemoryAdapter;

/// The closed set of models the adapter serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Model {
    Thread,
    Message,
    Todo,
}

impl Model {
    pub fn table_name(&self) -> &'static str {
        match self {
            Model::Thread => "thread",
            Model::Message => "message",
            Model::Todo => "todo",
        }
    }
}

/// A single clause in a `where` expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhereClause {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
    #[serde(default)]
    pub connector: Connector,
}

impl WhereClause {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator: Operator::Eq,
            value: value.into(),
            connector: Connector::And,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    In,
    Contains,
    StartsWith,
    EndsWith,
    Lt,
    Lte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Connector {
    #[default]
    And,
    Or,
}

/// Errors surfaced by a [`MemoryAdapter`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("schema missing for model: {0:?}")]
    SchemaMissing(Model),
    #[error("field missing: {0}")]
    FieldMissing(String),
    #[error("conflict: a row matching the given key already exists")]
    Conflict,
    #[error("connection error: {0}")]
    Connection(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MemoryError>;

/// Sort direction for `findMany`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortBy {
    pub field: String,
    pub descending: bool,
}

/// Storage-engine-agnostic CRUD facade. Every method normalizes dates and
/// JSON on ingress/egress so callers never see driver-specific
/// representations.
#[async_trait]
pub trait MemoryAdapter: Send + Sync {
    async fn create(&self, model: Model, data: Value) -> Result<Value>;
    async fn find_one(&self, model: Model, where_: &[WhereClause]) -> Result<Option<Value>>;
    async fn find_many(
        &self,
        model: Model,
        where_: &[WhereClause],
        sort_by: Option<SortBy>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Value>>;
    async fn count(&self, model: Model, where_: &[WhereClause]) -> Result<usize>;
    async fn update(&self, model: Model, where_: &[WhereClause], patch: Value) -> Result<Option<Value>>;
    async fn update_many(&self, model: Model, where_: &[WhereClause], patch: Value) -> Result<usize>;
    /// Atomic "update if matching row exists, else insert the merge of
    /// `create` and `update`". Must be atomic with respect to concurrent
    /// callers matching the same `where`.
    async fn upsert(
        &self,
        model: Model,
        where_: &[WhereClause],
        create: Value,
        update: Value,
    ) -> Result<Option<Value>>;
    async fn delete(&self, model: Model, where_: &[WhereClause]) -> Result<()>;
    async fn delete_many(&self, model: Model, where_: &[WhereClause]) -> Result<usize>;
}

/// Generate a collision-resistant, time-monotonic id.
pub fn generate_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Partition a `where` expression into its disjunctive (`OR`) and conjunctive
/// (`AND`) groups: clauses with `Or` form one disjunctive group (any may
/// match), the rest form the conjunctive group (all must match), and the
/// overall result is their AND.
pub fn partition_where(clauses: &[WhereClause]) -> (Vec<&WhereClause>, Vec<&WhereClause>) {
    let mut or_group = Vec::new();
    let mut and_group = Vec::new();
    for c in clauses {
        match c.connector {
            Connector::Or => or_group.push(c),
            Connector::And => and_group.push(c),
        }
    }
    (or_group, and_group)
}

/// Evaluate one clause against a JSON object's field.
pub fn matches_clause(row: &Value, clause: &WhereClause) -> bool {
    let Some(field_value) = row.get(&clause.field) else {
        return false;
    };
    match clause.operator {
        Operator::Eq => field_value == &clause.value,
        Operator::In => clause
            .value
            .as_array()
            .map(|arr| arr.contains(field_value))
            .unwrap_or(false),
        Operator::Contains => match (field_value.as_str(), clause.value.as_str()) {
            (Some(f), Some(v)) => f.contains(v),
            _ => false,
        },
        Operator::StartsWith => match (field_value.as_str(), clause.value.as_str()) {
            (Some(f), Some(v)) => f.starts_with(v),
            _ => false,
        },
        Operator::EndsWith => match (field_value.as_str(), clause.value.as_str()) {
            (Some(f), Some(v)) => f.ends_with(v),
            _ => false,
        },
        Operator::Lt => compare_numeric_or_string(field_value, &clause.value, |o| o.is_lt()),
        Operator::Lte => compare_numeric_or_string(field_value, &clause.value, |o| o.is_le()),
    }
}

fn compare_numeric_or_string(a: &Value, b: &Value, accept: impl Fn(std::cmp::Ordering) -> bool) -> bool {
    if let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) {
        return a.partial_cmp(&b).map(accept).unwrap_or(false);
    }
    if let (Some(a), Some(b)) = (a.as_str(), b.as_str()) {
        return accept(a.cmp(b));
    }
    false
}

/// Evaluate a full `where` expression against a row: `(OR-group any) AND
/// (AND-group all)`. An empty OR group is treated as vacuously true so that
/// a pure-AND expression still matches.
pub fn matches_where(row: &Value, clauses: &[WhereClause]) -> bool {
    let (or_group, and_group) = partition_where(clauses);
    let or_ok = or_group.is_empty() || or_group.iter().any(|c| matches_clause(row, c));
    let and_ok = and_group.iter().all(|c| matches_clause(row, c));
    or_ok && and_ok
}
