//! Plan model: a proposed batch of task/category mutations
//!
//! A plan is parsed from the JSON the assistant proposed, but the original
//! value is kept alongside the typed view so a confirmation can send it back
//! without any reinterpretation by the client.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::Priority;

/// Errors from plan parsing
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Plan must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("Malformed plan: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// How a task mutation finds its target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskRef {
    ById(i64),
    ByTitle(String),
}

impl TaskRef {
    /// Resolve the target from the optional `id` and `title` fields
    ///
    /// The backend looks a task up by id first, so an id wins over a title.
    fn resolve(id: Option<&Value>, title: Option<&str>) -> Option<Self> {
        let id = id.and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });
        match (id, title.map(str::trim).filter(|t| !t.is_empty())) {
            (Some(id), _) => Some(TaskRef::ById(id)),
            (None, Some(title)) => Some(TaskRef::ByTitle(title.to_string())),
            (None, None) => None,
        }
    }
}

/// Create a category
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewCategory {
    #[serde(default, deserialize_with = "label")]
    pub name: String,

    #[serde(default, deserialize_with = "text")]
    pub color: Option<String>,

    #[serde(default, deserialize_with = "text")]
    pub description: Option<String>,
}

/// Create a task
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewTask {
    #[serde(default, deserialize_with = "label")]
    pub title: String,

    #[serde(default, deserialize_with = "text")]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "priority")]
    pub priority: Option<Priority>,

    #[serde(default, deserialize_with = "text")]
    pub deadline: Option<String>,

    #[serde(default, deserialize_with = "text")]
    pub category: Option<String>,
}

/// Update a category identified by name
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CategoryUpdate {
    #[serde(default, deserialize_with = "label")]
    pub name: String,

    #[serde(default, deserialize_with = "text")]
    pub new_name: Option<String>,

    #[serde(default, deserialize_with = "text")]
    pub color: Option<String>,

    #[serde(default, deserialize_with = "text")]
    pub description: Option<String>,
}

/// Update a task identified by id or title
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "RawTaskUpdate")]
pub struct TaskUpdate {
    pub target: Option<TaskRef>,

    /// New title; only meaningful when the target is an id
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub deadline: Option<String>,
    pub category: Option<String>,

    /// Completion toggle, only when the plan carries an actual boolean
    pub is_done: Option<bool>,
}

#[derive(Deserialize)]
struct RawTaskUpdate {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, deserialize_with = "text")]
    title: Option<String>,
    #[serde(default, deserialize_with = "text")]
    description: Option<String>,
    #[serde(default, deserialize_with = "priority")]
    priority: Option<Priority>,
    #[serde(default, deserialize_with = "text")]
    deadline: Option<String>,
    #[serde(default, deserialize_with = "text")]
    category: Option<String>,
    #[serde(default)]
    is_done: Option<Value>,
}

impl From<RawTaskUpdate> for TaskUpdate {
    fn from(raw: RawTaskUpdate) -> Self {
        let target = TaskRef::resolve(raw.id.as_ref(), raw.title.as_deref());
        let title = match target {
            Some(TaskRef::ById(_)) => raw.title.filter(|t| !t.trim().is_empty()),
            _ => None,
        };
        Self {
            target,
            title,
            description: raw.description,
            priority: raw.priority,
            deadline: raw.deadline,
            category: raw.category,
            is_done: raw.is_done.and_then(|v| v.as_bool()),
        }
    }
}

/// Delete a category by name
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CategoryDeletion {
    #[serde(default, deserialize_with = "label")]
    pub name: String,
}

/// Delete a task by id or title
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "RawTaskTarget")]
pub struct TaskDeletion {
    pub target: Option<TaskRef>,
}

#[derive(Deserialize)]
struct RawTaskTarget {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, deserialize_with = "text")]
    title: Option<String>,
}

impl From<RawTaskTarget> for TaskDeletion {
    fn from(raw: RawTaskTarget) -> Self {
        Self {
            target: TaskRef::resolve(raw.id.as_ref(), raw.title.as_deref()),
        }
    }
}

/// The six operation sequences; absent and null both mean empty
#[derive(Deserialize)]
struct PlanFields {
    #[serde(default, deserialize_with = "items")]
    categories: Vec<NewCategory>,
    #[serde(default, deserialize_with = "items")]
    tasks: Vec<NewTask>,
    #[serde(default, deserialize_with = "items")]
    update_categories: Vec<CategoryUpdate>,
    #[serde(default, deserialize_with = "items")]
    update_tasks: Vec<TaskUpdate>,
    #[serde(default, deserialize_with = "items")]
    delete_categories: Vec<CategoryDeletion>,
    #[serde(default, deserialize_with = "items")]
    delete_tasks: Vec<TaskDeletion>,
}

// Plans are model output and fields may carry any JSON type. A mistyped field
// reads as absent and a mistyped item as an empty one, so every raw item
// stays counted and the plan can still be confirmed as received.

/// One typed entry per raw item
fn items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .iter()
        .map(|item| {
            T::deserialize(item).unwrap_or_else(|e| {
                debug!(error = %e, "items: unreadable plan item kept as empty");
                T::default()
            })
        })
        .collect())
}

/// A string field; any other JSON type reads as absent
fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// A name or title; non-strings read as empty
fn label<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(text(deserializer)?.unwrap_or_default())
}

/// A priority; non-strings read as absent, unknown levels as medium
fn priority<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Priority>, D::Error> {
    Ok(text(deserializer)?.map(|s| Priority::normalize(&s)))
}

/// A proposed batch of mutations awaiting confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    raw: Value,
    pub categories: Vec<NewCategory>,
    pub tasks: Vec<NewTask>,
    pub update_categories: Vec<CategoryUpdate>,
    pub update_tasks: Vec<TaskUpdate>,
    pub delete_categories: Vec<CategoryDeletion>,
    pub delete_tasks: Vec<TaskDeletion>,
}

impl Plan {
    /// Parse a plan from the JSON value the backend proposed
    pub fn from_value(raw: Value) -> Result<Self, PlanError> {
        debug!("Plan::from_value: called");
        let kind = match &raw {
            Value::Object(_) => None,
            Value::Null => Some("null"),
            Value::Bool(_) => Some("a boolean"),
            Value::Number(_) => Some("a number"),
            Value::String(_) => Some("a string"),
            Value::Array(_) => Some("an array"),
        };
        if let Some(kind) = kind {
            return Err(PlanError::NotAnObject(kind));
        }

        let fields = PlanFields::deserialize(&raw)?;
        let plan = Self {
            categories: fields.categories,
            tasks: fields.tasks,
            update_categories: fields.update_categories,
            update_tasks: fields.update_tasks,
            delete_categories: fields.delete_categories,
            delete_tasks: fields.delete_tasks,
            raw,
        };
        debug!(items = plan.total_items(), "Plan::from_value: parsed");
        Ok(plan)
    }

    /// The JSON value exactly as it was received
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Number of mutations across all six sequences
    pub fn total_items(&self) -> usize {
        self.categories.len()
            + self.tasks.len()
            + self.update_categories.len()
            + self.update_tasks.len()
            + self.delete_categories.len()
            + self.delete_tasks.len()
    }

    /// A plan with nothing in it is never worth confirming
    pub fn is_empty(&self) -> bool {
        self.total_items() == 0
    }

    /// Pretty-printed JSON of the raw plan
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.raw).unwrap_or_else(|_| self.raw.to_string())
    }
}

impl Serialize for Plan {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}
