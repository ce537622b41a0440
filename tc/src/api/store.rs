//! Task/category store client
//!
//! Re-fetches the user's tasks, categories and statistics after a plan is
//! executed and keeps the last snapshot for the tasks and categories views.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use super::{ApiClient, ApiError};
use crate::effects::Refresher;
use crate::plan::Priority;

const TASKS_PATH: &str = "/tasks/";
const CATEGORIES_PATH: &str = "/tasks/categories/";
const STATS_PATH: &str = "/tasks/stats/";

/// A task as listed by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,

    #[serde(default)]
    pub is_done: bool,

    #[serde(default)]
    pub priority: Option<Priority>,

    #[serde(default)]
    pub deadline: Option<String>,

    #[serde(default)]
    pub category_name: Option<String>,

    #[serde(default)]
    pub is_overdue: bool,
}

/// A task category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,

    #[serde(default)]
    pub color: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub task_count: Option<u64>,
}

/// Aggregate task statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskStats {
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub pending_tasks: u64,
    pub overdue_tasks: u64,
    pub completion_rate: f64,
}

/// List endpoints answer either a bare array or a paginated envelope
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Paged { results: Vec<T> },
    Plain(Vec<T>),
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Paged { results } => results,
            Listing::Plain(items) => items,
        }
    }
}

/// Last fetched view of the user's data
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub tasks: Vec<Task>,
    pub categories: Vec<Category>,
    pub stats: Option<TaskStats>,
}

/// Store client backed by the REST API
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: ApiClient,
    snapshot: Arc<RwLock<StoreSnapshot>>,
}

impl RemoteStore {
    pub fn new(client: ApiClient) -> Self {
        debug!(base_url = %client.base_url(), "RemoteStore::new: called");
        Self {
            client,
            snapshot: Arc::new(RwLock::new(StoreSnapshot::default())),
        }
    }

    /// Copy of the last fetched data
    pub async fn snapshot(&self) -> StoreSnapshot {
        self.snapshot.read().await.clone()
    }
}

#[async_trait]
impl Refresher for RemoteStore {
    async fn load_tasks(&self) -> Result<(), ApiError> {
        debug!("load_tasks: called");
        let listing: Listing<Task> = self.client.get_json(TASKS_PATH).await?;
        let tasks = listing.into_vec();
        debug!(count = tasks.len(), "load_tasks: fetched");
        self.snapshot.write().await.tasks = tasks;
        Ok(())
    }

    async fn load_categories(&self) -> Result<(), ApiError> {
        debug!("load_categories: called");
        let listing: Listing<Category> = self.client.get_json(CATEGORIES_PATH).await?;
        let categories = listing.into_vec();
        debug!(count = categories.len(), "load_categories: fetched");
        self.snapshot.write().await.categories = categories;
        Ok(())
    }

    async fn load_stats(&self) -> Result<(), ApiError> {
        debug!("load_stats: called");
        let stats: TaskStats = self.client.get_json(STATS_PATH).await?;
        self.snapshot.write().await.stats = Some(stats);
        Ok(())
    }
}
