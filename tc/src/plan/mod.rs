//! Plans proposed by the assistant and their previews

mod model;
mod priority;
pub mod summary;

pub use model::{
    CategoryDeletion, CategoryUpdate, NewCategory, NewTask, Plan, PlanError, TaskDeletion, TaskRef, TaskUpdate,
};
pub use priority::Priority;
pub use summary::{DEFAULT_PREVIEW_LIMIT, OperationKind, PlanPreview, PlanSummary, SummarySection, summarize};
