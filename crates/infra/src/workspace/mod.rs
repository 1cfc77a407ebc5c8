//! Project/task storage contract.
//!
//! From the auth core's perspective this is an external collaborator: a
//! plain row-oriented store that is only ever called after authorization has
//! passed, and that reports success/failure so the call can be audited. It
//! also backs ownership resolution (a task owns through its parent project).

mod in_memory;

pub use in_memory::InMemoryWorkspaceStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use portal_core::{ProjectId, StoreResult, TaskId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    New,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::New => "new",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(TaskStatus::New),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub owner_id: UserId,
}

#[derive(Debug, Clone)]
pub struct UpdateProject {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
}

#[derive(Debug, Clone)]
pub struct UpdateTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
}

/// A project with its task rollups, for listing surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: Project,
    pub task_count: u64,
    pub completed_tasks: u64,
}

/// Workspace-wide aggregates for the statistics surface.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkspaceCounts {
    pub total_projects: u64,
    pub total_tasks: u64,
    pub new_tasks: u64,
    pub in_progress_tasks: u64,
    pub completed_tasks: u64,
}

#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    /// Projects with task rollups, newest first. `owner` scopes to one
    /// identity (regular users); `None` lists everything (admins).
    async fn list_projects(&self, owner: Option<UserId>) -> StoreResult<Vec<ProjectSummary>>;

    async fn get_project(&self, id: ProjectId) -> StoreResult<Option<Project>>;

    async fn create_project(&self, new: NewProject) -> StoreResult<Project>;

    /// `None` when the project does not exist.
    async fn update_project(
        &self,
        id: ProjectId,
        update: UpdateProject,
    ) -> StoreResult<Option<Project>>;

    /// `true` when a row was deleted. Tasks go with their project.
    async fn delete_project(&self, id: ProjectId) -> StoreResult<bool>;

    /// Tasks of one project, newest first.
    async fn list_tasks(&self, project: ProjectId) -> StoreResult<Vec<Task>>;

    /// Scoped lookup: the task must belong to `project`.
    async fn get_task(&self, project: ProjectId, task: TaskId) -> StoreResult<Option<Task>>;

    async fn create_task(&self, project: ProjectId, new: NewTask) -> StoreResult<Task>;

    async fn update_task(
        &self,
        project: ProjectId,
        task: TaskId,
        update: UpdateTask,
    ) -> StoreResult<Option<Task>>;

    async fn delete_task(&self, project: ProjectId, task: TaskId) -> StoreResult<bool>;

    /// Number of projects owned by `owner`.
    async fn project_count_for(&self, owner: UserId) -> StoreResult<u64>;

    /// Number of tasks under projects owned by `owner`.
    async fn task_count_for(&self, owner: UserId) -> StoreResult<u64>;

    /// Most recently created projects for `owner`.
    async fn recent_projects_for(&self, owner: UserId, limit: u64) -> StoreResult<Vec<Project>>;

    async fn counts(&self) -> StoreResult<WorkspaceCounts>;
}
