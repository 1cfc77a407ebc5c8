//! In-memory project/task store.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use portal_auth::{OwnedResource, OwnershipResolver};
use portal_core::{ProjectId, StoreResult, TaskId, UserId};

use super::{
    NewProject, NewTask, Project, ProjectSummary, Task, TaskStatus, UpdateProject, UpdateTask,
    WorkspaceCounts, WorkspaceStore,
};

/// Map-backed workspace store for development and tests. Also resolves
/// ownership: projects own directly, tasks through their parent project.
#[derive(Default)]
pub struct InMemoryWorkspaceStore {
    projects: RwLock<HashMap<i64, Project>>,
    tasks: RwLock<HashMap<i64, Task>>,
    next_project_id: AtomicI64,
    next_task_id: AtomicI64,
}

impl InMemoryWorkspaceStore {
    pub fn new() -> Self {
        Self {
            projects: RwLock::new(HashMap::new()),
            tasks: RwLock::new(HashMap::new()),
            next_project_id: AtomicI64::new(1),
            next_task_id: AtomicI64::new(1),
        }
    }

    /// Insert a project with a caller-chosen id (test fixtures).
    pub fn seed_project(&self, project: Project) {
        let id = project.id.as_i64();
        self.next_project_id.fetch_max(id + 1, Ordering::SeqCst);
        self.projects.write().unwrap().insert(id, project);
    }

    /// Insert a task with a caller-chosen id (test fixtures).
    pub fn seed_task(&self, task: Task) {
        let id = task.id.as_i64();
        self.next_task_id.fetch_max(id + 1, Ordering::SeqCst);
        self.tasks.write().unwrap().insert(id, task);
    }

    fn task_rollup(&self, project: ProjectId) -> (u64, u64) {
        let tasks = self.tasks.read().unwrap();
        let mut total = 0;
        let mut done = 0;
        for task in tasks.values().filter(|t| t.project_id == project) {
            total += 1;
            if task.status == TaskStatus::Done {
                done += 1;
            }
        }
        (total, done)
    }
}

#[async_trait]
impl WorkspaceStore for InMemoryWorkspaceStore {
    async fn list_projects(&self, owner: Option<UserId>) -> StoreResult<Vec<ProjectSummary>> {
        let mut projects: Vec<Project> = self
            .projects
            .read()
            .unwrap()
            .values()
            .filter(|p| owner.is_none_or(|o| p.owner_id == o))
            .cloned()
            .collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(projects
            .into_iter()
            .map(|project| {
                let (task_count, completed_tasks) = self.task_rollup(project.id);
                ProjectSummary {
                    project,
                    task_count,
                    completed_tasks,
                }
            })
            .collect())
    }

    async fn get_project(&self, id: ProjectId) -> StoreResult<Option<Project>> {
        Ok(self.projects.read().unwrap().get(&id.as_i64()).cloned())
    }

    async fn create_project(&self, new: NewProject) -> StoreResult<Project> {
        let id = self.next_project_id.fetch_add(1, Ordering::SeqCst);
        let project = Project {
            id: ProjectId::new(id),
            name: new.name,
            description: new.description,
            owner_id: new.owner_id,
            created_at: Utc::now(),
        };
        self.projects.write().unwrap().insert(id, project.clone());
        Ok(project)
    }

    async fn update_project(
        &self,
        id: ProjectId,
        update: UpdateProject,
    ) -> StoreResult<Option<Project>> {
        let mut projects = self.projects.write().unwrap();
        Ok(projects.get_mut(&id.as_i64()).map(|project| {
            project.name = update.name;
            project.description = update.description;
            project.clone()
        }))
    }

    async fn delete_project(&self, id: ProjectId) -> StoreResult<bool> {
        let removed = self.projects.write().unwrap().remove(&id.as_i64());
        if removed.is_some() {
            self.tasks.write().unwrap().retain(|_, t| t.project_id != id);
        }
        Ok(removed.is_some())
    }

    async fn list_tasks(&self, project: ProjectId) -> StoreResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tasks
            .read()
            .unwrap()
            .values()
            .filter(|t| t.project_id == project)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tasks)
    }

    async fn get_task(&self, project: ProjectId, task: TaskId) -> StoreResult<Option<Task>> {
        Ok(self
            .tasks
            .read()
            .unwrap()
            .get(&task.as_i64())
            .filter(|t| t.project_id == project)
            .cloned())
    }

    async fn create_task(&self, project: ProjectId, new: NewTask) -> StoreResult<Task> {
        let id = self.next_task_id.fetch_add(1, Ordering::SeqCst);
        let task = Task {
            id: TaskId::new(id),
            project_id: project,
            title: new.title,
            description: new.description,
            status: new.status,
            created_at: Utc::now(),
        };
        self.tasks.write().unwrap().insert(id, task.clone());
        Ok(task)
    }

    async fn update_task(
        &self,
        project: ProjectId,
        task: TaskId,
        update: UpdateTask,
    ) -> StoreResult<Option<Task>> {
        let mut tasks = self.tasks.write().unwrap();
        Ok(tasks
            .get_mut(&task.as_i64())
            .filter(|t| t.project_id == project)
            .map(|t| {
                t.title = update.title;
                t.description = update.description;
                t.status = update.status;
                t.clone()
            }))
    }

    async fn delete_task(&self, project: ProjectId, task: TaskId) -> StoreResult<bool> {
        let mut tasks = self.tasks.write().unwrap();
        match tasks.get(&task.as_i64()) {
            Some(t) if t.project_id == project => {
                tasks.remove(&task.as_i64());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn project_count_for(&self, owner: UserId) -> StoreResult<u64> {
        Ok(self
            .projects
            .read()
            .unwrap()
            .values()
            .filter(|p| p.owner_id == owner)
            .count() as u64)
    }

    async fn task_count_for(&self, owner: UserId) -> StoreResult<u64> {
        let owned: Vec<ProjectId> = self
            .projects
            .read()
            .unwrap()
            .values()
            .filter(|p| p.owner_id == owner)
            .map(|p| p.id)
            .collect();
        Ok(self
            .tasks
            .read()
            .unwrap()
            .values()
            .filter(|t| owned.contains(&t.project_id))
            .count() as u64)
    }

    async fn recent_projects_for(&self, owner: UserId, limit: u64) -> StoreResult<Vec<Project>> {
        let mut projects: Vec<Project> = self
            .projects
            .read()
            .unwrap()
            .values()
            .filter(|p| p.owner_id == owner)
            .cloned()
            .collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        projects.truncate(limit as usize);
        Ok(projects)
    }

    async fn counts(&self) -> StoreResult<WorkspaceCounts> {
        let total_projects = self.projects.read().unwrap().len() as u64;
        let tasks = self.tasks.read().unwrap();

        let mut counts = WorkspaceCounts {
            total_projects,
            total_tasks: tasks.len() as u64,
            ..WorkspaceCounts::default()
        };
        for task in tasks.values() {
            match task.status {
                TaskStatus::New => counts.new_tasks += 1,
                TaskStatus::InProgress => counts.in_progress_tasks += 1,
                TaskStatus::Done => counts.completed_tasks += 1,
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl OwnershipResolver for InMemoryWorkspaceStore {
    async fn owner_of(&self, resource: OwnedResource) -> StoreResult<Option<UserId>> {
        match resource {
            OwnedResource::Project(id) => Ok(self
                .projects
                .read()
                .unwrap()
                .get(&id.as_i64())
                .map(|p| p.owner_id)),
            OwnedResource::Task(id) => {
                let project_id = match self.tasks.read().unwrap().get(&id.as_i64()) {
                    Some(task) => task.project_id,
                    None => return Ok(None),
                };
                Ok(self
                    .projects
                    .read()
                    .unwrap()
                    .get(&project_id.as_i64())
                    .map(|p| p.owner_id))
            }
        }
    }
}
