//! In-memory stand-in for the remote data service.
//!
//! Keeps every user's collections in process, records each intent it
//! receives, and pushes the owner's full collection to subscribers after
//! every change. Used by tests and by the scenario driver.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::rc::{Rc, Weak};

use anyhow::{Context, anyhow};
use chrono::Utc;
use mrplan_shared::{Bucket, Intent, ProjectDto, TaskCreate, TaskDto, TaskPatch, UserId};
use serde::Deserialize;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::store::{FeedCallback, Subscription, TaskService};

struct Subscriber<T> {
    id: u64,
    user: UserId,
    callback: FeedCallback<T>,
}

#[derive(Default)]
struct Inner {
    tasks: RefCell<Vec<TaskDto>>,
    projects: RefCell<Vec<ProjectDto>>,
    task_subs: RefCell<Vec<Subscriber<TaskDto>>>,
    project_subs: RefCell<Vec<Subscriber<ProjectDto>>>,
    intents: RefCell<Vec<Intent>>,
    next_sub: Cell<u64>,
    held: Cell<bool>,
    dirty: RefCell<BTreeSet<UserId>>,
}

#[derive(Clone, Default)]
pub struct MemoryService {
    inner: Rc<Inner>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    #[tracing::instrument(skip(seed), fields(user = %seed.user))]
    pub fn with_seed(seed: &Seed) -> anyhow::Result<Self> {
        let service = Self::new();
        let mut project_ids = Vec::with_capacity(seed.projects.len());
        for project in &seed.projects {
            let id = project.id.unwrap_or_else(Uuid::new_v4);
            service.inner.projects.borrow_mut().push(ProjectDto {
                id,
                name: project.name.clone(),
                owner: seed.user.clone(),
            });
            project_ids.push((project.name.as_str(), id));
        }

        for task in &seed.tasks {
            let project_id = match (&task.project, task.project_id) {
                (Some(name), _) => Some(
                    project_ids
                        .iter()
                        .find(|(n, _)| *n == name.as_str())
                        .map(|(_, id)| *id)
                        .ok_or_else(|| {
                            anyhow!("seed task `{}` references unknown project `{name}`", task.title)
                        })?,
                ),
                (None, raw) => raw,
            };
            let now = Utc::now().to_rfc3339();
            service.inner.tasks.borrow_mut().push(TaskDto {
                id: task.id.unwrap_or_else(Uuid::new_v4),
                title: task.title.clone(),
                bucket: task.bucket,
                completed: task.completed,
                estimated_time: task.estimated_time,
                project_id,
                owner: seed.user.clone(),
                created_at: Some(now.clone()),
                updated_at: Some(now),
            });
        }

        info!(
            tasks = seed.tasks.len(),
            projects = seed.projects.len(),
            "seeded memory service"
        );
        Ok(service)
    }

    /// Adds a task as if another client had created it. Not logged as an
    /// intent.
    pub fn insert_task(&self, owner: &UserId, title: &str, bucket: Bucket) -> Uuid {
        let now = Utc::now().to_rfc3339();
        let id = Uuid::new_v4();
        self.inner.tasks.borrow_mut().push(TaskDto {
            id,
            title: title.to_string(),
            bucket,
            completed: false,
            estimated_time: None,
            project_id: None,
            owner: owner.clone(),
            created_at: Some(now.clone()),
            updated_at: Some(now),
        });
        self.push_tasks(owner);
        id
    }

    pub fn insert_project(&self, owner: &UserId, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.projects.borrow_mut().push(ProjectDto {
            id,
            name: name.to_string(),
            owner: owner.clone(),
        });
        self.push_projects(owner);
        id
    }

    /// Removes a task out of band, as a concurrent session would.
    pub fn remove_task(&self, task_id: Uuid) {
        if let Some(owner) = self.take_task(task_id) {
            self.push_tasks(&owner);
        }
    }

    /// Removes a project without touching tasks that reference it.
    pub fn remove_project(&self, project_id: Uuid) {
        let removed = {
            let mut projects = self.inner.projects.borrow_mut();
            let idx = projects.iter().position(|p| p.id == project_id);
            idx.map(|idx| projects.remove(idx))
        };
        if let Some(project) = removed {
            self.push_projects(&project.owner);
        }
    }

    pub fn intents(&self) -> Vec<Intent> {
        self.inner.intents.borrow().clone()
    }

    pub fn take_intents(&self) -> Vec<Intent> {
        std::mem::take(&mut *self.inner.intents.borrow_mut())
    }

    pub fn tasks(&self) -> Vec<TaskDto> {
        self.inner.tasks.borrow().clone()
    }

    pub fn projects(&self) -> Vec<ProjectDto> {
        self.inner.projects.borrow().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.task_subs.borrow().len() + self.inner.project_subs.borrow().len()
    }

    /// Queues pushes instead of delivering them, like a slow network.
    pub fn hold_pushes(&self) {
        self.inner.held.set(true);
    }

    /// Delivers one push per user whose collections changed while held.
    pub fn release_pushes(&self) {
        self.inner.held.set(false);
        let dirty = std::mem::take(&mut *self.inner.dirty.borrow_mut());
        for user in dirty {
            self.push_tasks(&user);
            self.push_projects(&user);
        }
    }

    fn log(&self, intent: Intent) {
        trace!(?intent, "recorded intent");
        self.inner.intents.borrow_mut().push(intent);
    }

    fn take_task(&self, task_id: Uuid) -> Option<UserId> {
        let mut tasks = self.inner.tasks.borrow_mut();
        let idx = tasks.iter().position(|t| t.id == task_id)?;
        Some(tasks.remove(idx).owner)
    }

    fn user_tasks(&self, user: &UserId) -> Vec<TaskDto> {
        self.inner
            .tasks
            .borrow()
            .iter()
            .filter(|t| &t.owner == user)
            .cloned()
            .collect()
    }

    fn user_projects(&self, user: &UserId) -> Vec<ProjectDto> {
        self.inner
            .projects
            .borrow()
            .iter()
            .filter(|p| &p.owner == user)
            .cloned()
            .collect()
    }

    fn push_tasks(&self, user: &UserId) {
        if self.inner.held.get() {
            self.inner.dirty.borrow_mut().insert(user.clone());
            return;
        }
        let tasks = self.user_tasks(user);
        let mut subs = self.inner.task_subs.borrow_mut();
        for sub in subs.iter_mut().filter(|s| &s.user == user) {
            (sub.callback)(tasks.clone());
        }
    }

    fn push_projects(&self, user: &UserId) {
        if self.inner.held.get() {
            self.inner.dirty.borrow_mut().insert(user.clone());
            return;
        }
        let projects = self.user_projects(user);
        let mut subs = self.inner.project_subs.borrow_mut();
        for sub in subs.iter_mut().filter(|s| &s.user == user) {
            (sub.callback)(projects.clone());
        }
    }

    fn next_sub_id(&self) -> u64 {
        let id = self.inner.next_sub.get() + 1;
        self.inner.next_sub.set(id);
        id
    }
}

fn cancel_task_sub(inner: &Weak<Inner>, id: u64) {
    if let Some(inner) = inner.upgrade() {
        inner.task_subs.borrow_mut().retain(|s| s.id != id);
        debug!(id, "task subscription cancelled");
    }
}

fn cancel_project_sub(inner: &Weak<Inner>, id: u64) {
    if let Some(inner) = inner.upgrade() {
        inner.project_subs.borrow_mut().retain(|s| s.id != id);
        debug!(id, "project subscription cancelled");
    }
}

impl TaskService for MemoryService {
    fn subscribe_tasks(&self, user: &UserId, mut callback: FeedCallback<TaskDto>) -> Subscription {
        let id = self.next_sub_id();
        callback(self.user_tasks(user));
        self.inner.task_subs.borrow_mut().push(Subscriber {
            id,
            user: user.clone(),
            callback,
        });
        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || cancel_task_sub(&weak, id))
    }

    fn subscribe_projects(
        &self,
        user: &UserId,
        mut callback: FeedCallback<ProjectDto>,
    ) -> Subscription {
        let id = self.next_sub_id();
        callback(self.user_projects(user));
        self.inner.project_subs.borrow_mut().push(Subscriber {
            id,
            user: user.clone(),
            callback,
        });
        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || cancel_project_sub(&weak, id))
    }

    fn create_task(&self, owner: &UserId, fields: TaskCreate) {
        self.log(Intent::Create {
            owner: owner.clone(),
            fields: fields.clone(),
        });
        let now = Utc::now().to_rfc3339();
        self.inner.tasks.borrow_mut().push(TaskDto {
            id: Uuid::new_v4(),
            title: fields.title,
            bucket: fields.bucket,
            completed: fields.completed,
            estimated_time: fields.estimated_time,
            project_id: fields.project_id,
            owner: owner.clone(),
            created_at: Some(now.clone()),
            updated_at: Some(now),
        });
        self.push_tasks(owner);
    }

    fn update_task(&self, task_id: Uuid, patch: TaskPatch) {
        self.log(Intent::Update {
            task_id,
            patch: patch.clone(),
        });
        let owner = {
            let mut tasks = self.inner.tasks.borrow_mut();
            tasks.iter_mut().find(|t| t.id == task_id).map(|task| {
                patch.apply_to(task);
                task.updated_at = Some(Utc::now().to_rfc3339());
                task.owner.clone()
            })
        };
        match owner {
            Some(owner) => self.push_tasks(&owner),
            None => debug!(%task_id, "update for unknown task dropped"),
        }
    }

    fn delete_task(&self, task_id: Uuid) {
        self.log(Intent::Delete { task_id });
        match self.take_task(task_id) {
            Some(owner) => self.push_tasks(&owner),
            None => debug!(%task_id, "delete for unknown task dropped"),
        }
    }
}

/// Initial collections for a memory service, read from JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct Seed {
    pub user: UserId,
    #[serde(default)]
    pub projects: Vec<SeedProject>,
    #[serde(default)]
    pub tasks: Vec<SeedTask>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedProject {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedTask {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub title: String,
    #[serde(rename = "section", default = "default_seed_bucket")]
    pub bucket: Bucket,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub estimated_time: Option<u32>,
    /// Project by name.
    #[serde(default)]
    pub project: Option<String>,
    /// Raw project id; may point nowhere.
    #[serde(default)]
    pub project_id: Option<Uuid>,
}

fn default_seed_bucket() -> Bucket {
    Bucket::Inbox
}

impl Seed {
    #[tracing::instrument]
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read seed {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed parsing seed {}", path.display()))
    }
}
