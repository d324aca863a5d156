use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use mrplan_shared::{
    ProjectDto, TaskCreate, TaskDto, TaskPatch, UserId,
};
use tracing::{debug, info};
use uuid::Uuid;

pub type FeedCallback<T> = Box<dyn FnMut(Vec<T>)>;

/// The remote data collaborator. Collections are pushed whole and in
/// feed order; mutations are fire-and-forget.
///
/// Callbacks may be invoked synchronously from inside `subscribe_*` and
/// from inside any mutation. They must not call back into the service.
pub trait TaskService {
    fn subscribe_tasks(&self, user: &UserId, callback: FeedCallback<TaskDto>) -> Subscription;

    fn subscribe_projects(
        &self,
        user: &UserId,
        callback: FeedCallback<ProjectDto>,
    ) -> Subscription;

    fn create_task(&self, owner: &UserId, fields: TaskCreate);

    fn update_task(&self, task_id: Uuid, patch: TaskPatch);

    fn delete_task(&self, task_id: Uuid);
}

/// Unsubscribe handle. Dropping it unsubscribes.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Immutable view of the feed as of one push.
#[derive(Debug, Clone)]
pub struct Snapshot {
    tasks: Rc<[TaskDto]>,
    projects: Rc<[ProjectDto]>,
    revision: u64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            tasks: Rc::from(Vec::new()),
            projects: Rc::from(Vec::new()),
            revision: 0,
        }
    }
}

impl Snapshot {
    pub fn tasks(&self) -> &[TaskDto] {
        &self.tasks
    }

    pub fn projects(&self) -> &[ProjectDto] {
        &self.projects
    }

    /// Bumped once per applied push, tasks or projects.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn task(&self, id: Uuid) -> Option<&TaskDto> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn project(&self, id: Uuid) -> Option<&ProjectDto> {
        self.projects.iter().find(|p| p.id == id)
    }

    fn with_tasks(&self, tasks: Vec<TaskDto>) -> Self {
        Self {
            tasks: Rc::from(tasks),
            projects: Rc::clone(&self.projects),
            revision: self.revision + 1,
        }
    }

    fn with_projects(&self, projects: Vec<ProjectDto>) -> Self {
        Self {
            tasks: Rc::clone(&self.tasks),
            projects: Rc::from(projects),
            revision: self.revision + 1,
        }
    }
}

struct ActiveFeed {
    user: UserId,
    _tasks: Subscription,
    _projects: Subscription,
}

/// Keeps the latest snapshot of the active user's feed. The only writer
/// of the cache; everything else reads snapshots.
pub struct StoreAdapter {
    service: Rc<dyn TaskService>,
    current: Rc<RefCell<Snapshot>>,
    active: Option<ActiveFeed>,
}

impl StoreAdapter {
    pub fn new(service: Rc<dyn TaskService>) -> Self {
        Self {
            service,
            current: Rc::new(RefCell::new(Snapshot::default())),
            active: None,
        }
    }

    /// Subscribes both feeds for `user`. A no-op when that user is
    /// already attached; a different user replaces the old feeds.
    #[tracing::instrument(skip(self), fields(user = %user))]
    pub fn attach(&mut self, user: &UserId) {
        if self.active_user() == Some(user) {
            debug!("feed already attached");
            return;
        }
        self.detach();

        let tasks_sink = Rc::clone(&self.current);
        let tasks = self.service.subscribe_tasks(
            user,
            Box::new(move |tasks: Vec<TaskDto>| {
                let mut current = tasks_sink.borrow_mut();
                let next = current.with_tasks(tasks);
                debug!(
                    count = next.tasks().len(),
                    revision = next.revision(),
                    "applied task push"
                );
                *current = next;
            }),
        );

        let projects_sink = Rc::clone(&self.current);
        let projects = self.service.subscribe_projects(
            user,
            Box::new(move |projects: Vec<ProjectDto>| {
                let mut current = projects_sink.borrow_mut();
                let next = current.with_projects(projects);
                debug!(
                    count = next.projects().len(),
                    revision = next.revision(),
                    "applied project push"
                );
                *current = next;
            }),
        );

        info!("attached feeds");
        self.active = Some(ActiveFeed {
            user: user.clone(),
            _tasks: tasks,
            _projects: projects,
        });
    }

    /// Drops both subscriptions and forgets the cached collections.
    pub fn detach(&mut self) {
        if let Some(active) = self.active.take() {
            info!(user = %active.user, "detaching feeds");
            drop(active);
            *self.current.borrow_mut() = Snapshot::default();
        }
    }

    pub fn active_user(&self) -> Option<&UserId> {
        self.active.as_ref().map(|a| &a.user)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.current.borrow().clone()
    }

    pub fn service(&self) -> &Rc<dyn TaskService> {
        &self.service
    }
}

impl Drop for StoreAdapter {
    fn drop(&mut self) {
        self.detach();
    }
}
