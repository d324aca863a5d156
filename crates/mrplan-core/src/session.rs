//! The root object a UI shell drives.
//!
//! Owns the feed adapter and every piece of transient interaction state.
//! Each user operation reads the latest snapshot, asks the pure layers
//! what should happen and issues at most one intent, synchronously and
//! in call order.

use std::rc::Rc;
use std::time::Duration;

use mrplan_shared::{Bucket, Intent, ProjectDto, TaskDto, TaskPatch, UserId};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::classify;
use crate::config::Settings;
use crate::drag::{DragController, DragPayload, Release};
use crate::overlay::{
    AddTaskDraft, Effect, Overlay, OverlayCoordinator, OverlayEvent, Transition,
};
use crate::store::{Snapshot, StoreAdapter, TaskService};
use crate::view::{DrawerEndpoint, ViewTransition};

/// What the auth collaborator reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<UserId>,
    pub initializing: bool,
}

impl AuthState {
    pub fn signed_in(user: UserId) -> Self {
        Self {
            user: Some(user),
            initializing: false,
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }
}

/// Inputs for the edit overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct EditContext {
    pub task: TaskDto,
    pub projects: Vec<ProjectDto>,
}

/// One-line summary of the transient state, for the driver's output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub user: Option<UserId>,
    pub ready: bool,
    pub drawer: &'static str,
    pub drawer_progress: f32,
    pub corner_radius: f32,
    pub vertical: &'static str,
    pub vertical_progress: f32,
    pub overlay: &'static str,
    pub selected: Option<String>,
    pub dragging: Option<Uuid>,
    pub hovered: Option<Bucket>,
}

pub struct Session {
    settings: Settings,
    store: StoreAdapter,
    auth: AuthState,
    drag: DragController,
    view: ViewTransition,
    overlay: OverlayCoordinator,
}

impl Session {
    pub fn new(service: Rc<dyn TaskService>, settings: Settings) -> Self {
        Self {
            store: StoreAdapter::new(service),
            auth: AuthState::default(),
            drag: DragController::new(settings.long_press),
            view: ViewTransition::new(&settings),
            overlay: OverlayCoordinator::new(settings.edit_delay),
            settings,
        }
    }

    /// Follows the auth collaborator. Feeds are held only for a signed-in,
    /// initialized user; any change of user starts from rest.
    #[tracing::instrument(skip(self), fields(user = ?auth.user, initializing = auth.initializing))]
    pub fn set_auth(&mut self, auth: AuthState) {
        let wanted = match (&auth.user, auth.initializing) {
            (Some(user), false) => Some(user.clone()),
            _ => None,
        };
        if wanted.as_ref() != self.store.active_user() {
            self.reset_transient();
            match &wanted {
                Some(user) => {
                    info!(%user, "session signed in");
                    self.store.attach(user);
                }
                None => {
                    info!("session has no user; releasing feeds");
                    self.store.detach();
                }
            }
        }
        self.auth = auth;
    }

    pub fn user(&self) -> Option<&UserId> {
        self.store.active_user()
    }

    /// False while auth is initializing or nobody is signed in; the shell
    /// renders nothing then.
    pub fn is_ready(&self) -> bool {
        !self.auth.initializing && self.store.active_user().is_some()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    pub fn visible_tasks(&self, bucket: Bucket) -> Vec<TaskDto> {
        let snapshot = self.snapshot();
        classify::visible_tasks_for_bucket(snapshot.tasks(), bucket)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn board(&self) -> Vec<(Bucket, Vec<TaskDto>)> {
        let snapshot = self.snapshot();
        classify::board(snapshot.tasks())
            .into_iter()
            .map(|(bucket, tasks)| (bucket, tasks.into_iter().cloned().collect()))
            .collect()
    }

    /// Returns whether an intent was issued.
    pub fn move_task(&mut self, task_id: Uuid, from: Bucket, to: Bucket) -> bool {
        if !self.is_ready() {
            return false;
        }
        let snapshot = self.snapshot();
        match classify::move_task(snapshot.tasks(), task_id, from, to) {
            Some(intent) => {
                self.dispatch(intent);
                true
            }
            None => false,
        }
    }

    pub fn complete_task(&mut self, task_id: Uuid) -> bool {
        if !self.is_ready() {
            return false;
        }
        let snapshot = self.snapshot();
        match classify::complete_task(snapshot.tasks(), task_id) {
            Some(intent) => {
                self.dispatch(intent);
                true
            }
            None => false,
        }
    }

    // drag and taps

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    /// Finger down on a task's primary region. Ignored under an overlay;
    /// returns whether the press registered.
    pub fn press_task(&mut self, task_id: Uuid, bucket: Bucket) -> bool {
        if !self.is_ready() || self.overlay.is_open() {
            debug!(%task_id, "press blocked");
            return false;
        }
        self.drag.press(task_id, bucket);
        true
    }

    /// Finger up off any drop zone. A short press toggles completion; a
    /// drag is cancelled.
    pub fn release_press(&mut self) -> Release {
        let release = self.drag.release();
        if let Release::Tap(task_id) = release {
            self.complete_task(task_id);
        }
        release
    }

    /// Starts a drag without the long-press timer. Ignored under an
    /// overlay.
    pub fn start_drag(&mut self, task_id: Uuid, from_bucket: Bucket) -> bool {
        if !self.is_ready() || self.overlay.is_open() {
            debug!(%task_id, "drag blocked");
            return false;
        }
        self.drag.start(DragPayload {
            task_id,
            from_bucket,
        });
        true
    }

    pub fn drag_enter(&mut self, bucket: Bucket) {
        self.drag.enter(bucket);
    }

    pub fn drag_exit(&mut self, bucket: Bucket) {
        self.drag.exit(bucket);
    }

    /// Drops the dragged task on `bucket`. Returns whether a move intent
    /// was issued.
    pub fn drop_on(&mut self, bucket: Bucket) -> bool {
        let Some(commit) = self.drag.drop_on(bucket) else {
            debug!(%bucket, "drop with no drag in progress");
            return false;
        };
        self.move_task(
            commit.payload.task_id,
            commit.payload.from_bucket,
            commit.to_bucket,
        )
    }

    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    /// Tap on a task's options region. Leaves drag state alone; refused
    /// mid-pan.
    pub fn tap_options(&mut self, task_id: Uuid) -> Transition {
        if !self.is_ready() || self.view.is_panning() {
            return Transition::Rejected;
        }
        let snapshot = self.snapshot();
        let Some(task) = snapshot.task(task_id) else {
            debug!(%task_id, "options for task not in cache");
            return Transition::Rejected;
        };
        self.handle(OverlayEvent::OpenTaskMenu(task.clone()))
    }

    // overlays

    pub fn overlay(&self) -> &Overlay {
        self.overlay.state()
    }

    pub fn selected_task(&self) -> Option<&TaskDto> {
        self.overlay.selected_task()
    }

    pub fn open_add_task(&mut self, default_bucket: Bucket) -> Transition {
        if !self.is_ready() || self.gesture_in_flight() {
            return Transition::Rejected;
        }
        self.handle(OverlayEvent::OpenAddTask(default_bucket))
    }

    pub fn open_add_task_from_dashboard(&mut self) -> Transition {
        self.open_add_task(self.settings.dashboard_bucket)
    }

    pub fn open_add_task_from_organizer(&mut self) -> Transition {
        self.open_add_task(self.settings.organizer_bucket)
    }

    pub fn draft(&self) -> &AddTaskDraft {
        self.overlay.draft()
    }

    /// `None` unless the add-task form is open.
    pub fn draft_mut(&mut self) -> Option<&mut AddTaskDraft> {
        self.overlay.draft_mut()
    }

    pub fn submit_add_task(&mut self) -> Transition {
        self.handle(OverlayEvent::SubmitAddTask)
    }

    pub fn menu_edit(&mut self) -> Transition {
        self.handle(OverlayEvent::ChooseEdit)
    }

    pub fn menu_delete(&mut self) -> Transition {
        self.handle(OverlayEvent::ChooseDelete)
    }

    pub fn confirm_delete(&mut self) -> Transition {
        self.handle(OverlayEvent::ConfirmDelete)
    }

    pub fn cancel_delete(&mut self) -> Transition {
        self.handle(OverlayEvent::CancelDelete)
    }

    pub fn close_overlay(&mut self) -> Transition {
        self.handle(OverlayEvent::Dismiss)
    }

    /// Save callback of the edit overlay. Always closes it; the update is
    /// only issued for a task still in the cache and a non-empty patch.
    pub fn save_edit(&mut self, patch: TaskPatch) -> Transition {
        self.handle(OverlayEvent::SaveEdit(patch))
    }

    /// What the edit overlay needs, once it is actually open.
    pub fn edit_context(&self) -> Option<EditContext> {
        let Overlay::EditTask(task) = self.overlay.state() else {
            return None;
        };
        Some(EditContext {
            task: task.clone(),
            projects: self.snapshot().projects().to_vec(),
        })
    }

    pub fn open_calendar(&mut self) -> Transition {
        if !self.is_ready() || self.gesture_in_flight() {
            return Transition::Rejected;
        }
        self.handle(OverlayEvent::OpenCalendar)
    }

    pub fn close_calendar(&mut self) -> Transition {
        self.handle(OverlayEvent::CloseCalendar)
    }

    /// A pan, a drag or a pending long press.
    fn gesture_in_flight(&self) -> bool {
        self.view.is_panning() || self.drag.is_dragging() || self.drag.is_pressing()
    }

    fn handle(&mut self, event: OverlayEvent) -> Transition {
        let transition = self.overlay.handle(event);
        if let Transition::Applied(Some(effect)) = &transition {
            self.apply_effect(effect.clone());
        }
        transition
    }

    fn apply_effect(&self, effect: Effect) {
        let snapshot = self.snapshot();
        let intent = match effect {
            Effect::Create(fields) => {
                let Some(owner) = self.store.active_user().cloned() else {
                    debug!("create with no user; dropped");
                    return;
                };
                Intent::Create { owner, fields }
            }
            Effect::Update { task_id, patch } => {
                if snapshot.task(task_id).is_none() {
                    debug!(%task_id, "edit for task not in cache; dropped");
                    return;
                }
                if patch.is_empty() {
                    debug!(%task_id, "edit changed nothing");
                    return;
                }
                Intent::Update { task_id, patch }
            }
            Effect::Delete(task_id) => {
                if snapshot.task(task_id).is_none() {
                    debug!(%task_id, "delete for task not in cache; dropped");
                    return;
                }
                Intent::Delete { task_id }
            }
        };
        self.dispatch(intent);
    }

    // view

    pub fn view(&self) -> &ViewTransition {
        &self.view
    }

    /// Pans are blocked while an overlay covers the view.
    pub fn pan_begin(&mut self) -> bool {
        if !self.is_ready() || self.overlay.is_open() {
            debug!("pan blocked");
            return false;
        }
        self.view.pan_begin();
        true
    }

    pub fn pan_update(&mut self, translation_x: f32) {
        self.view.pan_update(translation_x);
    }

    pub fn pan_end(&mut self) -> Option<DrawerEndpoint> {
        self.view.pan_end()
    }

    pub fn navigate_to_organizer(&mut self) {
        if self.is_ready() {
            self.view.navigate_to_organizer();
        }
    }

    pub fn navigate_to_dashboard(&mut self) {
        if self.is_ready() {
            self.view.navigate_to_dashboard();
        }
    }

    /// One frame of wall time for motion, the long-press timer and the
    /// menu-to-edit hand-off.
    pub fn advance(&mut self, dt: Duration) {
        self.view.tick(dt);
        if self.overlay.advance(dt) {
            debug!("edit overlay opened");
        }
        if let Some(payload) = self.drag.advance(dt) {
            debug!(task_id = %payload.task_id, "long press became drag");
        }
    }

    pub fn status(&self) -> SessionStatus {
        let drawer = if !self.view.drawer_settled() {
            "moving"
        } else if self.view.drawer_progress() == 0.0 {
            "closed"
        } else {
            "open"
        };
        let vertical = if self.view.organizer_shown() {
            "organizer"
        } else if self.view.vertical_progress() == 0.0 {
            "dashboard"
        } else {
            "moving"
        };
        SessionStatus {
            user: self.user().cloned(),
            ready: self.is_ready(),
            drawer,
            drawer_progress: self.view.drawer_progress(),
            corner_radius: self.view.corner_radius(),
            vertical,
            vertical_progress: self.view.vertical_progress(),
            overlay: self.overlay.kind().as_str(),
            selected: self.overlay.selected_task().map(|t| t.title.clone()),
            dragging: self.drag.payload().map(|p| p.task_id),
            hovered: self.drag.hovered(),
        }
    }

    /// Tears the session down as a UI unmount would.
    pub fn unmount(&mut self) {
        info!("session unmounted");
        self.reset_transient();
        self.store.detach();
    }

    fn reset_transient(&mut self) {
        self.drag.reset();
        self.overlay.reset();
        self.view.reset();
    }

    #[tracing::instrument(skip(self, intent), fields(task_id = ?intent.task_id()))]
    fn dispatch(&self, intent: Intent) {
        debug!(?intent, "issuing intent");
        let service = Rc::clone(self.store.service());
        match intent {
            Intent::Create { owner, fields } => service.create_task(&owner, fields),
            Intent::Update { task_id, patch } => service.update_task(task_id, patch),
            Intent::Delete { task_id } => service.delete_task(task_id),
        }
    }
}
