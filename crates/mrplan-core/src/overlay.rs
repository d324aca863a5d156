//! Single-overlay coordination.
//!
//! At most one modal surface is up at a time. Every change goes through
//! [`next_kind`], the explicit `(state, event) -> state` table; events
//! missing from it are rejected and leave the state untouched.

use std::time::Duration;

use mrplan_shared::{Bucket, TaskCreate, TaskDto, TaskPatch};
use tracing::{debug, warn};
use uuid::Uuid;

/// Estimate choices offered by the add-task form, in minutes.
pub const TIME_OPTIONS: [u32; 7] = [15, 30, 60, 120, 180, 240, 300];

#[derive(Debug, Clone, PartialEq)]
pub struct AddTaskDraft {
    pub title: String,
    pub bucket: Bucket,
    pub estimated_time: Option<u32>,
    pub project_id: Option<Uuid>,
}

impl AddTaskDraft {
    pub fn new(bucket: Bucket) -> Self {
        Self {
            title: String::new(),
            bucket,
            estimated_time: None,
            project_id: None,
        }
    }

    pub fn reset(&mut self, bucket: Bucket) {
        *self = Self::new(bucket);
    }

    /// Picking the selected estimate again clears it. Values the picker
    /// does not offer are ignored.
    pub fn toggle_time(&mut self, minutes: u32) -> bool {
        if !TIME_OPTIONS.contains(&minutes) {
            debug!(minutes, "estimate not offered by the picker");
            return false;
        }
        self.estimated_time = if self.estimated_time == Some(minutes) {
            None
        } else {
            Some(minutes)
        };
        true
    }

    /// Fields for a create intent; `None` while the title is blank.
    pub fn to_create(&self) -> Option<TaskCreate> {
        let title = self.title.trim();
        if title.is_empty() {
            return None;
        }
        Some(TaskCreate {
            title: title.to_string(),
            bucket: self.bucket,
            estimated_time: self.estimated_time.filter(|m| *m > 0),
            project_id: self.project_id,
            completed: false,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    None,
    AddTask,
    TaskMenu(TaskDto),
    /// Destructive confirmation raised from the task menu.
    ConfirmDelete(TaskDto),
    /// Menu dismissed, edit form not up yet.
    PendingEdit {
        task: TaskDto,
        remaining: Duration,
    },
    EditTask(TaskDto),
    Calendar,
}

impl Overlay {
    pub fn kind(&self) -> OverlayKind {
        match self {
            Overlay::None => OverlayKind::None,
            Overlay::AddTask => OverlayKind::AddTask,
            Overlay::TaskMenu(_) => OverlayKind::TaskMenu,
            Overlay::ConfirmDelete(_) => OverlayKind::ConfirmDelete,
            Overlay::PendingEdit { .. } => OverlayKind::PendingEdit,
            Overlay::EditTask(_) => OverlayKind::EditTask,
            Overlay::Calendar => OverlayKind::Calendar,
        }
    }

    pub fn selected_task(&self) -> Option<&TaskDto> {
        match self {
            Overlay::TaskMenu(task)
            | Overlay::ConfirmDelete(task)
            | Overlay::PendingEdit { task, .. }
            | Overlay::EditTask(task) => Some(task),
            Overlay::None | Overlay::AddTask | Overlay::Calendar => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    None,
    AddTask,
    TaskMenu,
    ConfirmDelete,
    PendingEdit,
    EditTask,
    Calendar,
}

impl OverlayKind {
    pub const ALL: [OverlayKind; 7] = [
        OverlayKind::None,
        OverlayKind::AddTask,
        OverlayKind::TaskMenu,
        OverlayKind::ConfirmDelete,
        OverlayKind::PendingEdit,
        OverlayKind::EditTask,
        OverlayKind::Calendar,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OverlayKind::None => "none",
            OverlayKind::AddTask => "add_task",
            OverlayKind::TaskMenu => "task_menu",
            OverlayKind::ConfirmDelete => "confirm_delete",
            OverlayKind::PendingEdit => "pending_edit",
            OverlayKind::EditTask => "edit_task",
            OverlayKind::Calendar => "calendar",
        }
    }

    /// What is on screen. The hand-off gap shows nothing.
    pub fn visible(self) -> OverlayKind {
        match self {
            OverlayKind::PendingEdit => OverlayKind::None,
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEvent {
    OpenAddTask(Bucket),
    SubmitAddTask,
    OpenTaskMenu(TaskDto),
    ChooseEdit,
    ChooseDelete,
    ConfirmDelete,
    CancelDelete,
    EditReady,
    SaveEdit(TaskPatch),
    OpenCalendar,
    CloseCalendar,
    /// Tap outside, back gesture, cancel button.
    Dismiss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    OpenAddTask,
    SubmitAddTask,
    OpenTaskMenu,
    ChooseEdit,
    ChooseDelete,
    ConfirmDelete,
    CancelDelete,
    EditReady,
    SaveEdit,
    OpenCalendar,
    CloseCalendar,
    Dismiss,
}

impl EventKind {
    pub const ALL: [EventKind; 12] = [
        EventKind::OpenAddTask,
        EventKind::SubmitAddTask,
        EventKind::OpenTaskMenu,
        EventKind::ChooseEdit,
        EventKind::ChooseDelete,
        EventKind::ConfirmDelete,
        EventKind::CancelDelete,
        EventKind::EditReady,
        EventKind::SaveEdit,
        EventKind::OpenCalendar,
        EventKind::CloseCalendar,
        EventKind::Dismiss,
    ];
}

impl OverlayEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            OverlayEvent::OpenAddTask(_) => EventKind::OpenAddTask,
            OverlayEvent::SubmitAddTask => EventKind::SubmitAddTask,
            OverlayEvent::OpenTaskMenu(_) => EventKind::OpenTaskMenu,
            OverlayEvent::ChooseEdit => EventKind::ChooseEdit,
            OverlayEvent::ChooseDelete => EventKind::ChooseDelete,
            OverlayEvent::ConfirmDelete => EventKind::ConfirmDelete,
            OverlayEvent::CancelDelete => EventKind::CancelDelete,
            OverlayEvent::EditReady => EventKind::EditReady,
            OverlayEvent::SaveEdit(_) => EventKind::SaveEdit,
            OverlayEvent::OpenCalendar => EventKind::OpenCalendar,
            OverlayEvent::CloseCalendar => EventKind::CloseCalendar,
            OverlayEvent::Dismiss => EventKind::Dismiss,
        }
    }
}

/// The transition table.
pub fn next_kind(from: OverlayKind, event: EventKind) -> Option<OverlayKind> {
    use EventKind as E;
    use OverlayKind as K;

    match (from, event) {
        (K::None, E::OpenAddTask) => Some(K::AddTask),
        (K::None, E::OpenTaskMenu) => Some(K::TaskMenu),
        (K::None, E::OpenCalendar) => Some(K::Calendar),

        (K::AddTask, E::SubmitAddTask | E::Dismiss) => Some(K::None),

        (K::TaskMenu, E::ChooseEdit) => Some(K::PendingEdit),
        (K::TaskMenu, E::ChooseDelete) => Some(K::ConfirmDelete),
        (K::TaskMenu, E::Dismiss) => Some(K::None),

        (K::ConfirmDelete, E::ConfirmDelete | E::CancelDelete | E::Dismiss) => Some(K::None),

        (K::PendingEdit, E::EditReady) => Some(K::EditTask),
        (K::PendingEdit, E::Dismiss) => Some(K::None),

        (K::EditTask, E::SaveEdit | E::Dismiss) => Some(K::None),

        (K::Calendar, E::CloseCalendar | E::Dismiss) => Some(K::None),

        _ => None,
    }
}

/// Data intent an accepted transition asks the session to issue.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Create(TaskCreate),
    Update { task_id: Uuid, patch: TaskPatch },
    Delete(Uuid),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Applied(Option<Effect>),
    /// Allowed event whose input was not acceptable; nothing changed.
    Kept,
    /// Not in the table.
    Rejected,
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied(_))
    }
}

#[derive(Debug, Clone)]
pub struct OverlayCoordinator {
    state: Overlay,
    draft: AddTaskDraft,
    draft_default: Bucket,
    edit_delay: Duration,
}

impl OverlayCoordinator {
    pub fn new(edit_delay: Duration) -> Self {
        Self {
            state: Overlay::None,
            draft: AddTaskDraft::new(Bucket::Today),
            draft_default: Bucket::Today,
            edit_delay,
        }
    }

    pub fn state(&self) -> &Overlay {
        &self.state
    }

    pub fn kind(&self) -> OverlayKind {
        self.state.kind()
    }

    pub fn is_open(&self) -> bool {
        self.kind() != OverlayKind::None
    }

    pub fn selected_task(&self) -> Option<&TaskDto> {
        self.state.selected_task()
    }

    pub fn draft(&self) -> &AddTaskDraft {
        &self.draft
    }

    /// Form fields are editable only while the form is up.
    pub fn draft_mut(&mut self) -> Option<&mut AddTaskDraft> {
        match self.state {
            Overlay::AddTask => Some(&mut self.draft),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.state = Overlay::None;
        self.draft.reset(self.draft_default);
    }

    /// Runs the menu-to-edit hand-off clock. Returns true on the step
    /// that opens the edit form.
    pub fn advance(&mut self, dt: Duration) -> bool {
        let Overlay::PendingEdit { remaining, .. } = &mut self.state else {
            return false;
        };
        *remaining = remaining.saturating_sub(dt);
        if !remaining.is_zero() {
            return false;
        }
        self.handle(OverlayEvent::EditReady).is_applied()
    }

    #[tracing::instrument(skip(self, event), fields(from = ?self.kind(), event = ?event.kind()))]
    pub fn handle(&mut self, event: OverlayEvent) -> Transition {
        let from = self.kind();
        let Some(to) = next_kind(from, event.kind()) else {
            debug!("overlay event rejected");
            return Transition::Rejected;
        };

        if let Overlay::PendingEdit { remaining, .. } = &self.state
            && event.kind() == EventKind::EditReady
            && !remaining.is_zero()
        {
            debug!(?remaining, "edit form held until menu is gone");
            return Transition::Kept;
        }

        let selected = self.state.selected_task().cloned();
        let effect = match &event {
            OverlayEvent::SubmitAddTask => match self.draft.to_create() {
                Some(create) => Some(Effect::Create(create)),
                None => {
                    debug!("blank title; form stays open");
                    return Transition::Kept;
                }
            },
            OverlayEvent::ConfirmDelete => selected.as_ref().map(|t| Effect::Delete(t.id)),
            OverlayEvent::SaveEdit(patch) => selected.as_ref().map(|t| Effect::Update {
                task_id: t.id,
                patch: sanitize_patch(patch),
            }),
            _ => None,
        };

        let next = match (to, event) {
            (OverlayKind::None, _) => Overlay::None,
            (OverlayKind::AddTask, OverlayEvent::OpenAddTask(bucket)) => {
                self.draft_default = bucket;
                self.draft.reset(bucket);
                Overlay::AddTask
            }
            (OverlayKind::TaskMenu, OverlayEvent::OpenTaskMenu(task)) => Overlay::TaskMenu(task),
            (OverlayKind::Calendar, _) => Overlay::Calendar,
            (OverlayKind::ConfirmDelete | OverlayKind::PendingEdit | OverlayKind::EditTask, _) => {
                let Some(task) = selected else {
                    warn!(?to, "no selected task for overlay");
                    return Transition::Rejected;
                };
                match to {
                    OverlayKind::ConfirmDelete => Overlay::ConfirmDelete(task),
                    OverlayKind::PendingEdit => Overlay::PendingEdit {
                        task,
                        remaining: self.edit_delay,
                    },
                    _ => Overlay::EditTask(task),
                }
            }
            (to, event) => {
                warn!(?to, ?event, "event payload does not fit target overlay");
                return Transition::Rejected;
            }
        };

        if from == OverlayKind::AddTask {
            self.draft.reset(self.draft_default);
        }
        debug!(to = ?next.kind(), "overlay transition");
        self.state = next;
        Transition::Applied(effect)
    }
}

fn sanitize_patch(patch: &TaskPatch) -> TaskPatch {
    let mut patch = patch.clone();
    patch.title = patch
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    // a zero estimate is no estimate
    if patch.estimated_time == Some(Some(0)) {
        patch.estimated_time = Some(None);
    }
    patch
}
