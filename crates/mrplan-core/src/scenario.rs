//! Scripted replay of UI events against a session over the memory feed.

use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use mrplan_shared::{Bucket, Intent, ProjectDto, TaskDto, TaskPatch, UserId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::memory::MemoryService;
use crate::overlay::{AddTaskDraft, Transition};
use crate::session::{AuthState, Session, SessionStatus};

/// Frame length used to slice `advance` steps.
const FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    #[tracing::instrument]
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed parsing scenario {}", path.display()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    #[default]
    Dashboard,
    Organizer,
}

/// Tasks are named by id or by title; a title picks the first match in
/// feed order.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    SignIn {
        #[serde(default)]
        user: Option<UserId>,
    },
    SignOut,
    DragStart {
        task: String,
        #[serde(default)]
        from: Option<Bucket>,
    },
    DragEnter {
        bucket: Bucket,
    },
    DragExit {
        bucket: Bucket,
    },
    Drop {
        bucket: Bucket,
    },
    DragCancel,
    TapComplete {
        task: String,
    },
    TapOptions {
        task: String,
    },
    MenuEdit,
    MenuDelete,
    ConfirmDelete,
    CancelDelete,
    CloseOverlay,
    OpenAddTask {
        #[serde(default)]
        from: Origin,
        #[serde(default)]
        bucket: Option<Bucket>,
    },
    SetDraftTitle {
        title: String,
    },
    SetDraftBucket {
        bucket: Bucket,
    },
    ToggleDraftTime {
        minutes: u32,
    },
    SetDraftProject {
        #[serde(default)]
        project: Option<String>,
    },
    SubmitAddTask,
    SaveEdit {
        #[serde(flatten)]
        patch: TaskPatch,
    },
    OpenCalendar,
    CloseCalendar,
    PanBegin,
    PanUpdate {
        dx: f32,
    },
    PanEnd,
    NavigateOrganizer,
    NavigateDashboard,
    Advance {
        ms: u64,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::SignIn { .. } => "sign_in",
            Step::SignOut => "sign_out",
            Step::DragStart { .. } => "drag_start",
            Step::DragEnter { .. } => "drag_enter",
            Step::DragExit { .. } => "drag_exit",
            Step::Drop { .. } => "drop",
            Step::DragCancel => "drag_cancel",
            Step::TapComplete { .. } => "tap_complete",
            Step::TapOptions { .. } => "tap_options",
            Step::MenuEdit => "menu_edit",
            Step::MenuDelete => "menu_delete",
            Step::ConfirmDelete => "confirm_delete",
            Step::CancelDelete => "cancel_delete",
            Step::CloseOverlay => "close_overlay",
            Step::OpenAddTask { .. } => "open_add_task",
            Step::SetDraftTitle { .. } => "set_draft_title",
            Step::SetDraftBucket { .. } => "set_draft_bucket",
            Step::ToggleDraftTime { .. } => "toggle_draft_time",
            Step::SetDraftProject { .. } => "set_draft_project",
            Step::SubmitAddTask => "submit_add_task",
            Step::SaveEdit { .. } => "save_edit",
            Step::OpenCalendar => "open_calendar",
            Step::CloseCalendar => "close_calendar",
            Step::PanBegin => "pan_begin",
            Step::PanUpdate { .. } => "pan_update",
            Step::PanEnd => "pan_end",
            Step::NavigateOrganizer => "navigate_organizer",
            Step::NavigateDashboard => "navigate_dashboard",
            Step::Advance { .. } => "advance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Accepted; for data operations, an intent went out.
    Applied,
    /// Accepted, nothing changed or issued.
    Noop,
    /// Refused by the overlay table or a gate.
    Rejected,
    /// Refused because a task or project reference did not resolve.
    Unresolved,
}

impl From<Transition> for Outcome {
    fn from(transition: Transition) -> Self {
        match transition {
            Transition::Applied(_) => Outcome::Applied,
            Transition::Kept => Outcome::Noop,
            Transition::Rejected => Outcome::Rejected,
        }
    }
}

fn issued(sent: bool) -> Outcome {
    if sent { Outcome::Applied } else { Outcome::Noop }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub step: &'static str,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardColumn {
    pub bucket: Bucket,
    pub tasks: Vec<TaskDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub name: String,
    pub steps: Vec<StepReport>,
    pub board: Vec<BoardColumn>,
    pub projects: Vec<ProjectDto>,
    pub status: SessionStatus,
    pub intents: Vec<Intent>,
}

/// A session wired to a memory feed, fed one scenario step at a time.
pub struct Driver {
    service: MemoryService,
    session: Session,
    default_user: Option<UserId>,
}

impl Driver {
    pub fn new(service: MemoryService, settings: Settings, default_user: Option<UserId>) -> Self {
        let session = Session::new(Rc::new(service.clone()), settings);
        Self {
            service,
            session,
            default_user,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn service(&self) -> &MemoryService {
        &self.service
    }

    #[tracing::instrument(skip_all, fields(name = %scenario.name, steps = scenario.steps.len()))]
    pub fn run(&mut self, scenario: &Scenario) -> Report {
        info!("replaying scenario");
        let steps = scenario
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                let outcome = self.apply(step);
                debug!(index, step = step.name(), ?outcome, "step");
                StepReport {
                    index,
                    step: step.name(),
                    outcome,
                }
            })
            .collect();
        self.report(scenario.name.clone(), steps)
    }

    pub fn report(&self, name: String, steps: Vec<StepReport>) -> Report {
        let snapshot = self.session.snapshot();
        Report {
            name,
            steps,
            board: self
                .session
                .board()
                .into_iter()
                .map(|(bucket, tasks)| BoardColumn { bucket, tasks })
                .collect(),
            projects: snapshot.projects().to_vec(),
            status: self.session.status(),
            intents: self.service.intents(),
        }
    }

    pub fn apply(&mut self, step: &Step) -> Outcome {
        let session = &mut self.session;
        match step {
            Step::SignIn { user } => {
                let Some(user) = user.clone().or_else(|| self.default_user.clone()) else {
                    warn!("sign_in without a user and no seed user");
                    return Outcome::Unresolved;
                };
                session.set_auth(AuthState::signed_in(user));
                Outcome::Applied
            }
            Step::SignOut => {
                session.set_auth(AuthState::signed_out());
                Outcome::Applied
            }
            Step::DragStart { task, from } => {
                let Some(found) = resolve_task(session, task) else {
                    return Outcome::Unresolved;
                };
                session.start_drag(found.id, from.unwrap_or(found.bucket));
                if session.drag().is_dragging() {
                    Outcome::Applied
                } else {
                    Outcome::Rejected
                }
            }
            Step::DragEnter { bucket } => {
                session.drag_enter(*bucket);
                Outcome::Applied
            }
            Step::DragExit { bucket } => {
                session.drag_exit(*bucket);
                Outcome::Applied
            }
            Step::Drop { bucket } => issued(session.drop_on(*bucket)),
            Step::DragCancel => {
                session.cancel_drag();
                Outcome::Applied
            }
            Step::TapComplete { task } => {
                let Some(found) = resolve_task(session, task) else {
                    return Outcome::Unresolved;
                };
                if !session.press_task(found.id, found.bucket) {
                    return Outcome::Rejected;
                }
                let before = self.service.intents().len();
                session.release_press();
                issued(self.service.intents().len() > before)
            }
            Step::TapOptions { task } => {
                let Some(found) = resolve_task(session, task) else {
                    return Outcome::Unresolved;
                };
                session.tap_options(found.id).into()
            }
            Step::MenuEdit => session.menu_edit().into(),
            Step::MenuDelete => session.menu_delete().into(),
            Step::ConfirmDelete => session.confirm_delete().into(),
            Step::CancelDelete => session.cancel_delete().into(),
            Step::CloseOverlay => session.close_overlay().into(),
            Step::OpenAddTask { from, bucket } => {
                let transition = match (bucket, from) {
                    (Some(bucket), _) => session.open_add_task(*bucket),
                    (None, Origin::Dashboard) => session.open_add_task_from_dashboard(),
                    (None, Origin::Organizer) => session.open_add_task_from_organizer(),
                };
                transition.into()
            }
            Step::SetDraftTitle { title } => edit_draft(session, |d| d.title = title.clone()),
            Step::SetDraftBucket { bucket } => edit_draft(session, |d| d.bucket = *bucket),
            Step::ToggleDraftTime { minutes } => {
                let mut offered = true;
                match edit_draft(session, |d| offered = d.toggle_time(*minutes)) {
                    Outcome::Applied if !offered => Outcome::Rejected,
                    outcome => outcome,
                }
            }
            Step::SetDraftProject { project } => {
                let project_id = match project {
                    None => None,
                    Some(name) => match resolve_project(session, name) {
                        Some(id) => Some(id),
                        None => return Outcome::Unresolved,
                    },
                };
                edit_draft(session, |d| d.project_id = project_id)
            }
            Step::SubmitAddTask => session.submit_add_task().into(),
            Step::SaveEdit { patch } => session.save_edit(patch.clone()).into(),
            Step::OpenCalendar => session.open_calendar().into(),
            Step::CloseCalendar => session.close_calendar().into(),
            Step::PanBegin => {
                if session.pan_begin() {
                    Outcome::Applied
                } else {
                    Outcome::Rejected
                }
            }
            Step::PanUpdate { dx } => {
                session.pan_update(*dx);
                Outcome::Applied
            }
            Step::PanEnd => match session.pan_end() {
                Some(_) => Outcome::Applied,
                None => Outcome::Noop,
            },
            Step::NavigateOrganizer => {
                session.navigate_to_organizer();
                Outcome::Applied
            }
            Step::NavigateDashboard => {
                session.navigate_to_dashboard();
                Outcome::Applied
            }
            Step::Advance { ms } => {
                let mut remaining = Duration::from_millis(*ms);
                while !remaining.is_zero() {
                    let dt = remaining.min(FRAME);
                    session.advance(dt);
                    remaining -= dt;
                }
                Outcome::Applied
            }
        }
    }
}

fn resolve_task(session: &Session, reference: &str) -> Option<TaskDto> {
    let snapshot = session.snapshot();
    let found = match reference.parse::<Uuid>() {
        Ok(id) => snapshot.task(id),
        Err(_) => snapshot.tasks().iter().find(|t| t.title == reference),
    };
    if found.is_none() {
        warn!(reference, "scenario names a task that is not in the feed");
    }
    found.cloned()
}

fn resolve_project(session: &Session, reference: &str) -> Option<Uuid> {
    let snapshot = session.snapshot();
    let found = match reference.parse::<Uuid>() {
        Ok(id) => snapshot.project(id).map(|p| p.id),
        Err(_) => snapshot
            .projects()
            .iter()
            .find(|p| p.name == reference)
            .map(|p| p.id),
    };
    if found.is_none() {
        warn!(reference, "scenario names a project that is not in the feed");
    }
    found
}

fn edit_draft(session: &mut Session, edit: impl FnOnce(&mut AddTaskDraft)) -> Outcome {
    match session.draft_mut() {
        Some(draft) => {
            edit(draft);
            Outcome::Applied
        }
        None => {
            warn!("add-task form is not open");
            Outcome::Rejected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Scenario {
        serde_json::from_str(json).expect("scenario json")
    }

    #[test]
    fn steps_parse_from_tagged_json() {
        let scenario = parse(
            r#"{
              "name": "mixed",
              "steps": [
                {"step": "sign_in", "user": "u1"},
                {"step": "drag_start", "task": "Read"},
                {"step": "drop", "bucket": "next"},
                {"step": "open_add_task", "from": "organizer"},
                {"step": "save_edit", "title": "New", "estimatedTime": null},
                {"step": "advance", "ms": 150}
              ]
            }"#,
        );
        let names: Vec<&str> = scenario.steps.iter().map(Step::name).collect();
        assert_eq!(
            names,
            vec!["sign_in", "drag_start", "drop", "open_add_task", "save_edit", "advance"]
        );
        match &scenario.steps[4] {
            Step::SaveEdit { patch } => {
                assert_eq!(patch.title.as_deref(), Some("New"));
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn unknown_step_fails_to_parse() {
        let result = serde_json::from_str::<Scenario>(r#"{"steps": [{"step": "teleport"}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn unresolved_task_is_reported() {
        let service = MemoryService::new();
        let mut driver = Driver::new(service, Settings::default(), Some(UserId::new("u1")));
        let report = driver.run(&parse(
            r#"{"steps": [{"step": "sign_in"}, {"step": "tap_options", "task": "Ghost"}]}"#,
        ));
        assert_eq!(report.steps[0].outcome, Outcome::Applied);
        assert_eq!(report.steps[1].outcome, Outcome::Unresolved);
        assert!(report.intents.is_empty());
    }
}
