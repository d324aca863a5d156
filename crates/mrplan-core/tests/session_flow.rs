use std::rc::Rc;
use std::time::Duration;

use mrplan_core::config::Settings;
use mrplan_core::memory::MemoryService;
use mrplan_core::overlay::{Overlay, OverlayKind, Transition};
use mrplan_core::render::{NO_PROJECT, project_label};
use mrplan_core::view::DrawerEndpoint;
use mrplan_core::{AuthState, Session};
use mrplan_shared::{Bucket, Intent, TaskCreate, TaskPatch, UserId};

fn signed_in() -> (Session, MemoryService, UserId) {
    let service = MemoryService::new();
    let user = UserId::new("u1");
    let mut session = Session::new(Rc::new(service.clone()), Settings::default());
    session.set_auth(AuthState::signed_in(user.clone()));
    (session, service, user)
}

fn titles(session: &Session, bucket: Bucket) -> Vec<String> {
    session
        .visible_tasks(bucket)
        .into_iter()
        .map(|t| t.title)
        .collect()
}

#[test]
fn drag_between_buckets_issues_one_bucket_update() {
    let (mut session, service, user) = signed_in();
    let id = service.insert_task(&user, "Read", Bucket::Inbox);

    session.start_drag(id, Bucket::Inbox);
    session.drag_enter(Bucket::Next);
    assert!(session.drop_on(Bucket::Next));

    assert!(!session.drag().is_dragging());
    assert_eq!(session.drag().hovered(), None);
    assert_eq!(
        service.take_intents(),
        vec![Intent::Update {
            task_id: id,
            patch: TaskPatch::bucket(Bucket::Next),
        }]
    );
    assert_eq!(titles(&session, Bucket::Next), vec!["Read"]);
    assert!(titles(&session, Bucket::Inbox).is_empty());
}

#[test]
fn drop_on_origin_bucket_issues_nothing() {
    let (mut session, service, user) = signed_in();
    let id = service.insert_task(&user, "Read", Bucket::Inbox);

    session.start_drag(id, Bucket::Inbox);
    session.drag_enter(Bucket::Inbox);
    assert!(!session.drop_on(Bucket::Inbox));
    assert!(!session.drag().is_dragging());
    assert!(service.intents().is_empty());
}

#[test]
fn cancelled_drag_leaves_nothing_behind() {
    let (mut session, service, user) = signed_in();
    let id = service.insert_task(&user, "Read", Bucket::Someday);

    session.start_drag(id, Bucket::Someday);
    session.drag_enter(Bucket::Today);
    session.cancel_drag();

    assert_eq!(session.status().dragging, None);
    assert_eq!(session.status().hovered, None);
    assert!(!session.drop_on(Bucket::Today));
    assert!(service.intents().is_empty());
}

#[test]
fn cache_waits_for_the_feed() {
    let (mut session, service, user) = signed_in();
    let id = service.insert_task(&user, "Read", Bucket::Inbox);

    service.hold_pushes();
    session.start_drag(id, Bucket::Inbox);
    assert!(session.drop_on(Bucket::Today));
    assert_eq!(titles(&session, Bucket::Inbox), vec!["Read"]);

    service.release_pushes();
    assert_eq!(titles(&session, Bucket::Today), vec!["Read"]);
}

#[test]
fn complete_then_move_reach_service_in_call_order() {
    for held in [false, true] {
        let (mut session, service, user) = signed_in();
        let id = service.insert_task(&user, "Laundry", Bucket::Inbox);

        if held {
            service.hold_pushes();
        }
        assert!(session.complete_task(id));
        assert!(session.move_task(id, Bucket::Inbox, Bucket::Today));
        if held {
            assert_eq!(titles(&session, Bucket::Inbox), vec!["Laundry"]);
            service.release_pushes();
        }

        assert_eq!(
            service.intents(),
            vec![
                Intent::Update {
                    task_id: id,
                    patch: TaskPatch::completed(true),
                },
                Intent::Update {
                    task_id: id,
                    patch: TaskPatch::bucket(Bucket::Today),
                },
            ],
            "held = {held}"
        );
        let stored = service.tasks();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].completed);
        assert_eq!(stored[0].bucket, Bucket::Today);
        assert_eq!(titles(&session, Bucket::Today), vec!["Laundry"]);
        assert!(titles(&session, Bucket::Inbox).is_empty());
    }
}

#[test]
fn buy_milk_creates_exact_fields_and_closes_reset() {
    let (mut session, service, user) = signed_in();

    assert!(session.open_add_task_from_dashboard().is_applied());
    let draft = session.draft_mut().expect("form open");
    draft.title = "Buy milk".to_string();
    draft.toggle_time(30);
    assert!(session.submit_add_task().is_applied());

    assert_eq!(
        service.intents(),
        vec![Intent::Create {
            owner: user,
            fields: TaskCreate {
                title: "Buy milk".to_string(),
                bucket: Bucket::Today,
                estimated_time: Some(30),
                project_id: None,
                completed: false,
            },
        }]
    );
    assert_eq!(session.overlay(), &Overlay::None);
    assert!(session.draft().title.is_empty());
    assert_eq!(titles(&session, Bucket::Today), vec!["Buy milk"]);
}

#[test]
fn blank_title_is_not_submitted() {
    let (mut session, service, _user) = signed_in();
    session.open_add_task_from_organizer();
    session.draft_mut().expect("form open").title = "  \t".to_string();

    assert_eq!(session.submit_add_task(), Transition::Kept);
    assert_eq!(session.overlay().kind(), OverlayKind::AddTask);
    assert!(service.intents().is_empty());
}

#[test]
fn reopened_add_task_is_clean() {
    let (mut session, _service, _user) = signed_in();
    session.open_add_task_from_dashboard();
    let draft = session.draft_mut().expect("form open");
    draft.title = "X".to_string();
    draft.bucket = Bucket::Someday;
    draft.toggle_time(120);
    session.close_overlay();

    session.open_add_task_from_organizer();
    let draft = session.draft();
    assert_eq!(draft.title, "");
    assert_eq!(draft.bucket, Bucket::Inbox);
    assert_eq!(draft.estimated_time, None);
    assert_eq!(draft.project_id, None);
}

#[test]
fn edit_opens_only_after_menu_delay() {
    let (mut session, service, user) = signed_in();
    let a = service.insert_task(&user, "A", Bucket::Next);

    session.tap_options(a);
    assert_eq!(session.overlay().kind(), OverlayKind::TaskMenu);
    session.menu_edit();

    session.advance(Duration::from_millis(100));
    assert_eq!(session.overlay().kind().visible(), OverlayKind::None);
    assert_eq!(session.edit_context(), None);
    assert_eq!(session.open_calendar(), Transition::Rejected);

    session.advance(Duration::from_millis(50));
    let context = session.edit_context().expect("edit open");
    assert_eq!(context.task.id, a);
    assert_eq!(session.selected_task().map(|t| t.title.as_str()), Some("A"));

    let patch = TaskPatch {
        title: Some("A, revised".to_string()),
        bucket: Some(Bucket::Today),
        ..TaskPatch::default()
    };
    assert!(session.save_edit(patch.clone()).is_applied());
    assert_eq!(service.intents(), vec![Intent::Update { task_id: a, patch }]);
    assert_eq!(session.selected_task(), None);
    assert_eq!(titles(&session, Bucket::Today), vec!["A, revised"]);
}

#[test]
fn save_for_vanished_task_closes_without_intent() {
    let (mut session, service, user) = signed_in();
    let a = service.insert_task(&user, "A", Bucket::Next);
    session.tap_options(a);
    session.menu_edit();
    session.advance(Duration::from_millis(150));

    service.remove_task(a);
    let transition = session.save_edit(TaskPatch::completed(true));
    assert!(transition.is_applied());
    assert_eq!(session.overlay(), &Overlay::None);
    assert!(service.intents().is_empty());
}

#[test]
fn missing_tasks_are_silent_noops() {
    let (mut session, service, user) = signed_in();
    let a = service.insert_task(&user, "A", Bucket::Inbox);
    service.remove_task(a);

    assert!(!session.move_task(a, Bucket::Inbox, Bucket::Today));
    assert!(!session.complete_task(a));
    assert_eq!(session.tap_options(a), Transition::Rejected);
    assert!(service.intents().is_empty());
}

#[test]
fn delete_requires_confirmation() {
    let (mut session, service, user) = signed_in();
    let a = service.insert_task(&user, "A", Bucket::Inbox);

    session.tap_options(a);
    session.menu_delete();
    assert_eq!(session.overlay().kind(), OverlayKind::ConfirmDelete);
    session.cancel_delete();
    assert!(service.intents().is_empty());
    assert_eq!(session.overlay(), &Overlay::None);

    session.tap_options(a);
    session.menu_delete();
    session.confirm_delete();
    assert_eq!(service.intents(), vec![Intent::Delete { task_id: a }]);
    assert!(session.snapshot().task(a).is_none());
}

#[test]
fn today_keeps_finished_work_visible() {
    let (mut session, service, user) = signed_in();
    let today = service.insert_task(&user, "Done today", Bucket::Today);
    let inbox = service.insert_task(&user, "Done inbox", Bucket::Inbox);

    assert!(session.complete_task(today));
    assert!(session.complete_task(inbox));

    assert_eq!(titles(&session, Bucket::Today), vec!["Done today"]);
    assert!(titles(&session, Bucket::Inbox).is_empty());
}

#[test]
fn deleted_project_reads_as_no_project() {
    let (mut session, service, user) = signed_in();
    let home = service.insert_project(&user, "Home");

    session.open_add_task(Bucket::Next);
    let draft = session.draft_mut().expect("form open");
    draft.title = "Fix sink".to_string();
    draft.project_id = Some(home);
    session.submit_add_task();

    let task = session.visible_tasks(Bucket::Next).remove(0);
    assert_eq!(project_label(&task, session.snapshot().projects()), "Home");

    service.remove_project(home);
    let task = session.visible_tasks(Bucket::Next).remove(0);
    assert_eq!(task.project_id, Some(home));
    assert_eq!(project_label(&task, session.snapshot().projects()), NO_PROJECT);
}

#[test]
fn sign_out_drops_subscriptions_and_state() {
    let (mut session, service, user) = signed_in();
    service.insert_task(&user, "A", Bucket::Inbox);
    assert_eq!(service.subscriber_count(), 2);

    session.open_calendar();
    session.set_auth(AuthState::signed_out());
    assert_eq!(service.subscriber_count(), 0);
    assert!(!session.is_ready());
    assert_eq!(session.overlay(), &Overlay::None);
    assert!(titles(&session, Bucket::Inbox).is_empty());

    let other = UserId::new("u2");
    service.insert_task(&other, "B", Bucket::Inbox);
    session.set_auth(AuthState::signed_in(other));
    assert_eq!(titles(&session, Bucket::Inbox), vec!["B"]);

    session.unmount();
    assert_eq!(service.subscriber_count(), 0);
}

#[test]
fn drawer_release_settles_through_session_frames() {
    let (mut session, _service, _user) = signed_in();
    let width = session.view().drawer_width();

    assert!(session.pan_begin());
    session.pan_update(-width * 0.6);
    assert_eq!(session.pan_end(), Some(DrawerEndpoint::Open));
    for _ in 0..300 {
        session.advance(Duration::from_millis(16));
    }
    assert_eq!(session.view().drawer_progress(), -width);
    assert_eq!(session.status().drawer, "open");

    assert!(session.pan_begin());
    session.pan_update(width * 0.5);
    assert_eq!(session.pan_end(), Some(DrawerEndpoint::Closed));
}

#[test]
fn organizer_navigation_runs_on_session_clock() {
    let (mut session, _service, _user) = signed_in();
    session.navigate_to_organizer();
    session.advance(Duration::from_millis(200));
    assert_eq!(session.status().vertical, "moving");
    session.advance(Duration::from_millis(150));
    assert_eq!(session.status().vertical, "organizer");
    assert_eq!(session.view().vertical_progress(), -844.0);
}
