use std::time::Duration;

use mrplan_shared::Bucket;
use tracing::debug;
use uuid::Uuid;

/// What is being dragged and where it came from. Lives only between
/// drag start and drop or cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragPayload {
    pub task_id: Uuid,
    pub from_bucket: Bucket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Press {
    Idle,
    /// Finger down on a task's primary region, not yet a drag.
    Held {
        payload: DragPayload,
        elapsed: Duration,
    },
    Dragging(DragPayload),
}

/// Result of lifting a press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Lifted before the long-press delay.
    Tap(Uuid),
    /// A drag was in progress; no zone took it.
    Cancelled(DragPayload),
    Nothing,
}

/// A drop that should become a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropCommit {
    pub payload: DragPayload,
    pub to_bucket: Bucket,
}

/// Drag session plus the single hovered drop zone.
#[derive(Debug, Clone)]
pub struct DragController {
    long_press: Duration,
    press: Press,
    hover: Option<Bucket>,
}

impl DragController {
    pub fn new(long_press: Duration) -> Self {
        Self {
            long_press,
            press: Press::Idle,
            hover: None,
        }
    }

    pub fn payload(&self) -> Option<DragPayload> {
        match self.press {
            Press::Dragging(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.press, Press::Dragging(_))
    }

    pub fn is_pressing(&self) -> bool {
        matches!(self.press, Press::Held { .. })
    }

    pub fn hovered(&self) -> Option<Bucket> {
        self.hover
    }

    pub fn is_hovering(&self, bucket: Bucket) -> bool {
        self.hover == Some(bucket)
    }

    /// Finger down on the primary region of a task shown in `bucket`.
    pub fn press(&mut self, task_id: Uuid, bucket: Bucket) {
        if self.is_dragging() {
            debug!(%task_id, "press ignored during drag");
            return;
        }
        self.press = Press::Held {
            payload: DragPayload {
                task_id,
                from_bucket: bucket,
            },
            elapsed: Duration::ZERO,
        };
    }

    /// Advances the long-press timer. Returns the payload when the press
    /// turns into a drag on this step.
    pub fn advance(&mut self, dt: Duration) -> Option<DragPayload> {
        let Press::Held { payload, elapsed } = self.press else {
            return None;
        };
        let elapsed = elapsed + dt;
        if elapsed >= self.long_press {
            self.start(payload);
            Some(payload)
        } else {
            self.press = Press::Held { payload, elapsed };
            None
        }
    }

    /// Starts a drag directly, for callers that recognise long presses
    /// themselves.
    pub fn start(&mut self, payload: DragPayload) {
        debug!(task_id = %payload.task_id, from = %payload.from_bucket, "drag start");
        self.press = Press::Dragging(payload);
        self.hover = None;
    }

    /// Finger up with no drop zone underneath.
    pub fn release(&mut self) -> Release {
        let outcome = match self.press {
            Press::Idle => Release::Nothing,
            Press::Held { payload, .. } => Release::Tap(payload.task_id),
            Press::Dragging(payload) => {
                debug!(task_id = %payload.task_id, "drag cancelled");
                Release::Cancelled(payload)
            }
        };
        self.reset();
        outcome
    }

    pub fn cancel(&mut self) {
        if let Press::Dragging(payload) = self.press {
            debug!(task_id = %payload.task_id, "drag cancelled");
        }
        self.reset();
    }

    /// A zone reports the dragged item over it. Replaces any other hover.
    pub fn enter(&mut self, bucket: Bucket) {
        if !self.is_dragging() {
            return;
        }
        if self.hover != Some(bucket) {
            debug!(%bucket, "drag over zone");
            self.hover = Some(bucket);
        }
    }

    pub fn exit(&mut self, bucket: Bucket) {
        if self.hover == Some(bucket) {
            self.hover = None;
        }
    }

    /// Ends the session on `bucket`. Hover and session are cleared in
    /// the same step that hands back the commit.
    pub fn drop_on(&mut self, bucket: Bucket) -> Option<DropCommit> {
        let Press::Dragging(payload) = self.press else {
            return None;
        };
        self.reset();
        debug!(task_id = %payload.task_id, from = %payload.from_bucket, to = %bucket, "drop");
        Some(DropCommit {
            payload,
            to_bucket: bucket,
        })
    }

    pub fn reset(&mut self) {
        self.press = Press::Idle;
        self.hover = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_PRESS: Duration = Duration::from_millis(200);

    fn dragging(bucket: Bucket) -> (DragController, Uuid) {
        let mut drag = DragController::new(LONG_PRESS);
        let id = Uuid::new_v4();
        drag.press(id, bucket);
        assert!(drag.advance(LONG_PRESS).is_some());
        (drag, id)
    }

    #[test]
    fn short_press_is_a_tap() {
        let mut drag = DragController::new(LONG_PRESS);
        let id = Uuid::new_v4();
        drag.press(id, Bucket::Inbox);
        assert_eq!(drag.advance(Duration::from_millis(120)), None);
        assert_eq!(drag.release(), Release::Tap(id));
        assert!(!drag.is_pressing());
    }

    #[test]
    fn long_press_starts_drag_and_suppresses_tap() {
        let (mut drag, id) = dragging(Bucket::Inbox);
        assert_eq!(
            drag.payload(),
            Some(DragPayload {
                task_id: id,
                from_bucket: Bucket::Inbox
            })
        );
        assert!(matches!(drag.release(), Release::Cancelled(_)));
        assert!(drag.payload().is_none());
    }

    #[test]
    fn hover_is_exclusive() {
        let (mut drag, _) = dragging(Bucket::Inbox);
        drag.enter(Bucket::Today);
        drag.enter(Bucket::Next);
        assert!(drag.is_hovering(Bucket::Next));
        assert!(!drag.is_hovering(Bucket::Today));

        drag.exit(Bucket::Today);
        assert!(drag.is_hovering(Bucket::Next));
        drag.exit(Bucket::Next);
        assert_eq!(drag.hovered(), None);
    }

    #[test]
    fn hover_without_session_is_ignored() {
        let mut drag = DragController::new(LONG_PRESS);
        drag.enter(Bucket::Today);
        assert_eq!(drag.hovered(), None);
    }

    #[test]
    fn drop_clears_session_and_hover_together() {
        let (mut drag, id) = dragging(Bucket::Inbox);
        drag.enter(Bucket::Next);

        let commit = drag.drop_on(Bucket::Next).expect("commit");
        assert_eq!(commit.payload.task_id, id);
        assert_eq!(commit.payload.from_bucket, Bucket::Inbox);
        assert_eq!(commit.to_bucket, Bucket::Next);
        assert!(!drag.is_dragging());
        assert_eq!(drag.hovered(), None);

        assert_eq!(drag.drop_on(Bucket::Next), None);
    }

    #[test]
    fn cancel_leaves_no_residue() {
        let (mut drag, _) = dragging(Bucket::Someday);
        drag.enter(Bucket::Today);
        drag.cancel();
        assert!(!drag.is_dragging());
        assert!(!drag.is_pressing());
        assert_eq!(drag.hovered(), None);
    }
}
