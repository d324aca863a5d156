//! Bucket membership and the intents that reclassify tasks.
//!
//! Everything here is a pure function of a feed snapshot. Mutations are
//! returned as [`Intent`] values for the session to dispatch; nothing in
//! this module writes to the cache.

use mrplan_shared::{Bucket, Intent, TaskDto, TaskPatch};
use tracing::debug;
use uuid::Uuid;

/// `today` shows finished work; every other bucket hides it.
pub fn is_visible_in(task: &TaskDto, bucket: Bucket) -> bool {
    if task.bucket != bucket {
        return false;
    }
    bucket == Bucket::Today || !task.completed
}

/// Tasks shown in `bucket`, in feed order.
pub fn visible_tasks_for_bucket(tasks: &[TaskDto], bucket: Bucket) -> Vec<&TaskDto> {
    tasks.iter().filter(|t| is_visible_in(t, bucket)).collect()
}

/// One entry per bucket, in board order.
pub fn board(tasks: &[TaskDto]) -> Vec<(Bucket, Vec<&TaskDto>)> {
    Bucket::ALL
        .iter()
        .map(|&bucket| (bucket, visible_tasks_for_bucket(tasks, bucket)))
        .collect()
}

/// Intent that moves `task_id` from `from` to `to`, touching only the
/// bucket. `None` when the buckets match or the task is not cached.
#[tracing::instrument(skip(tasks))]
pub fn move_task(tasks: &[TaskDto], task_id: Uuid, from: Bucket, to: Bucket) -> Option<Intent> {
    if from == to {
        debug!("same bucket; nothing to move");
        return None;
    }
    if !tasks.iter().any(|t| t.id == task_id) {
        debug!("task not in cache; move skipped");
        return None;
    }
    Some(Intent::Update {
        task_id,
        patch: TaskPatch::bucket(to),
    })
}

/// Intent that flips the cached completion flag of `task_id`.
#[tracing::instrument(skip(tasks))]
pub fn complete_task(tasks: &[TaskDto], task_id: Uuid) -> Option<Intent> {
    let Some(task) = tasks.iter().find(|t| t.id == task_id) else {
        debug!("task not in cache; toggle skipped");
        return None;
    };
    Some(Intent::Update {
        task_id,
        patch: TaskPatch::completed(!task.completed),
    })
}
