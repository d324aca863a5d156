use std::fmt;
use std::str::FromStr;

use serde::{
  Deserialize,
  Deserializer,
  Serialize
};
use uuid::Uuid;

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
  Inbox,
  Today,
  Next,
  Someday
}

impl Bucket {
  /// Board order.
  pub const ALL: [Bucket; 4] = [
    Bucket::Inbox,
    Bucket::Today,
    Bucket::Next,
    Bucket::Someday
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | Bucket::Inbox => "inbox",
      | Bucket::Today => "today",
      | Bucket::Next => "next",
      | Bucket::Someday => "someday"
    }
  }

  pub fn title(self) -> &'static str {
    match self {
      | Bucket::Inbox => "Inbox",
      | Bucket::Today => "Today",
      | Bucket::Next => "Next",
      | Bucket::Someday => "Someday"
    }
  }

  pub fn emoji(self) -> &'static str {
    match self {
      | Bucket::Inbox => "📥",
      | Bucket::Today => "🗓️",
      | Bucket::Next => "➡️",
      | Bucket::Someday => "📦"
    }
  }
}

impl fmt::Display for Bucket {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBucket(pub String);

impl fmt::Display for UnknownBucket {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "unknown bucket `{}` (expected \
       inbox, today, next or someday)",
      self.0
    )
  }
}

impl std::error::Error for UnknownBucket {}

impl FromStr for Bucket {
  type Err = UnknownBucket;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "inbox" => Ok(Bucket::Inbox),
      | "today" => Ok(Bucket::Today),
      | "next" => Ok(Bucket::Next),
      | "someday" => Ok(Bucket::Someday),
      | other => {
        Err(UnknownBucket(
          other.to_string()
        ))
      }
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
  pub fn new(
    raw: impl Into<String>
  ) -> Self {
    Self(raw.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for UserId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
  pub id:             Uuid,
  pub title:          String,
  #[serde(rename = "section")]
  pub bucket:         Bucket,
  #[serde(default)]
  pub completed:      bool,
  #[serde(default)]
  pub estimated_time: Option<u32>,
  #[serde(default)]
  pub project_id:     Option<Uuid>,
  pub owner:          UserId,
  #[serde(default)]
  pub created_at:     Option<String>,
  #[serde(default)]
  pub updated_at:     Option<String>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct ProjectDto {
  pub id:    Uuid,
  pub name:  String,
  pub owner: UserId
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreate {
  pub title:          String,
  #[serde(rename = "section")]
  pub bucket:         Bucket,
  pub estimated_time: Option<u32>,
  pub project_id:     Option<Uuid>,
  pub completed:      bool
}

/// Partial update. The doubled
/// options on `estimated_time` and
/// `project_id` separate "leave as is"
/// (`None`) from "clear"
/// (`Some(None)`).
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Default,
)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub title:          Option<String>,
  #[serde(
    rename = "section",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub bucket:         Option<Bucket>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub completed:      Option<bool>,
  #[serde(
    default,
    deserialize_with = "double_option",
    skip_serializing_if = "Option::is_none"
  )]
  pub estimated_time:
    Option<Option<u32>>,
  #[serde(
    default,
    deserialize_with = "double_option",
    skip_serializing_if = "Option::is_none"
  )]
  pub project_id:
    Option<Option<Uuid>>
}

/// Present-but-null becomes
/// `Some(None)`; absence stays `None`
/// through `#[serde(default)]`.
fn double_option<'de, T, D>(
  de: D
) -> Result<Option<Option<T>>, D::Error>
where
  T: Deserialize<'de>,
  D: Deserializer<'de>
{
  Option::<T>::deserialize(de).map(Some)
}

impl TaskPatch {
  pub fn bucket(bucket: Bucket) -> Self {
    Self {
      bucket: Some(bucket),
      ..Self::default()
    }
  }

  pub fn completed(
    completed: bool
  ) -> Self {
    Self {
      completed: Some(completed),
      ..Self::default()
    }
  }

  pub fn is_empty(&self) -> bool {
    self.title.is_none()
      && self.bucket.is_none()
      && self.completed.is_none()
      && self.estimated_time.is_none()
      && self.project_id.is_none()
  }

  pub fn apply_to(
    &self,
    task: &mut TaskDto
  ) {
    if let Some(title) = &self.title {
      task.title = title.clone();
    }
    if let Some(bucket) = self.bucket {
      task.bucket = bucket;
    }
    if let Some(completed) =
      self.completed
    {
      task.completed = completed;
    }
    if let Some(estimated_time) =
      self.estimated_time
    {
      task.estimated_time =
        estimated_time;
    }
    if let Some(project_id) =
      self.project_id
    {
      task.project_id = project_id;
    }
  }
}

/// One call issued against the data
/// service.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(
  tag = "op",
  rename_all = "snake_case"
)]
pub enum Intent {
  Create {
    owner:  UserId,
    fields: TaskCreate
  },
  Update {
    task_id: Uuid,
    patch:   TaskPatch
  },
  Delete {
    task_id: Uuid
  }
}

impl Intent {
  pub fn task_id(&self) -> Option<Uuid> {
    match self {
      | Intent::Create {
        ..
      } => None,
      | Intent::Update {
        task_id,
        ..
      }
      | Intent::Delete {
        task_id
      } => Some(*task_id)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bucket_parses_case_insensitively()
  {
    assert_eq!(
      "Someday".parse::<Bucket>(),
      Ok(Bucket::Someday)
    );
    assert_eq!(
      " today ".parse::<Bucket>(),
      Ok(Bucket::Today)
    );
    assert!(
      "later".parse::<Bucket>().is_err()
    );
  }

  #[test]
  fn bucket_patch_serializes_only_section()
   {
    let patch =
      TaskPatch::bucket(Bucket::Next);
    let json =
      serde_json::to_value(&patch)
        .expect("serialize patch");
    assert_eq!(
      json,
      serde_json::json!({ "section": "next" })
    );
  }

  #[test]
  fn create_uses_feed_field_names() {
    let create = TaskCreate {
      title:          "Buy milk"
        .to_string(),
      bucket:         Bucket::Today,
      estimated_time: Some(30),
      project_id:     None,
      completed:      false
    };
    let json =
      serde_json::to_value(&create)
        .expect("serialize create");
    assert_eq!(
      json,
      serde_json::json!({
        "title": "Buy milk",
        "section": "today",
        "estimatedTime": 30,
        "projectId": null,
        "completed": false
      })
    );
  }

  #[test]
  fn patch_null_means_clear() {
    let patch: TaskPatch =
      serde_json::from_str(
        r#"{"projectId": null}"#
      )
      .expect("parse patch");
    assert_eq!(
      patch.project_id,
      Some(None)
    );
    assert_eq!(
      patch.estimated_time,
      None
    );
    assert_eq!(
      serde_json::to_string(&patch)
        .expect("serialize patch"),
      r#"{"projectId":null}"#
    );
  }

  #[test]
  fn patch_apply_leaves_untouched_fields()
   {
    let mut task = TaskDto {
      id:             Uuid::new_v4(),
      title:          "Read".to_string(),
      bucket:         Bucket::Inbox,
      completed:      false,
      estimated_time: Some(15),
      project_id:     Some(
        Uuid::new_v4()
      ),
      owner:          UserId::new("u1"),
      created_at:     None,
      updated_at:     None
    };
    let before = task.clone();

    TaskPatch {
      project_id: Some(None),
      ..TaskPatch::default()
    }
    .apply_to(&mut task);

    assert_eq!(task.project_id, None);
    assert_eq!(task.title, before.title);
    assert_eq!(
      task.estimated_time,
      before.estimated_time
    );
    assert_eq!(task.bucket, before.bucket);
  }
}
