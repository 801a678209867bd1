use crate::domain;
use crate::domain::todo::{MutationOutcome, Priority};
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

fn default_priority() -> i32 {
    Priority::Low.value()
}

/// Converts a validated wire priority into the domain's, reporting it the same way
/// [Validate] would if it's out of range
fn domain_priority(raw: i32) -> Result<Priority, ValidationErrors> {
    Priority::try_from(raw).map_err(|_| {
        let mut errors = ValidationErrors::new();
        errors.add("priority", ValidationError::new("range"));
        errors
    })
}

/// DTO for a todo returned on the API
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TodoItem {
    #[schema(example = 10)]
    pub id: i32,
    #[schema(example = "Buy milk")]
    pub title: String,
    /// 1 (low), 2 (medium) or 3 (high)
    #[schema(example = 2, minimum = 1, maximum = 3)]
    pub priority: i32,
    pub deleted: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<domain::todo::Todo> for TodoItem {
    fn from(value: domain::todo::Todo) -> Self {
        TodoItem {
            id: value.id,
            title: value.title,
            priority: value.priority.value(),
            deleted: value.deleted,
            updated_at: value.updated_at,
        }
    }
}

/// DTO for creating a new todo via the API. A blank title is accepted on the wire but the
/// todo won't be created.
#[derive(Clone, Debug, Serialize, Deserialize, Display, Validate, ToSchema)]
#[display("{title:?} at priority {priority}")]
pub struct NewTodo {
    #[schema(example = "Buy milk")]
    pub title: String,
    #[serde(default = "default_priority")]
    #[validate(range(min = 1, max = 3))]
    #[schema(example = 2, minimum = 1, maximum = 3)]
    pub priority: i32,
}

impl TryFrom<NewTodo> for domain::todo::NewTodo {
    type Error = ValidationErrors;

    fn try_from(value: NewTodo) -> Result<Self, Self::Error> {
        value.validate()?;

        Ok(domain::todo::NewTodo {
            priority: domain_priority(value.priority)?,
            title: value.title,
        })
    }
}

/// DTO for updating a todo's content via the API
#[derive(Clone, Debug, Serialize, Deserialize, Display, Validate, ToSchema)]
#[display("{title:?} at priority {priority}")]
pub struct UpdateTodo {
    #[schema(example = "Buy oat milk")]
    pub title: String,
    #[validate(range(min = 1, max = 3))]
    #[schema(example = 3, minimum = 1, maximum = 3)]
    pub priority: i32,
}

impl TryFrom<UpdateTodo> for domain::todo::UpdateTodo {
    type Error = ValidationErrors;

    fn try_from(value: UpdateTodo) -> Result<Self, Self::Error> {
        value.validate()?;

        Ok(domain::todo::UpdateTodo {
            priority: domain_priority(value.priority)?,
            title: value.title,
        })
    }
}

/// DTO describing what a create/update/delete call did to the store
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MutationReceipt {
    /// False when the request was dropped before reaching the store (blank title, no id,
    /// nobody signed in)
    pub applied: bool,
    #[schema(example = 1)]
    pub affected_rows: u64,
    #[schema(example = 5)]
    pub created_id: Option<i32>,
    #[schema(example = "blank_title")]
    pub skip_reason: Option<String>,
}

impl From<MutationOutcome> for MutationReceipt {
    fn from(value: MutationOutcome) -> Self {
        match value {
            MutationOutcome::Created { id } => MutationReceipt {
                applied: true,
                affected_rows: 1,
                created_id: Some(id),
                skip_reason: None,
            },
            MutationOutcome::Applied { affected_rows } => MutationReceipt {
                applied: true,
                affected_rows,
                created_id: None,
                skip_reason: None,
            },
            MutationOutcome::Skipped(reason) => MutationReceipt {
                applied: false,
                affected_rows: 0,
                created_id: None,
                skip_reason: Some(reason.code().to_owned()),
            },
        }
    }
}
