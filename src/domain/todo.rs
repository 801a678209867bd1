use crate::domain::todo::driven_ports::{TodoReader, TodoWriter};
use crate::domain::todo::driving_ports::TodoError;
use crate::domain::user::UserIdentity;
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use chrono::{DateTime, Utc};
use derive_more::Display;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

/// How urgent a todo is. Stored as 1 (low) through 3 (high).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low = 1,
    Medium = 2,
    High = 3,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn value(self) -> i32 {
        self as i32
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("priority must be 1, 2, or 3 but was {0}")]
pub struct InvalidPriority(pub i32);

impl TryFrom<i32> for Priority {
    type Error = InvalidPriority;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Low),
            2 => Ok(Self::Medium),
            3 => Ok(Self::High),
            other => Err(InvalidPriority(other)),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Todo {
    pub id: i32,
    pub title: String,
    pub priority: Priority,
    /// Absent when the store runs in single-user mode
    pub owner_user_id: Option<String>,
    pub deleted: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
#[cfg_attr(test, derive(Clone, PartialEq, Eq))]
pub struct NewTodo {
    pub title: String,
    pub priority: Priority,
}

#[derive(Debug)]
#[cfg_attr(test, derive(Clone, PartialEq, Eq))]
pub struct UpdateTodo {
    pub title: String,
    pub priority: Priority,
}

/// Whether todos belong to individual users or to one shared, anonymous list
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Ownership {
    #[default]
    MultiUser,
    SingleUser,
}

#[derive(Debug, Error)]
#[error("unknown ownership mode \"{0}\", expected \"multi_user\" or \"single_user\"")]
pub struct UnknownOwnershipMode(String);

impl FromStr for Ownership {
    type Err = UnknownOwnershipMode;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "multi_user" => Ok(Self::MultiUser),
            "single_user" => Ok(Self::SingleUser),
            _ => Err(UnknownOwnershipMode(raw.to_owned())),
        }
    }
}

/// Row filter every driven port applies to its queries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowScope<'user> {
    OwnedBy(&'user str),
    Unscoped,
}

impl<'user> RowScope<'user> {
    pub fn owner(&self) -> Option<&'user str> {
        match self {
            Self::OwnedBy(user_id) => Some(user_id),
            Self::Unscoped => None,
        }
    }
}

/// Why a mutation was dropped before it reached the store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum SkipReason {
    #[display("the title was blank")]
    BlankTitle,
    #[display("no todo id was given")]
    MissingId,
    #[display("nobody is signed in")]
    NoIdentity,
}

impl SkipReason {
    pub fn code(self) -> &'static str {
        match self {
            Self::BlankTitle => "blank_title",
            Self::MissingId => "missing_id",
            Self::NoIdentity => "no_identity",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationOutcome {
    Created { id: i32 },
    /// Zero affected rows means the id didn't exist or belongs to somebody else
    Applied { affected_rows: u64 },
    Skipped(SkipReason),
}

impl MutationOutcome {
    /// True when the store was written to, meaning cached views of the list are stale
    pub fn reached_store(&self) -> bool {
        !matches!(self, Self::Skipped(_))
    }
}

/// Trims a title, returning nothing if only whitespace was left
pub fn normalized_title(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

pub mod driven_ports {
    use super::*;
    use crate::external_connections::ExternalConnectivity;

    pub trait TodoReader {
        /// Todos that aren't soft-deleted, in insertion order
        async fn active_todos(
            &self,
            scope: RowScope<'_>,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<Todo>, anyhow::Error>;
    }

    pub trait TodoWriter {
        async fn insert_todo(
            &self,
            owner_user_id: Option<&str>,
            new_todo: &NewTodo,
            updated_at: DateTime<Utc>,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<i32, anyhow::Error>;
        /// Returns the number of rows changed
        async fn update_todo(
            &self,
            scope: RowScope<'_>,
            todo_id: i32,
            update: &UpdateTodo,
            updated_at: DateTime<Utc>,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<u64, anyhow::Error>;
        /// Returns the number of rows changed
        async fn soft_delete_todo(
            &self,
            scope: RowScope<'_>,
            todo_id: i32,
            updated_at: DateTime<Utc>,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<u64, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use crate::external_connections::ExternalConnectivity;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum TodoError {
        #[error(transparent)]
        Store(#[from] anyhow::Error),
    }


    /// The todo store gateway. Every operation is scoped to `viewer`, which is the identity
    /// resolved for the current request or session.
    pub trait TodoPort {
        async fn list_todos(
            &self,
            viewer: Option<&UserIdentity>,
            ext_cxn: &mut impl ExternalConnectivity,
            todo_read: &impl driven_ports::TodoReader,
        ) -> Result<Vec<Todo>, TodoError>;
        async fn create_todo(
            &self,
            viewer: Option<&UserIdentity>,
            new_todo: &NewTodo,
            ext_cxn: &mut impl ExternalConnectivity,
            todo_write: &impl driven_ports::TodoWriter,
        ) -> Result<MutationOutcome, TodoError>;
        async fn update_todo(
            &self,
            viewer: Option<&UserIdentity>,
            todo_id: Option<i32>,
            update: &UpdateTodo,
            ext_cxn: &mut impl ExternalConnectivity,
            todo_write: &impl driven_ports::TodoWriter,
        ) -> Result<MutationOutcome, TodoError>;
        async fn delete_todo(
            &self,
            viewer: Option<&UserIdentity>,
            todo_id: Option<i32>,
            ext_cxn: &mut impl ExternalConnectivity,
            todo_write: &impl driven_ports::TodoWriter,
        ) -> Result<MutationOutcome, TodoError>;
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TodoService {
    pub ownership: Ownership,
}

impl TodoService {
    pub fn new(ownership: Ownership) -> Self {
        TodoService { ownership }
    }

    /// Works out which rows the viewer may touch. Nothing at all in multi-user mode when
    /// nobody is signed in.
    fn scope_for<'user>(&self, viewer: Option<&'user UserIdentity>) -> Option<RowScope<'user>> {
        match (self.ownership, viewer) {
            (Ownership::SingleUser, _) => Some(RowScope::Unscoped),
            (Ownership::MultiUser, Some(user)) => Some(RowScope::OwnedBy(user.id.as_str())),
            (Ownership::MultiUser, None) => None,
        }
    }
}

fn skipped(action: &str, reason: SkipReason) -> MutationOutcome {
    warn!(%reason, "Skipping attempt to {action}");
    MutationOutcome::Skipped(reason)
}

impl driving_ports::TodoPort for TodoService {
    async fn list_todos(
        &self,
        viewer: Option<&UserIdentity>,
        ext_cxn: &mut impl ExternalConnectivity,
        todo_read: &impl TodoReader,
    ) -> Result<Vec<Todo>, TodoError> {
        let Some(scope) = self.scope_for(viewer) else {
            debug!("No signed-in user, not reading todos");
            return Ok(Vec::new());
        };

        let todos = todo_read
            .active_todos(scope, &mut *ext_cxn)
            .await
            .context("listing todos")?;
        Ok(todos)
    }

    async fn create_todo(
        &self,
        viewer: Option<&UserIdentity>,
        new_todo: &NewTodo,
        ext_cxn: &mut impl ExternalConnectivity,
        todo_write: &impl TodoWriter,
    ) -> Result<MutationOutcome, TodoError> {
        let Some(scope) = self.scope_for(viewer) else {
            return Ok(skipped("create a todo", SkipReason::NoIdentity));
        };
        let Some(title) = normalized_title(&new_todo.title) else {
            return Ok(skipped("create a todo", SkipReason::BlankTitle));
        };

        let to_insert = NewTodo {
            title,
            priority: new_todo.priority,
        };
        let id = todo_write
            .insert_todo(scope.owner(), &to_insert, Utc::now(), &mut *ext_cxn)
            .await
            .context("creating a todo")?;
        Ok(MutationOutcome::Created { id })
    }

    async fn update_todo(
        &self,
        viewer: Option<&UserIdentity>,
        todo_id: Option<i32>,
        update: &UpdateTodo,
        ext_cxn: &mut impl ExternalConnectivity,
        todo_write: &impl TodoWriter,
    ) -> Result<MutationOutcome, TodoError> {
        let Some(scope) = self.scope_for(viewer) else {
            return Ok(skipped("update a todo", SkipReason::NoIdentity));
        };
        let Some(todo_id) = todo_id else {
            return Ok(skipped("update a todo", SkipReason::MissingId));
        };
        let Some(title) = normalized_title(&update.title) else {
            return Ok(skipped("update a todo", SkipReason::BlankTitle));
        };

        let normalized_update = UpdateTodo {
            title,
            priority: update.priority,
        };
        let affected_rows = todo_write
            .update_todo(scope, todo_id, &normalized_update, Utc::now(), &mut *ext_cxn)
            .await
            .context("updating a todo")?;
        if affected_rows == 0 {
            debug!(todo_id, "Update matched no todos for this user");
        }

        Ok(MutationOutcome::Applied { affected_rows })
    }

    async fn delete_todo(
        &self,
        viewer: Option<&UserIdentity>,
        todo_id: Option<i32>,
        ext_cxn: &mut impl ExternalConnectivity,
        todo_write: &impl TodoWriter,
    ) -> Result<MutationOutcome, TodoError> {
        let Some(scope) = self.scope_for(viewer) else {
            return Ok(skipped("delete a todo", SkipReason::NoIdentity));
        };
        let Some(todo_id) = todo_id else {
            return Ok(skipped("delete a todo", SkipReason::MissingId));
        };

        let affected_rows = todo_write
            .soft_delete_todo(scope, todo_id, Utc::now(), &mut *ext_cxn)
            .await
            .context("deleting a todo")?;
        if affected_rows == 0 {
            debug!(todo_id, "Delete matched no todos for this user");
        }

        Ok(MutationOutcome::Applied { affected_rows })
    }
}
