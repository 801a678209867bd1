use crate::domain;
use crate::domain::todo::{NewTodo, Priority, RowScope, Todo, UpdateTodo};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::{Context, Error};
use chrono::{DateTime, Utc};
use sqlx::{query, query_as};

pub struct DbTodoReader;

#[derive(sqlx::FromRow)]
struct TodoRow {
    id: i32,
    title: String,
    priority: i16,
    user_id: Option<String>,
    deleted: bool,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TodoRow> for domain::todo::Todo {
    type Error = Error;

    fn try_from(value: TodoRow) -> Result<Self, Self::Error> {
        let priority = Priority::try_from(i32::from(value.priority))
            .with_context(|| format!("todo {} has a corrupt priority", value.id))?;

        Ok(Todo {
            id: value.id,
            title: value.title,
            priority,
            owner_user_id: value.user_id,
            deleted: value.deleted,
            updated_at: value.updated_at,
        })
    }
}

/// `$1` is the owner filter. Binding NULL (unscoped) matches every row.
const ACTIVE_TODOS_QUERY: &str = "SELECT t.id, t.title, t.priority, t.user_id, t.deleted, t.updated_at \
    FROM todos t \
    WHERE t.deleted = FALSE AND ($1::TEXT IS NULL OR t.user_id = $1) \
    ORDER BY t.id";

impl domain::todo::driven_ports::TodoReader for DbTodoReader {
    async fn active_todos(
        &self,
        scope: RowScope<'_>,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<Todo>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        query_as::<_, TodoRow>(ACTIVE_TODOS_QUERY)
            .bind(scope.owner())
            .fetch_all(cxn.borrow_connection())
            .await
            .context("trying to fetch active todos")?
            .into_iter()
            .map(Todo::try_from)
            .collect()
    }
}

pub struct DbTodoWriter;

impl domain::todo::driven_ports::TodoWriter for DbTodoWriter {
    async fn insert_todo(
        &self,
        owner_user_id: Option<&str>,
        new_todo: &NewTodo,
        updated_at: DateTime<Utc>,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<i32, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let new_id = query_as::<_, super::NewId>(
            "INSERT INTO todos(title, priority, user_id, deleted, updated_at) \
            VALUES ($1, $2, $3, FALSE, $4) RETURNING todos.id",
        )
        .bind(&new_todo.title)
        .bind(new_todo.priority.value() as i16)
        .bind(owner_user_id)
        .bind(updated_at)
        .fetch_one(cxn.borrow_connection())
        .await
        .context("trying to insert a new todo into the database")?;

        Ok(new_id.id)
    }

    async fn update_todo(
        &self,
        scope: RowScope<'_>,
        todo_id: i32,
        update: &UpdateTodo,
        updated_at: DateTime<Utc>,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<u64, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let result = query(
            "UPDATE todos SET title = $1, priority = $2, updated_at = GREATEST(updated_at, $3) \
            WHERE id = $4 AND ($5::TEXT IS NULL OR user_id = $5)",
        )
        .bind(&update.title)
        .bind(update.priority.value() as i16)
        .bind(updated_at)
        .bind(todo_id)
        .bind(scope.owner())
        .execute(cxn.borrow_connection())
        .await
        .context("trying to update a todo in the database")?;

        Ok(result.rows_affected())
    }

    async fn soft_delete_todo(
        &self,
        scope: RowScope<'_>,
        todo_id: i32,
        updated_at: DateTime<Utc>,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<u64, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let result = query(
            "UPDATE todos SET deleted = TRUE, updated_at = GREATEST(updated_at, $1) \
            WHERE id = $2 AND ($3::TEXT IS NULL OR user_id = $3)",
        )
        .bind(updated_at)
        .bind(todo_id)
        .bind(scope.owner())
        .execute(cxn.borrow_connection())
        .await
        .context("trying to soft-delete a todo in the database")?;

        Ok(result.rows_affected())
    }
}
