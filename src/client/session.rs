use crate::client::SignedInUser;
use crate::client::gateway::{GatewayError, TodoGateway};
use crate::domain::todo::{Ownership, Priority};
use crate::dto::{MutationReceipt, NewTodo, TodoItem, UpdateTodo};
use tracing::{debug, error};

/// One cached todo along with whatever the user has typed into its title field so far
#[derive(Clone, Debug, PartialEq)]
pub struct TodoRow {
    pub todo: TodoItem,
    pub draft_title: String,
}

impl From<TodoItem> for TodoRow {
    fn from(todo: TodoItem) -> Self {
        TodoRow {
            draft_title: todo.title.clone(),
            todo,
        }
    }
}

/// What the session shows right now
#[derive(Debug, PartialEq)]
pub enum SessionView<'session> {
    /// A gateway call failed. Nothing else is shown until the session is mounted again.
    Failed(&'session str),
    Todos(&'session [TodoRow]),
}

/// Client-driven presenter for one user's list. Keeps a cached copy of the list and
/// re-fetches it in full after every successful write. Title edits stay local drafts until
/// the field loses focus or the user presses update.
pub struct TodoSession<G> {
    gateway: G,
    ownership: Ownership,
    viewer: Option<SignedInUser>,
    rows: Vec<TodoRow>,
    error: Option<String>,
}

impl<G: TodoGateway> TodoSession<G> {
    /// Starts a session and performs the first fetch
    pub async fn mount(gateway: G, ownership: Ownership, viewer: Option<SignedInUser>) -> Self {
        let mut session = TodoSession {
            gateway,
            ownership,
            viewer,
            rows: Vec::new(),
            error: None,
        };
        session.refresh().await;

        session
    }

    pub fn view(&self) -> SessionView<'_> {
        match &self.error {
            Some(message) => SessionView::Failed(message),
            None => SessionView::Todos(&self.rows),
        }
    }

    pub fn viewer(&self) -> Option<&SignedInUser> {
        self.viewer.as_ref()
    }

    /// Re-fetches when somebody else signs in, or everyone signs out
    pub async fn set_identity(&mut self, viewer: Option<SignedInUser>) {
        if self.viewer == viewer {
            return;
        }

        self.viewer = viewer;
        self.refresh().await;
    }

    pub async fn submit_new(&mut self, title: &str, priority: Priority) {
        if !self.may_call() {
            return;
        }

        let new_todo = NewTodo {
            title: title.to_owned(),
            priority: priority.value(),
        };
        let result = self.gateway.create_todo(self.viewer.as_ref(), &new_todo).await;
        self.after_mutation(result).await;
    }

    /// Only updates the draft. Nothing is sent until [Self::blur_title] or [Self::press_update].
    pub fn edit_title(&mut self, todo_id: i32, text: &str) {
        if let Some(row) = self.rows.iter_mut().find(|row| row.todo.id == todo_id) {
            row.draft_title = text.to_owned();
        }
    }

    /// Commits the drafted title alongside the cached priority
    pub async fn blur_title(&mut self, todo_id: i32) {
        let Some(row) = self.row(todo_id) else {
            return;
        };
        let update = UpdateTodo {
            title: row.draft_title.clone(),
            priority: row.todo.priority,
        };

        self.send_update(todo_id, update).await;
    }

    /// Commits the new priority straight away, alongside the cached title rather than the
    /// draft
    pub async fn change_priority(&mut self, todo_id: i32, priority: Priority) {
        let Some(row) = self.row(todo_id) else {
            return;
        };
        let update = UpdateTodo {
            title: row.todo.title.clone(),
            priority: priority.value(),
        };

        self.send_update(todo_id, update).await;
    }

    pub async fn press_update(&mut self, todo_id: i32) {
        self.blur_title(todo_id).await;
    }

    pub async fn press_delete(&mut self, todo_id: i32) {
        if !self.may_call() {
            return;
        }

        let result = self.gateway.delete_todo(self.viewer.as_ref(), todo_id).await;
        self.after_mutation(result).await;
    }

    fn row(&self, todo_id: i32) -> Option<&TodoRow> {
        self.rows.iter().find(|row| row.todo.id == todo_id)
    }

    /// False once an error is showing, or when nobody is signed in and todos are per user
    fn may_call(&self) -> bool {
        self.error.is_none()
            && (self.ownership == Ownership::SingleUser || self.viewer.is_some())
    }

    async fn send_update(&mut self, todo_id: i32, update: UpdateTodo) {
        if !self.may_call() {
            return;
        }

        let result = self
            .gateway
            .update_todo(self.viewer.as_ref(), todo_id, &update)
            .await;
        self.after_mutation(result).await;
    }

    async fn after_mutation(&mut self, result: Result<MutationReceipt, GatewayError>) {
        match result {
            Ok(receipt) => {
                if let Some(reason) = &receipt.skip_reason {
                    debug!(reason = %reason, "Todo service skipped the change");
                }
                self.refresh().await;
            }
            Err(err) => self.fail(err),
        }
    }

    async fn refresh(&mut self) {
        if !self.may_call() {
            self.rows.clear();
            return;
        }

        match self.gateway.list_todos(self.viewer.as_ref()).await {
            Ok(todos) => self.rows = todos.into_iter().map(TodoRow::from).collect(),
            Err(err) => self.fail(err),
        }
    }

    fn fail(&mut self, err: GatewayError) {
        error!("Todo session failed: {err}");
        self.error = Some(err.to_string());
    }
}
