use crate::client::SignedInUser;
use crate::dto::{MutationReceipt, NewTodo, TodoItem, UpdateTodo};
use anyhow::Context;
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_tracing::TracingMiddleware;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("could not reach the todo service: {0:#}")]
    Transport(#[from] reqwest_middleware::Error),
    #[error("the todo service sent an unreadable response: {0}")]
    Decode(#[from] reqwest::Error),
    /// The service answered with an error. `message` is the most specific explanation it gave.
    #[error("{message}")]
    Rejected {
        status: StatusCode,
        error_code: String,
        message: String,
    },
}

/// The todo store as seen from a client. Every call is made on behalf of `viewer`.
pub trait TodoGateway {
    async fn list_todos(&self, viewer: Option<&SignedInUser>)
    -> Result<Vec<TodoItem>, GatewayError>;
    async fn create_todo(
        &self,
        viewer: Option<&SignedInUser>,
        new_todo: &NewTodo,
    ) -> Result<MutationReceipt, GatewayError>;
    async fn update_todo(
        &self,
        viewer: Option<&SignedInUser>,
        todo_id: i32,
        update: &UpdateTodo,
    ) -> Result<MutationReceipt, GatewayError>;
    async fn delete_todo(
        &self,
        viewer: Option<&SignedInUser>,
        todo_id: i32,
    ) -> Result<MutationReceipt, GatewayError>;
}

/// Talks to the JSON API under `/api/todos`, passing the viewer's access token as a bearer
/// header so the server can scope each call
#[derive(Clone)]
pub struct HttpTodoGateway {
    todos_url: String,
    http_client: ClientWithMiddleware,
}

impl HttpTodoGateway {
    pub fn new(base_url: &str) -> Result<Self, anyhow::Error> {
        let base_client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(10))
            .build()
            .context("building the HTTP client")?;
        let http_client = ClientBuilder::new(base_client)
            .with(TracingMiddleware::default())
            .build();

        Ok(Self::with_client(base_url, http_client))
    }

    pub fn with_client(base_url: &str, http_client: ClientWithMiddleware) -> Self {
        HttpTodoGateway {
            todos_url: format!("{}/api/todos", base_url.trim_end_matches('/')),
            http_client,
        }
    }

    fn todo_url(&self, todo_id: i32) -> String {
        format!("{}/{todo_id}", self.todos_url)
    }
}

fn authorized(request: RequestBuilder, viewer: Option<&SignedInUser>) -> RequestBuilder {
    match viewer {
        Some(user) => request.bearer_auth(&user.access_token),
        None => request,
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error_code: String,
    error_description: String,
    extra_info: Option<serde_json::Value>,
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let (error_code, message) = match response.json::<ErrorBody>().await {
        Ok(ErrorBody {
            error_code,
            extra_info: Some(serde_json::Value::String(detail)),
            ..
        }) => (error_code, detail),
        Ok(body) => (body.error_code, body.error_description),
        Err(_) => (
            "unknown".to_owned(),
            format!("the todo service responded with {status}"),
        ),
    };
    debug!(%status, error_code = %error_code, "Todo service rejected the request");

    Err(GatewayError::Rejected {
        status,
        error_code,
        message,
    })
}

impl TodoGateway for HttpTodoGateway {
    async fn list_todos(
        &self,
        viewer: Option<&SignedInUser>,
    ) -> Result<Vec<TodoItem>, GatewayError> {
        let response = authorized(self.http_client.get(&self.todos_url), viewer)
            .send()
            .await?;

        read_json(response).await
    }

    async fn create_todo(
        &self,
        viewer: Option<&SignedInUser>,
        new_todo: &NewTodo,
    ) -> Result<MutationReceipt, GatewayError> {
        let response = authorized(self.http_client.post(&self.todos_url), viewer)
            .json(new_todo)
            .send()
            .await?;

        read_json(response).await
    }

    async fn update_todo(
        &self,
        viewer: Option<&SignedInUser>,
        todo_id: i32,
        update: &UpdateTodo,
    ) -> Result<MutationReceipt, GatewayError> {
        let response = authorized(self.http_client.patch(self.todo_url(todo_id)), viewer)
            .json(update)
            .send()
            .await?;

        read_json(response).await
    }

    async fn delete_todo(
        &self,
        viewer: Option<&SignedInUser>,
        todo_id: i32,
    ) -> Result<MutationReceipt, GatewayError> {
        let response = authorized(self.http_client.delete(self.todo_url(todo_id)), viewer)
            .send()
            .await?;

        read_json(response).await
    }
}
