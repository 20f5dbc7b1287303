//! HTTP adapters for the two backend services. Both services answer with a
//! JSON envelope carrying `success` and an optional `message` regardless of
//! HTTP status, so responses are decoded first and classified second.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::{
    domain::{Task, TodoId},
    error::ClientError,
    protocol::{
        CreateTodoRequest, CredentialsRequest, DeleteTodoResponse, LoginResponse,
        RankInfoResponse, RegisterResponse, TaskPatch, TodoListResponse, TodoResponse,
        VerifyResponse,
    },
};

use crate::{
    AuthBackend, LoginOutcome, RankInfoOutcome, RegisterOutcome, TaskBackend, TaskUpdateOutcome,
    VerifyOutcome,
};

fn network_error(err: reqwest::Error) -> ClientError {
    ClientError::network(format!("request failed: {err}"))
}

/// Maps a failed envelope to the error taxonomy using the HTTP status the
/// envelope arrived with.
fn failure(status: StatusCode, message: Option<String>, fallback: &str) -> ClientError {
    let message = message.unwrap_or_else(|| fallback.to_string());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::auth(message),
        StatusCode::NOT_FOUND => ClientError::not_found(message),
        _ => ClientError::server(message),
    }
}

pub struct HttpAuthBackend {
    http: Client,
    base_url: String,
}

impl HttpAuthBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, ClientError> {
        let request = CredentialsRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self
            .http
            .post(format!("{}/api/auth/login", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status();
        let body: LoginResponse = response.json().await.map_err(network_error)?;
        if !body.success {
            return Err(failure(status, body.message, "Invalid credentials"));
        }
        match (body.token, body.user_id, body.username) {
            (Some(token), Some(user_id), Some(username)) => Ok(LoginOutcome {
                token,
                user_id,
                username,
                rank: body.rank,
            }),
            _ => Err(ClientError::server("login response missing session fields")),
        }
    }

    async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<RegisterOutcome, ClientError> {
        let request = CredentialsRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self
            .http
            .post(format!("{}/api/auth/register", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status();
        let body: RegisterResponse = response.json().await.map_err(network_error)?;
        if !body.success {
            return Err(failure(status, body.message, "Registration failed"));
        }
        let user_id = body
            .user_id
            .ok_or_else(|| ClientError::server("register response missing user id"))?;
        Ok(RegisterOutcome { user_id })
    }

    async fn verify(&self, token: &str) -> Result<VerifyOutcome, ClientError> {
        let response = self
            .http
            .post(format!("{}/api/auth/verify", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status();
        let body: VerifyResponse = response.json().await.map_err(network_error)?;
        if !body.success {
            return Err(failure(status, body.message, "Session expired"));
        }
        match (body.user_id, body.username) {
            (Some(user_id), Some(username)) => Ok(VerifyOutcome { user_id, username }),
            _ => Err(ClientError::server("verify response missing user fields")),
        }
    }
}

pub struct HttpTaskBackend {
    http: Client,
    base_url: String,
}

impl HttpTaskBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl TaskBackend for HttpTaskBackend {
    async fn list(&self, token: &str) -> Result<Vec<Task>, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/todos", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status();
        let body: TodoListResponse = response.json().await.map_err(network_error)?;
        if !body.success {
            return Err(failure(status, body.message, "Failed to load tasks"));
        }
        Ok(body.todos)
    }

    async fn create(&self, token: &str, text: &str) -> Result<Task, ClientError> {
        let request = CreateTodoRequest {
            task: text.to_string(),
        };
        let response = self
            .http
            .post(format!("{}/api/todos", self.base_url))
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status();
        let body: TodoResponse = response.json().await.map_err(network_error)?;
        if !body.success {
            return Err(failure(status, body.message, "Failed to add task"));
        }
        body.todo
            .ok_or_else(|| ClientError::server("create response missing todo"))
    }

    async fn update(
        &self,
        token: &str,
        id: TodoId,
        patch: TaskPatch,
    ) -> Result<TaskUpdateOutcome, ClientError> {
        let response = self
            .http
            .put(format!("{}/api/todos/{}", self.base_url, id.0))
            .bearer_auth(token)
            .json(&patch)
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status();
        let body: TodoResponse = response.json().await.map_err(network_error)?;
        if !body.success {
            return Err(failure(status, body.message, "Failed to update task"));
        }
        let todo = body
            .todo
            .ok_or_else(|| ClientError::server("update response missing todo"))?;
        Ok(TaskUpdateOutcome {
            todo,
            rank_upgrade: body.rank_upgrade,
        })
    }

    async fn delete(&self, token: &str, id: TodoId) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(format!("{}/api/todos/{}", self.base_url, id.0))
            .bearer_auth(token)
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status();
        let body: DeleteTodoResponse = response.json().await.map_err(network_error)?;
        if !body.success {
            return Err(failure(status, body.message, "Failed to delete task"));
        }
        Ok(())
    }

    async fn rank_info(&self, token: &str) -> Result<RankInfoOutcome, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/ranks/info", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status();
        let body: RankInfoResponse = response.json().await.map_err(network_error)?;
        if !body.success {
            return Err(failure(status, body.message, "Failed to load rank"));
        }
        match (body.rank, body.progress) {
            (Some(rank), Some(progress)) => Ok(RankInfoOutcome { rank, progress }),
            _ => Err(ClientError::server("rank response missing rank or progress")),
        }
    }
}
