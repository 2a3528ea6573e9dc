use std::sync::Arc;

use db::{
    models::{Comment, Project, Task, User, UserBehavior, user_behavior::CreateUserBehavior},
    types::TaskStatus,
};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::RwLock;
use utils::response::ApiResponse;
use utils_jwt::TokenPair;
use uuid::Uuid;

use crate::board::{BoardState, KanbanResponse};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    Api { status: StatusCode, message: String },
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("Session expired, sign in again")]
    SessionExpired,
    #[error("Task {0} is not on the board")]
    UnknownTask(Uuid),
}

#[derive(Debug, Clone)]
pub struct Session {
    pub access: String,
    pub refresh: String,
}

impl From<TokenPair> for Session {
    fn from(tokens: TokenPair) -> Self {
        Self {
            access: tokens.access,
            refresh: tokens.refresh,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    user: User,
    tokens: TokenPair,
}

/// HTTP client for the task board API. Holds the token pair internally and
/// transparently refreshes the access token once when a request comes back
/// 401; a failed refresh clears the session.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<RwLock<Option<Session>>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    pub async fn sign_out(&self) {
        *self.session.write().await = None;
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<&Value>,
        token: Option<String>,
    ) -> Result<reqwest::Response, ClientError> {
        let mut request = self.http.request(method, format!("{}{path}", self.base_url));
        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    async fn parse<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        let envelope: ApiResponse<T> = response.json().await?;
        match envelope.data {
            Some(data) if envelope.success => Ok(data),
            _ => Err(ClientError::Api {
                status,
                message: envelope
                    .message
                    .unwrap_or_else(|| "Unknown API error".to_string()),
            }),
        }
    }

    /// Swaps the refresh token for a new pair. Any failure drops the session
    /// so callers fall back to an interactive sign-in.
    async fn refresh_session(&self) -> Result<(), ClientError> {
        let refresh = {
            let session = self.session.read().await;
            session
                .as_ref()
                .map(|s| s.refresh.clone())
                .ok_or(ClientError::NotAuthenticated)?
        };
        let response = self
            .send(
                Method::POST,
                "/api/auth/refresh",
                None,
                Some(&json!({ "refresh": refresh })),
                None,
            )
            .await?;
        if !response.status().is_success() {
            *self.session.write().await = None;
            return Err(ClientError::SessionExpired);
        }
        let tokens: TokenPair = Self::parse(response).await?;
        *self.session.write().await = Some(tokens.into());
        Ok(())
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ClientError> {
        self.request_with_query(method, path, None, body).await
    }

    async fn request_with_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<Value>,
    ) -> Result<T, ClientError> {
        let access = self.session.read().await.as_ref().map(|s| s.access.clone());
        let response = self
            .send(method.clone(), path, query, body.as_ref(), access)
            .await?;

        // One refresh-and-replay attempt, then give up.
        let response = if response.status() == StatusCode::UNAUTHORIZED {
            self.refresh_session().await?;
            let access = self.session.read().await.as_ref().map(|s| s.access.clone());
            self.send(method, path, query, body.as_ref(), access).await?
        } else {
            response
        };
        Self::parse(response).await
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Option<&str>,
    ) -> Result<User, ClientError> {
        let mut body = json!({
            "username": username,
            "email": email,
            "password": password,
            "password_confirm": password,
        });
        if let Some(role) = role {
            body["role"] = json!(role);
        }
        let response = self
            .send(Method::POST, "/api/auth/register", None, Some(&body), None)
            .await?;
        let auth: AuthResponse = Self::parse(response).await?;
        *self.session.write().await = Some(auth.tokens.into());
        Ok(auth.user)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User, ClientError> {
        let body = json!({ "username": username, "password": password });
        let response = self
            .send(Method::POST, "/api/auth/login", None, Some(&body), None)
            .await?;
        let auth: AuthResponse = Self::parse(response).await?;
        *self.session.write().await = Some(auth.tokens.into());
        Ok(auth.user)
    }

    pub async fn profile(&self) -> Result<User, ClientError> {
        self.request(Method::GET, "/api/auth/profile", None).await
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, ClientError> {
        self.request(Method::GET, "/api/projects", None).await
    }

    pub async fn search_tasks(
        &self,
        query: &str,
        project: Option<Uuid>,
    ) -> Result<Vec<Task>, ClientError> {
        let mut pairs = vec![("q", query.to_string())];
        if let Some(project) = project {
            pairs.push(("project", project.to_string()));
        }
        self.request_with_query(Method::GET, "/api/tasks/search", Some(&pairs), None)
            .await
    }

    pub async fn fetch_board(&self, project_id: Uuid) -> Result<BoardState, ClientError> {
        let board: KanbanResponse = self
            .request(Method::GET, &format!("/api/kanban/{project_id}"), None)
            .await?;
        Ok(BoardState::from(board))
    }

    pub async fn create_task(
        &self,
        project_id: Uuid,
        title: &str,
        description: &str,
    ) -> Result<Task, ClientError> {
        self.request(
            Method::POST,
            "/api/tasks",
            Some(json!({
                "project_id": project_id,
                "title": title,
                "description": description,
            })),
        )
        .await
    }

    pub async fn move_task(&self, task_id: Uuid, status: TaskStatus) -> Result<Task, ClientError> {
        self.request(
            Method::PATCH,
            "/api/tasks/status-update",
            Some(json!({ "task_id": task_id, "status": status })),
        )
        .await
    }

    pub async fn add_comment(&self, task_id: Uuid, content: &str) -> Result<Comment, ClientError> {
        self.request(
            Method::POST,
            &format!("/api/tasks/{task_id}/comments"),
            Some(json!({ "content": content })),
        )
        .await
    }

    pub async fn record_behavior(
        &self,
        event: &CreateUserBehavior,
    ) -> Result<UserBehavior, ClientError> {
        self.request(
            Method::POST,
            "/api/analytics/behavior",
            Some(json!({
                "action_type": event.action_type,
                "task": event.task,
                "duration_seconds": event.duration_seconds,
                "metadata": event.metadata,
            })),
        )
        .await
    }

    /// Drag-and-drop entry point: moves the card locally first, then commits.
    /// A rejected commit puts the card back where it was. A successful move
    /// reports the behavior event in the background; losing that event is
    /// acceptable, losing the move is not.
    pub async fn move_task_on_board(
        &self,
        board: &mut BoardState,
        task_id: Uuid,
        to: TaskStatus,
    ) -> Result<Task, ClientError> {
        let undo = board
            .begin_move(task_id, to)
            .ok_or(ClientError::UnknownTask(task_id))?;

        match self.move_task(task_id, to).await {
            Ok(task) => {
                let client = self.clone();
                let event = CreateUserBehavior {
                    action_type: "task_status_update".to_string(),
                    task: Some(task.id),
                    duration_seconds: None,
                    metadata: Some(json!({ "task_id": task.task_id, "to": to })),
                };
                tokio::spawn(async move {
                    if let Err(err) = client.record_behavior(&event).await {
                        tracing::debug!("failed to report behavior event: {err}");
                    }
                });
                Ok(task)
            }
            Err(err) => {
                board.revert(undo);
                Err(err)
            }
        }
    }
}
