//! HTTP implementation of `RemoteApi`
//!
//! Talks to an Asana-style REST API: every request and response body is
//! wrapped in a `{"data": ...}` envelope and created objects are addressed
//! by their `gid`.
//!
//! Transport concerns (rate limiting, retries) are left to the server and
//! the operator; a non-2xx answer is reported as an error for the one call.

use super::traits::{ExistingTag, RemoteApi};
use crate::model::*;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Default base URL of the target API
pub const DEFAULT_API_URL: &str = "https://app.asana.com/api/1.0";

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct Created {
    gid: TargetId,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// REST client for the target workspace
#[derive(Clone)]
pub struct HttpRemoteApi {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpRemoteApi {
    pub fn new(base_url: &str, access_token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn request<B, R>(&self, method: Method, path: &str, body: Option<&B>) -> Result<R>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        let mut req = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            req = req.json(&Envelope { data: body });
        }
        if let Some(ref token) = self.access_token {
            req = req.bearer_auth(token);
        }

        let response = req
            .send()
            .await
            .with_context(|| format!("{} {} failed to connect", method, path))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if let Ok(err) = serde_json::from_str::<ErrorResponse>(&body) {
                let messages: Vec<String> = err.errors.into_iter().map(|e| e.message).collect();
                if !messages.is_empty() {
                    anyhow::bail!(
                        "{} {} returned {}: {}",
                        method,
                        path,
                        status.as_u16(),
                        messages.join("; ")
                    );
                }
            }
            anyhow::bail!("{} {} returned {}: {}", method, path, status.as_u16(), body);
        }

        let envelope: Envelope<R> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response of {} {}", method, path))?;
        Ok(envelope.data)
    }

    async fn create<B: Serialize + ?Sized + Sync>(&self, path: &str, body: &B) -> Result<TargetId> {
        let created: Created = self.request(Method::POST, path, Some(body)).await?;
        Ok(created.gid)
    }

    async fn post<B: Serialize + ?Sized + Sync>(&self, path: &str, body: &B) -> Result<()> {
        let _: IgnoredAny = self.request(Method::POST, path, Some(body)).await?;
        Ok(())
    }

    async fn put<B: Serialize + ?Sized + Sync>(&self, path: &str, body: &B) -> Result<()> {
        let _: IgnoredAny = self.request(Method::PUT, path, Some(body)).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn create_team(&self, req: &CreateTeamRequest) -> Result<TargetId> {
        self.create("/teams", req).await
    }

    async fn create_project(&self, req: &CreateProjectRequest) -> Result<TargetId> {
        self.create("/projects", req).await
    }

    async fn create_tag(&self, req: &CreateTagRequest) -> Result<TargetId> {
        self.create("/tags", req).await
    }

    async fn create_task(&self, req: &CreateTaskRequest) -> Result<TargetId> {
        self.create("/tasks", req).await
    }

    async fn create_attachment(&self, req: &CreateAttachmentRequest) -> Result<TargetId> {
        self.create(&format!("/tasks/{}/attachments", req.task), req)
            .await
    }

    async fn create_user(&self, req: &CreateUserRequest) -> Result<TargetId> {
        self.create(&format!("/workspaces/{}/addUser", req.workspace), req)
            .await
    }

    async fn add_story(&self, task: &TargetId, text: &str) -> Result<()> {
        self.post(&format!("/tasks/{}/stories", task), &json!({ "text": text }))
            .await
    }

    async fn existing_tags(&self, workspace: &TargetId) -> Result<Vec<ExistingTag>> {
        self.request::<(), _>(Method::GET, &format!("/workspaces/{}/tags", workspace), None)
            .await
    }

    async fn add_subtask(&self, parent: &TargetId, subtask: &TargetId) -> Result<()> {
        self.post(
            &format!("/tasks/{}/setParent", subtask),
            &json!({ "parent": parent }),
        )
        .await
    }

    async fn add_task_to_project(&self, project: &TargetId, task: &TargetId) -> Result<()> {
        self.post(
            &format!("/tasks/{}/addProject", task),
            &json!({ "project": project }),
        )
        .await
    }

    async fn add_tag_to_task(&self, tag: &TargetId, task: &TargetId) -> Result<()> {
        self.post(&format!("/tasks/{}/addTag", task), &json!({ "tag": tag }))
            .await
    }

    async fn set_assignee(&self, task: &TargetId, user: &TargetId) -> Result<()> {
        self.put(&format!("/tasks/{}", task), &json!({ "assignee": user }))
            .await
    }

    async fn set_assignee_status(&self, task: &TargetId, status: AssigneeStatus) -> Result<()> {
        self.put(
            &format!("/tasks/{}", task),
            &json!({ "assignee_status": status }),
        )
        .await
    }

    async fn add_task_followers(&self, task: &TargetId, followers: &[TargetId]) -> Result<()> {
        self.post(
            &format!("/tasks/{}/addFollowers", task),
            &json!({ "followers": followers }),
        )
        .await
    }

    async fn add_project_followers(
        &self,
        project: &TargetId,
        followers: &[TargetId],
    ) -> Result<()> {
        self.post(
            &format!("/projects/{}/addFollowers", project),
            &json!({ "followers": followers }),
        )
        .await
    }

    async fn add_team_member(&self, team: &TargetId, user: &TargetId) -> Result<()> {
        self.post(&format!("/teams/{}/addUser", team), &json!({ "user": user }))
            .await
    }

    async fn add_project_members(&self, project: &TargetId, members: &[TargetId]) -> Result<()> {
        self.post(
            &format!("/projects/{}/addMembers", project),
            &json!({ "members": members }),
        )
        .await
    }
}
