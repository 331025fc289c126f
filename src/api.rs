use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::ClientError;
use crate::gateway::{RequestOptions, Transport};
use crate::models::{NewTask, Role, Route, Session, Task, TaskUpdate, UserItem};

/// Typed wrappers for each backend endpoint.
pub struct TaskApi<T> {
    transport: T,
}

impl<T: Transport> TaskApi<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call<R: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<R, ClientError> {
        let value = self.transport.request(path, options).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), ClientError> {
        let body = json!({ "email": email, "password": password });
        self.transport
            .request("/auth/login", RequestOptions::post(Some(body)))
            .await?;
        Ok(())
    }

    pub async fn me(&self) -> Result<Session, ClientError> {
        self.call("/auth/me", RequestOptions::get()).await
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        self.transport
            .request("/auth/logout", RequestOptions::post(None))
            .await?;
        Ok(())
    }

    /// Landing-page login: the identity lookup is only issued once login has completed.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(Session, Route), ClientError> {
        self.login(email, password).await?;
        let session = self.me().await?;
        let route = session.role.home();
        Ok((session, route))
    }

    /// Returns the backend's confirmation message.
    pub async fn register(&self, email: &str, password: &str, role: Role) -> Result<String, ClientError> {
        let body = json!({ "email": email, "password": password, "role": role.as_str() });
        let value = self
            .transport
            .request("/auth/register", RequestOptions::post(Some(body)))
            .await?;
        Ok(message_of(&value).unwrap_or_else(|| "User registered successfully".to_string()))
    }

    pub async fn list_tasks(&self, role: Role) -> Result<Vec<Task>, ClientError> {
        let path = match role {
            Role::Admin => "/tasks",
            Role::User | Role::Other => "/tasks/",
        };
        self.call(path, RequestOptions::get()).await
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<Task, ClientError> {
        let body = serde_json::to_value(task)?;
        self.call("/tasks", RequestOptions::post(Some(body))).await
    }

    pub async fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<(), ClientError> {
        let body = serde_json::to_value(update)?;
        self.transport
            .request(&format!("/tasks/{id}"), RequestOptions::patch(body))
            .await?;
        Ok(())
    }

    pub async fn delete_task(&self, id: &str) -> Result<(), ClientError> {
        self.transport
            .request(&format!("/tasks/{id}"), RequestOptions::delete())
            .await?;
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<UserItem>, ClientError> {
        self.call("/users/", RequestOptions::get()).await
    }
}

fn message_of(value: &Value) -> Option<String> {
    value.get("message")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockTransport;
    use mockall::Sequence;
    use reqwest::Method;

    #[tokio::test]
    async fn test_sign_in_routes_admin_to_admin_view() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        transport
            .expect_request()
            .withf(|path, opts| {
                path == "/auth/login"
                    && opts.method == Method::POST
                    && opts.body == Some(json!({ "email": "a@x.com", "password": "p" }))
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(json!({ "message": "Login successful" })));
        transport
            .expect_request()
            .withf(|path, opts| path == "/auth/me" && opts.method == Method::GET)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(json!({ "id": "1", "email": "a@x.com", "role": "admin" })));

        let api = TaskApi::new(transport);
        let (session, route) = api.sign_in("a@x.com", "p").await.unwrap();
        assert_eq!(session.role, Role::Admin);
        assert_eq!(route, Route::Admin);
    }

    #[tokio::test]
    async fn test_sign_in_routes_user_to_user_view() {
        let mut transport = MockTransport::new();
        transport
            .expect_request()
            .withf(|path, _| path == "/auth/login")
            .returning(|_, _| Ok(json!({ "message": "Login successful" })));
        transport
            .expect_request()
            .withf(|path, _| path == "/auth/me")
            .returning(|_, _| Ok(json!({ "id": "2", "email": "a@x.com", "role": "user" })));

        let api = TaskApi::new(transport);
        let (_, route) = api.sign_in("a@x.com", "p").await.unwrap();
        assert_eq!(route, Route::User);
    }

    #[tokio::test]
    async fn test_failed_login_skips_identity_lookup() {
        let mut transport = MockTransport::new();
        transport
            .expect_request()
            .withf(|path, _| path == "/auth/login")
            .times(1)
            .returning(|_, _| {
                Err(ClientError::Request {
                    status: 401,
                    message: "Invalid password".to_string(),
                })
            });
        transport
            .expect_request()
            .withf(|path, _| path == "/auth/me")
            .never();

        let api = TaskApi::new(transport);
        let err = api.sign_in("a@x.com", "bad").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid password");
    }

    #[tokio::test]
    async fn test_list_tasks_path_depends_on_role() {
        let mut transport = MockTransport::new();
        transport
            .expect_request()
            .withf(|path, _| path == "/tasks")
            .times(1)
            .returning(|_, _| Ok(json!([])));
        transport
            .expect_request()
            .withf(|path, _| path == "/tasks/")
            .times(1)
            .returning(|_, _| Ok(json!([])));

        let api = TaskApi::new(transport);
        assert!(api.list_tasks(Role::Admin).await.unwrap().is_empty());
        assert!(api.list_tasks(Role::User).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_sends_patch_to_task_path() {
        let mut transport = MockTransport::new();
        transport
            .expect_request()
            .withf(|path, opts| {
                path == "/tasks/abc"
                    && opts.method == Method::PATCH
                    && opts.body == Some(json!({ "status": "done" }))
            })
            .times(1)
            .returning(|_, _| Ok(json!({ "message": "Task updated successfully" })));

        let api = TaskApi::new(transport);
        api.update_task("abc", &TaskUpdate::status_only(crate::models::TaskStatus::Done))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_register_returns_backend_message() {
        let mut transport = MockTransport::new();
        transport
            .expect_request()
            .withf(|path, opts| {
                path == "/auth/register" && opts.body.as_ref().unwrap()["role"] == "user"
            })
            .returning(|_, _| Ok(json!({ "message": "User registered successfully" })));

        let api = TaskApi::new(transport);
        let message = api.register("c@x.com", "pw", Role::User).await.unwrap();
        assert_eq!(message, "User registered successfully");
    }

    #[tokio::test]
    async fn test_malformed_identity_is_decode_error() {
        let mut transport = MockTransport::new();
        transport
            .expect_request()
            .returning(|_, _| Ok(json!({ "email": "a@x.com" })));

        let api = TaskApi::new(transport);
        assert!(matches!(api.me().await, Err(ClientError::Decode(_))));
    }
}
