use reqwest::Client;

use crate::config::RegistryConfig;
use crate::gateway::GatewayError;

/// Operations understood by the registry's `/alter` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlterOp {
    Create,
    Delete,
    AddSession,
    RemoveSession,
}

impl AlterOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AlterOp::Create => "create",
            AlterOp::Delete => "delete",
            AlterOp::AddSession => "add_session",
            AlterOp::RemoveSession => "remove_session",
        }
    }
}

/// HTTP client for the broker's room registry. Only the status code of a
/// response is ever looked at.
#[derive(Clone)]
pub struct RoomRegistry {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl RoomRegistry {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token: None,
        }
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        let registry = Self::new(config.base_url.clone());
        match &config.auth_token {
            Some(token) => registry.with_auth_token(token.clone()),
            None => registry,
        }
    }

    pub fn with_auth_token(mut self, token: String) -> Self {
        self.auth_token = Some(token);
        self
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref token) = self.auth_token {
            builder.header("Authorization", format!("Bearer {token}"))
        } else {
            builder
        }
    }

    async fn alter(&self, query: &[(&str, &str)]) -> Result<(), GatewayError> {
        let url = format!("{}/alter", self.base_url);
        let builder = self.client.post(&url).query(query);
        let resp = self.apply_auth(builder).send().await?;

        let status = resp.status().as_u16();
        match GatewayError::from_status(status) {
            None => Ok(()),
            Some(err) => {
                tracing::warn!("room registry rejected {query:?}: {status}");
                Err(err)
            }
        }
    }

    pub async fn alter_room(&self, room_id: &str, op: AlterOp) -> Result<(), GatewayError> {
        self.alter(&[("op", op.as_str()), ("room_id", room_id)])
            .await
    }

    pub async fn alter_session(
        &self,
        room_id: &str,
        session_id: &str,
        op: AlterOp,
    ) -> Result<(), GatewayError> {
        self.alter(&[
            ("op", op.as_str()),
            ("room_id", room_id),
            ("session_id", session_id),
        ])
        .await
    }

    pub async fn create_room(&self, room_id: &str) -> Result<(), GatewayError> {
        self.alter_room(room_id, AlterOp::Create).await
    }

    pub async fn delete_room(&self, room_id: &str) -> Result<(), GatewayError> {
        self.alter_room(room_id, AlterOp::Delete).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_query_values() {
        assert_eq!(AlterOp::Create.as_str(), "create");
        assert_eq!(AlterOp::Delete.as_str(), "delete");
        assert_eq!(AlterOp::AddSession.as_str(), "add_session");
        assert_eq!(AlterOp::RemoveSession.as_str(), "remove_session");
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let registry = RoomRegistry::new("http://registry:9000/");
        assert_eq!(registry.base_url, "http://registry:9000");
    }

    #[test]
    fn test_from_config_applies_token() {
        let registry = RoomRegistry::from_config(&RegistryConfig {
            base_url: "http://registry:9000".to_string(),
            auth_token: Some("s3cret".to_string()),
        });
        assert_eq!(registry.auth_token.as_deref(), Some("s3cret"));
    }
}
