//! REST half of the Discord session.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::platform::{
    ApplicationCommand, CommandScope, Interaction, InteractionResponse, Message, MessageSend,
    PlatformError, PlatformResult,
};

const API_BASE: &str = "https://discord.com/api/v10";
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

#[derive(Deserialize)]
struct Application {
    id: String,
}

pub(super) struct RestClient {
    http: Client,
    token: String,
    application_id: OnceCell<String>,
}

impl RestClient {
    pub fn new(token: &str) -> Self {
        Self {
            http: Client::new(),
            token: token.to_string(),
            application_id: OnceCell::new(),
        }
    }

    /// Perform a request, retrying when rate limited.
    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> PlatformResult<Option<Value>> {
        let url = format!("{API_BASE}{path}");
        let mut attempt = 0;

        loop {
            let mut request = self
                .http
                .request(method.clone(), &url)
                .header("Authorization", format!("Bot {}", self.token))
                .header("User-Agent", concat!("DiscordBot (componentbot, ", env!("CARGO_PKG_VERSION"), ")"));
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS && attempt < MAX_RATE_LIMIT_RETRIES {
                let retry_after = response
                    .json::<Value>()
                    .await
                    .ok()
                    .and_then(|body| body["retry_after"].as_f64())
                    .unwrap_or(1.0);
                warn!("Rate limited on {} {}, retrying in {:.2}s", method, path, retry_after);
                tokio::time::sleep(Duration::from_secs_f64(retry_after)).await;
                attempt += 1;
                continue;
            }

            if status == StatusCode::NO_CONTENT {
                return Ok(None);
            }

            if !status.is_success() {
                let message = response
                    .json::<Value>()
                    .await
                    .ok()
                    .and_then(|body| body["message"].as_str().map(String::from))
                    .unwrap_or_else(|| status.to_string());
                return Err(PlatformError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            debug!("{} {} -> {}", method, path, status);
            return Ok(Some(response.json().await?));
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> PlatformResult<T> {
        let value = self.send(method, path, body).await?.unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }

    /// Application id of the bot, fetched once.
    pub async fn application_id(&self) -> PlatformResult<&str> {
        let id = self
            .application_id
            .get_or_try_init(|| async {
                let application: Application = self
                    .request(Method::GET, "/oauth2/applications/@me", None)
                    .await?;
                Ok::<_, PlatformError>(application.id)
            })
            .await?;
        Ok(id.as_str())
    }

    async fn commands_path(&self, scope: &CommandScope) -> PlatformResult<String> {
        let application_id = self.application_id().await?;
        Ok(match scope {
            CommandScope::Global => format!("/applications/{application_id}/commands"),
            CommandScope::Guild(guild_id) => {
                format!("/applications/{application_id}/guilds/{guild_id}/commands")
            }
        })
    }

    pub async fn send_message(&self, channel_id: &str, message: &MessageSend) -> PlatformResult<Message> {
        let body = serde_json::to_value(message)?;
        self.request(Method::POST, &format!("/channels/{channel_id}/messages"), Some(&body))
            .await
    }

    pub async fn application_commands(&self, scope: &CommandScope) -> PlatformResult<Vec<ApplicationCommand>> {
        let path = self.commands_path(scope).await?;
        self.request(Method::GET, &path, None).await
    }

    pub async fn create_application_command(
        &self,
        scope: &CommandScope,
        command: &ApplicationCommand,
    ) -> PlatformResult<ApplicationCommand> {
        let path = self.commands_path(scope).await?;
        let mut body = serde_json::to_value(command)?;
        if let Some(object) = body.as_object_mut() {
            object.remove("id");
        }
        self.request(Method::POST, &path, Some(&body)).await
    }

    pub async fn delete_application_command(&self, scope: &CommandScope, command_id: &str) -> PlatformResult<()> {
        let path = format!("{}/{command_id}", self.commands_path(scope).await?);
        self.send(Method::DELETE, &path, None).await?;
        Ok(())
    }

    pub async fn respond_interaction(
        &self,
        interaction: &Interaction,
        response: &InteractionResponse,
    ) -> PlatformResult<()> {
        let path = format!("/interactions/{}/{}/callback", interaction.id, interaction.token);
        self.send(Method::POST, &path, Some(&response.to_payload())).await?;
        Ok(())
    }
}
