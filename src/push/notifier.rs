use crate::errors::TaskResult;
use a2a_types::{JsonWebKeySet, PushNotificationConfig, Task};
use dashmap::DashMap;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::sync::Arc;
use std::time::Duration;

use super::auth::PushNotificationAuth;

/// Header carrying the client-chosen token of a registration.
pub const NOTIFICATION_TOKEN_HEADER: &str = "X-A2A-Notification-Token";
/// Query parameter carrying the verification challenge.
pub const VALIDATION_TOKEN_PARAM: &str = "validationToken";

/// Registers callback URLs per task and delivers signed task snapshots.
///
/// Only URLs that passed the challenge round-trip are ever stored, so
/// [`PushNotifier::notify`] never contacts an unverified endpoint.
pub struct PushNotifier {
    auth: Arc<PushNotificationAuth>,
    client: reqwest::Client,
    verification_timeout: Duration,
    delivery_timeout: Duration,
    registrations: DashMap<String, PushNotificationConfig>,
}

impl PushNotifier {
    pub fn new(
        auth: Arc<PushNotificationAuth>,
        verification_timeout: Duration,
        delivery_timeout: Duration,
    ) -> TaskResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("taskhub/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            auth,
            client,
            verification_timeout,
            delivery_timeout,
            registrations: DashMap::new(),
        })
    }

    pub fn auth(&self) -> &Arc<PushNotificationAuth> {
        &self.auth
    }

    /// Key set receivers use to verify notifications.
    pub fn jwks(&self) -> JsonWebKeySet {
        self.auth.jwks()
    }

    /// Verifies `config.url` and, on success, binds it to the task.
    ///
    /// Returns whether the URL passed verification. A failed verification
    /// leaves any previous registration of the task untouched.
    pub async fn register_url(&self, task_id: &str, config: PushNotificationConfig) -> bool {
        if !self.verify_url(&config.url).await {
            return false;
        }
        self.bind(task_id, config);
        true
    }

    /// Binds an already verified config to the task.
    pub fn bind(&self, task_id: &str, config: PushNotificationConfig) {
        tracing::info!(task_id, url = %config.url, "registered push notification url");
        self.registrations.insert(task_id.to_string(), config);
    }

    /// Challenge round-trip: the endpoint must echo the validation token.
    pub async fn verify_url(&self, url: &str) -> bool {
        let challenge = uuid::Uuid::new_v4().to_string();
        match self.send_challenge(url, &challenge).await {
            Ok(echoed) if echoed == challenge => {
                tracing::debug!(url, "push notification url verified");
                true
            }
            Ok(_) => {
                tracing::warn!(url, "push notification url echoed a different token");
                false
            }
            Err(error) => {
                tracing::warn!(url, error = %error, "push notification url verification failed");
                false
            }
        }
    }

    async fn send_challenge(&self, url: &str, challenge: &str) -> TaskResult<String> {
        let token = self.auth.sign(b"")?;
        let response = self
            .client
            .get(url)
            .query(&[(VALIDATION_TOKEN_PARAM, challenge)])
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .timeout(self.verification_timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    pub fn get_config(&self, task_id: &str) -> Option<PushNotificationConfig> {
        self.registrations
            .get(task_id)
            .map(|config| config.value().clone())
    }

    pub fn is_registered(&self, task_id: &str) -> bool {
        self.registrations.contains_key(task_id)
    }

    /// Fire-and-forget delivery of the task snapshot to its registered URL.
    ///
    /// Does nothing for tasks without a verified registration. Failures are
    /// logged and never retried.
    pub fn notify(&self, task: &Task) {
        let Some(config) = self.get_config(&task.id) else {
            return;
        };

        let delivery = Delivery {
            auth: Arc::clone(&self.auth),
            client: self.client.clone(),
            timeout: self.delivery_timeout,
            config,
        };
        let task = task.clone();
        tokio::spawn(async move {
            if let Err(error) = delivery.send(&task).await {
                tracing::warn!(
                    task_id = %task.id,
                    url = %delivery.config.url,
                    error = %error,
                    "push notification delivery failed"
                );
            }
        });
    }
}

struct Delivery {
    auth: Arc<PushNotificationAuth>,
    client: reqwest::Client,
    timeout: Duration,
    config: PushNotificationConfig,
}

impl Delivery {
    async fn send(&self, task: &Task) -> TaskResult<()> {
        let body = serde_json::to_vec(task)?;
        let token = self.auth.sign(&body)?;

        let mut request = self
            .client
            .post(&self.config.url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .timeout(self.timeout);
        if let Some(client_token) = &self.config.token {
            request = request.header(NOTIFICATION_TOKEN_HEADER, client_token);
        }

        request.body(body).send().await?.error_for_status()?;
        tracing::debug!(task_id = %task.id, state = %task.status.state, "push notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier() -> PushNotifier {
        PushNotifier::new(
            Arc::new(PushNotificationAuth::generate()),
            Duration::from_millis(500),
            Duration::from_millis(500),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn unreachable_url_is_not_registered() {
        let notifier = notifier();
        let config = PushNotificationConfig {
            url: "http://127.0.0.1:9/notify".to_string(),
            token: None,
            authentication: None,
        };

        assert!(!notifier.register_url("task-1", config).await);
        assert!(!notifier.is_registered("task-1"));
        assert!(notifier.get_config("task-1").is_none());
    }

    #[tokio::test]
    async fn notify_without_registration_is_a_no_op() {
        let notifier = notifier();
        let task: Task = serde_json::from_value(serde_json::json!({
            "id": "task-1",
            "sessionId": "s",
            "status": {"state": "working"}
        }))
        .unwrap();
        notifier.notify(&task);
    }
}
