// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Welcome email relay
//!
//! Thin seam over an HTTP mail API. The relay forwards the recipient and the
//! template parameters; rendering the email body is the mail provider's job,
//! not ours.

use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};

/// Parameters of the templated welcome email, as posted by the portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeEmail {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub login_email: String,
    #[serde(default)]
    pub login_link: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("mail API request failed: {0}")]
    Transport(String),
    #[error("mail API rejected the message: {status} - {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_welcome(&self, email: &WelcomeEmail) -> Result<(), MailerError>;
}

/// Outbound message shape for the mail API: template name plus parameters.
#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    template: &'a str,
    name: &'a str,
    login_email: &'a str,
    login_link: &'a str,
}

/// Sends through a bearer-key HTTP mail API.
pub struct HttpMailer {
    endpoint: String,
    api_key: String,
    from: String,
    http_client: reqwest::Client,
}

impl HttpMailer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            from: from.into(),
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_welcome(&self, email: &WelcomeEmail) -> Result<(), MailerError> {
        let message = OutboundMessage {
            from: &self.from,
            to: &email.to,
            subject: "Welcome",
            template: "welcome",
            name: &email.name,
            login_email: &email.login_email,
            login_link: &email.login_link,
        };

        let resp = self
            .http_client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&message)
            .send()
            .await
            .map_err(|err| MailerError::Transport(err.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(MailerError::Rejected { status, body });
        }

        info!("welcome email queued for {}", email.to);
        Ok(())
    }
}

/// Recording double for tests.
#[derive(Default)]
pub struct MockMailer {
    failure: Option<String>,
    sent: std::sync::Mutex<Vec<WelcomeEmail>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_with(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<WelcomeEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_welcome(&self, email: &WelcomeEmail) -> Result<(), MailerError> {
        if let Some(message) = &self.failure {
            return Err(MailerError::Transport(message.clone()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}
