//! Outbound mail transports.
//!
//! `LogMailer` is the local development sender; it logs the message and reports
//! success. `HttpMailer` posts the message to a transactional mail API.

use std::time::Duration;

use anyhow::Context as _;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::repository::Mailer;

#[derive(Clone, Debug)]
pub struct LogMailer;

impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        info!(subject, "mail send stub");
        debug!(to, body = %html_body, "mail send stub body");
        Ok(())
    }
}

#[derive(Serialize)]
struct OutgoingMail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Clone, Debug)]
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(
        endpoint: String,
        api_key: String,
        from: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build mail API client")?;
        Ok(Self {
            client,
            endpoint,
            api_key,
            from,
        })
    }
}

impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        let mail = OutgoingMail {
            from: &self.from,
            to: [to],
            subject,
            html: html_body,
        };
        self.client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&mail)
            .send()
            .await
            .context("mail API request")?
            .error_for_status()
            .context("mail API rejected the message")?;
        Ok(())
    }
}

/// Transport selected at startup from configuration.
#[derive(Clone, Debug)]
pub enum AppMailer {
    Log(LogMailer),
    Http(HttpMailer),
}

impl Mailer for AppMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        match self {
            Self::Log(mailer) => mailer.send(to, subject, html_body).await,
            Self::Http(mailer) => mailer.send(to, subject, html_body).await,
        }
    }
}
