//! Outbound email for activation and password-reset links
//!
//! Dispatch is fire-and-forget from the flows' perspective: callers spawn a
//! task and move on, and delivery failures are logged, never propagated.

use anyhow::Result;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::{error, info};

/// SMTP configuration
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// SMTP relay host
    pub host: String,
    /// SMTP relay port
    pub port: u16,
    /// SMTP username
    pub username: String,
    /// SMTP password
    pub password: String,
    /// From address for outgoing mail
    pub from: String,
}

impl MailerConfig {
    /// Create a new MailerConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SMTP_HOST`: SMTP relay host (required)
    /// - `SMTP_PORT`: SMTP relay port (default: 465)
    /// - `SMTP_USERNAME`: SMTP username (required)
    /// - `SMTP_PASSWORD`: SMTP password (required)
    /// - `SMTP_FROM`: From address (default: SMTP_USERNAME)
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("SMTP_HOST")
            .map_err(|_| anyhow::anyhow!("SMTP_HOST environment variable not set"))?;

        let port = std::env::var("SMTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(465);

        let username = std::env::var("SMTP_USERNAME")
            .map_err(|_| anyhow::anyhow!("SMTP_USERNAME environment variable not set"))?;

        let password = std::env::var("SMTP_PASSWORD")
            .map_err(|_| anyhow::anyhow!("SMTP_PASSWORD environment variable not set"))?;

        let from = std::env::var("SMTP_FROM").unwrap_or_else(|_| username.clone());

        Ok(MailerConfig {
            host,
            port,
            username,
            password,
            from,
        })
    }
}

/// Mail service
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    /// Create a new mailer from configuration
    pub fn new(config: &MailerConfig) -> Result<Self> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        let from = config
            .from
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid SMTP from address: {}", e))?;

        Ok(Mailer { transport, from })
    }

    /// Send the account activation email
    pub async fn send_activation_mail(&self, to: &str, link: &str) {
        let html = format!(
            "<div><h1>Для активации перейдите по ссылке</h1><a href=\"{link}\">{link}</a></div>"
        );

        if let Err(e) = self.send(to, "Активация аккаунта", html).await {
            error!("Failed to send activation mail to {}: {}", to, e);
        }
    }

    /// Send the change-password email
    pub async fn send_change_password_mail(&self, to: &str, link: &str) {
        let html = format!(
            "<div><h1>Для смены пароля перейдите на</h1><a href=\"{link}\">{link}</a></div>"
        );

        if let Err(e) = self.send(to, "Смена пароля", html).await {
            error!("Failed to send change-password mail to {}: {}", to, e);
        }
    }

    async fn send(&self, to: &str, subject: &str, html: String) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid recipient address: {}", e))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)?;

        self.transport.send(message).await?;
        info!("Sent \"{}\" mail to {}", subject, to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_mailer_config_from_env() {
        unsafe {
            std::env::set_var("SMTP_HOST", "smtp.example.com");
            std::env::set_var("SMTP_USERNAME", "shop@example.com");
            std::env::set_var("SMTP_PASSWORD", "hunter2");
            std::env::remove_var("SMTP_PORT");
            std::env::remove_var("SMTP_FROM");
        }

        let config = MailerConfig::from_env().unwrap();
        assert_eq!(config.host, "smtp.example.com");
        assert_eq!(config.port, 465);
        assert_eq!(config.from, "shop@example.com");

        unsafe {
            std::env::remove_var("SMTP_HOST");
            std::env::remove_var("SMTP_USERNAME");
            std::env::remove_var("SMTP_PASSWORD");
        }
    }

    #[test]
    #[serial]
    fn test_mailer_config_requires_host() {
        unsafe {
            std::env::remove_var("SMTP_HOST");
        }

        assert!(MailerConfig::from_env().is_err());
    }
}
