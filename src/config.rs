use anyhow::Context;

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub starttls: bool,
    pub from: String,
}

/// URL templates for links sent by email. `{token}` is replaced by the token.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub confirm_email_url: String,
    pub reset_password_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub links: LinkConfig,
    /// `None` means deliveries are only logged.
    pub mail: Option<MailConfig>,
    pub pepper: Option<String>,
    pub min_password_length: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

        let links = LinkConfig {
            confirm_email_url: std::env::var("CONFIRM_EMAIL_URL")
                .unwrap_or_else(|_| "http://localhost:8080/api/confirm-email/{token}".into()),
            reset_password_url: std::env::var("RESET_PASSWORD_URL")
                .unwrap_or_else(|_| "http://localhost:8080/api/reset-password/{token}".into()),
        };

        let mail = match std::env::var("SMTP_HOST") {
            Ok(host) if !host.trim().is_empty() => Some(MailConfig {
                host,
                port: std::env::var("SMTP_PORT")
                    .ok()
                    .and_then(|v| v.parse::<u16>().ok())
                    .unwrap_or(587),
                username: std::env::var("SMTP_USERNAME").ok(),
                password: std::env::var("SMTP_PASSWORD").ok(),
                starttls: std::env::var("SMTP_STARTTLS")
                    .map(|v| v != "false" && v != "0")
                    .unwrap_or(true),
                from: std::env::var("MAIL_FROM").unwrap_or_else(|_| "no-reply@localhost".into()),
            }),
            _ => None,
        };

        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("APP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8080),
            database_url,
            links,
            mail,
            pepper: std::env::var("PASSWORD_PEPPER").ok().filter(|p| !p.is_empty()),
            min_password_length: std::env::var("MIN_PASSWORD_LENGTH")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(8),
        })
    }
}
