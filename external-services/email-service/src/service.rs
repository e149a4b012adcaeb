use crate::error::{EmailError, EmailResult};
use async_trait::async_trait;
use handlebars::Handlebars;
use mail_builder::MessageBuilder;
use mail_send::SmtpClientBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// One named message template: handlebars sources for subject and body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub subject: String,
    pub body: String,
}

/// The declared template set, keyed by template name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailTemplates {
    #[serde(default)]
    pub templates: HashMap<String, EmailTemplate>,
}

impl EmailTemplates {
    pub fn get(&self, name: &str) -> EmailResult<&EmailTemplate> {
        self.templates
            .get(name)
            .ok_or_else(|| EmailError::UnknownTemplate(name.to_string()))
    }
}

/// SMTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub from_email: String,
    #[serde(default)]
    pub from_name: String,
    #[serde(default)]
    pub implicit_tls: bool,
}

/// Sends a rendered template to one recipient.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_template(
        &self,
        to: &str,
        template: &str,
        context: &serde_json::Value,
    ) -> EmailResult<()>;
}

/// Production mailer: renders the named template and ships it over SMTP.
pub struct SmtpMailer {
    config: SmtpConfig,
    templates: EmailTemplates,
    registry: Handlebars<'static>,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig, templates: EmailTemplates) -> Self {
        Self {
            config,
            templates,
            registry: Handlebars::new(),
        }
    }

    fn render(&self, template: &str, context: &serde_json::Value) -> EmailResult<(String, String)> {
        let template = self.templates.get(template)?;
        let subject = self.registry.render_template(&template.subject, context)?;
        let body = self.registry.render_template(&template.body, context)?;
        Ok((subject, body))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_template(
        &self,
        to: &str,
        template: &str,
        context: &serde_json::Value,
    ) -> EmailResult<()> {
        let (subject, body) = self.render(template, context)?;

        let message = MessageBuilder::new()
            .from((self.config.from_name.as_str(), self.config.from_email.as_str()))
            .to(to)
            .subject(subject.as_str())
            .html_body(body.as_str());

        let mut builder = SmtpClientBuilder::new(self.config.host.as_str(), self.config.port)
            .implicit_tls(self.config.implicit_tls);
        if !self.config.username.is_empty() {
            builder = builder.credentials((
                self.config.username.as_str(),
                self.config.password.as_str(),
            ));
        }

        builder.connect().await?.send(message).await?;
        info!(to = %to, template = %template, "sent email");
        Ok(())
    }
}

/// A sent message captured by [`MemoryMailer`].
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub template: String,
    pub context: serde_json::Value,
}

/// Capturing mailer for tests and offline development: nothing leaves the
/// process, sends are recorded in order.
#[derive(Default)]
pub struct MemoryMailer {
    sent: parking_lot::Mutex<Vec<SentEmail>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().clone()
    }

    pub fn last(&self) -> Option<SentEmail> {
        self.sent.lock().last().cloned()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send_template(
        &self,
        to: &str,
        template: &str,
        context: &serde_json::Value,
    ) -> EmailResult<()> {
        self.sent.lock().push(SentEmail {
            to: to.to_string(),
            template: template.to_string(),
            context: context.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn templates_render_with_context() {
        let mut templates = EmailTemplates::default();
        templates.templates.insert(
            "register_code".to_string(),
            EmailTemplate {
                subject: "Your registration code".to_string(),
                body: "<p>Code: {{code}}</p>".to_string(),
            },
        );
        let mailer = SmtpMailer::new(
            SmtpConfig {
                host: "localhost".to_string(),
                port: 587,
                username: String::new(),
                password: String::new(),
                from_email: "noreply@gatehouse.dev".to_string(),
                from_name: "Gatehouse".to_string(),
                implicit_tls: false,
            },
            templates,
        );

        let (subject, body) = mailer
            .render("register_code", &json!({"code": "123456"}))
            .unwrap();
        assert_eq!(subject, "Your registration code");
        assert_eq!(body, "<p>Code: 123456</p>");

        assert!(matches!(
            mailer.render("ghost", &json!({})),
            Err(EmailError::UnknownTemplate(_))
        ));
    }

    #[tokio::test]
    async fn memory_mailer_captures_sends() {
        let mailer = MemoryMailer::new();
        mailer
            .send_template("a@example.com", "register_code", &json!({"code": "1"}))
            .await
            .unwrap();
        let last = mailer.last().unwrap();
        assert_eq!(last.to, "a@example.com");
        assert_eq!(last.context["code"], "1");
    }
}
