use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Unknown email template: {0}")]
    UnknownTemplate(String),

    #[error("Template render error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("SMTP error: {0}")]
    Smtp(#[from] mail_send::Error),
}

pub type EmailResult<T> = std::result::Result<T, EmailError>;
