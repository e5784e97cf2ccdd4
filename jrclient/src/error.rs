//! Gestion des erreurs pour le client JasperServer

use jrsoap::SoapError;
use thiserror::Error;

/// Type Result personnalisé pour jrclient
pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Error, Debug)]
pub enum ReportError {
    /// La réponse ne contient pas de frontière MIME
    #[error("Response is not a multipart message")]
    NotMultipart,

    /// Format de sortie non supporté par runReport
    #[error("Unsupported output format {0:?} (expected PDF, JRPRINT, HTML, XLS, XML, CSV or RTF)")]
    WrongOutputFormat(String),

    /// Ni multipart, ni résultat d'opération reconnaissable
    #[error("Unknown response from server: {0}")]
    UnknownResponse(String),

    /// Le serveur a renvoyé un résultat d'erreur
    #[error("Server error: {0}")]
    ServerError(String),

    #[error("SOAP fault {code}: {message}")]
    SoapFault { code: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),

    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("SOAP error: {0}")]
    Soap(SoapError),

    #[error("Invalid endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("No <attachment> part in the response for {0}")]
    MissingAttachment(String),

    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

impl From<SoapError> for ReportError {
    fn from(err: SoapError) -> Self {
        match err {
            SoapError::NotMultipart => ReportError::NotMultipart,
            other => ReportError::Soap(other),
        }
    }
}

impl ReportError {
    pub fn invalid_endpoint(url: &str, reason: impl Into<String>) -> Self {
        ReportError::InvalidEndpoint {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}
