//! Erreurs de la couche SOAP

use thiserror::Error;

/// Result type for the SOAP layer
pub type Result<T> = std::result::Result<T, SoapError>;

#[derive(Error, Debug)]
pub enum SoapError {
    #[error("XML parse error: {0}")]
    XmlParse(#[from] xmltree::ParseError),

    #[error("XML write error: {0}")]
    XmlWrite(#[from] xmltree::Error),

    #[error("Serialized XML is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Missing SOAP Envelope")]
    MissingEnvelope,

    #[error("Missing SOAP Body")]
    MissingBody,

    #[error("Missing {0} element in SOAP body")]
    MissingReturn(String),

    #[error("Response is not a multipart message")]
    NotMultipart,

    #[error("Malformed multipart message: {0}")]
    MalformedMultipart(String),
}

impl SoapError {
    pub fn missing_return(element: &str) -> Self {
        SoapError::MissingReturn(element.to_string())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        SoapError::MalformedMultipart(message.into())
    }
}
