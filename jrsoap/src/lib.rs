//! # jrsoap - SOAP plumbing for the JasperServer repository service
//!
//! The repository web service is an old Axis RPC/encoded endpoint: every
//! operation takes one string argument holding a small XML request document,
//! and answers either with a plain SOAP envelope whose `<opReturn>` element
//! carries an escaped result document, or with a multipart MIME body when
//! files (rendered reports, report definitions) are attached.
//!
//! ## Fonctionnalités
//!
//! - Construction des documents de requête ([`ReportRequest`])
//! - Construction d'enveloppes SOAP RPC ([`build_rpc_request`])
//! - Parsing d'enveloppes SOAP et des SOAP Faults
//! - Découpage des réponses multipart ([`Multipart`])
//!
//! ## Example
//!
//! ```
//! use jrsoap::{Multipart, ReportRequest, build_rpc_request, REPOSITORY_NAMESPACE};
//!
//! let request = ReportRequest::new("runReport")
//!     .ws_type("reportUnit")
//!     .uri("/reports/AllAccounts")
//!     .argument("RUN_OUTPUT_FORMAT", "PDF")
//!     .to_xml()
//!     .unwrap();
//! let envelope =
//!     build_rpc_request(REPOSITORY_NAMESPACE, "runReport", &[("requestXmlString", request.as_str())]).unwrap();
//! assert!(envelope.contains("runReport"));
//!
//! let outcome = Multipart::parse(b"<not-multipart/>").unwrap();
//! assert!(!outcome.is_multipart());
//! ```

mod builder;
mod envelope;
mod error;
mod fault;
mod parser;

pub mod multipart;
pub mod request;

pub use builder::{build_rpc_request, build_rpc_response};
pub use envelope::{SoapBody, SoapEnvelope, SoapHeader};
pub use error::{Result, SoapError};
pub use fault::{SoapFault, build_soap_fault};
pub use multipart::{ATTACHMENT_CONTENT_ID, Multipart, MultipartPart, find_by_content_id};
pub use parser::{parse_soap_envelope, parse_xml};
pub use request::{ParameterValue, ReportRequest};

/// SOAP 1.1 envelope namespace
pub const SOAP_ENV_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Namespace of the repository service operations
pub const REPOSITORY_NAMESPACE: &str = "http://axis2.ws.jasperserver.jaspersoft.com";

/// Name of the single RPC argument of every repository operation
pub const REQUEST_ARGUMENT: &str = "requestXmlString";
