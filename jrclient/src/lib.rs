//! # jrclient - Client du dépôt JasperServer
//!
//! Blocking client for the SOAP `repository` service of JasperServer: browse
//! folders, describe report units and run reports.
//!
//! ## Vue d'ensemble
//!
//! - `ReportClient` : client principal (`list`, `list_reports`, `get`,
//!   `parameters`, `run`)
//! - `transport` : envoi des enveloppes SOAP (HTTP basic auth, `ureq`)
//! - `models` : structures de données (descripteurs, contrôles, paramètres)
//! - `config_ext` : intégration avec `jrconfig`
//! - `error` : gestion des erreurs
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use jrclient::{ParameterValue, ReportArgs, ReportClient, ReportParams};
//!
//! let client = ReportClient::from_config()?;
//!
//! let detail = client.get("/reports/samples/Freight")?;
//! for control in &detail.controls {
//!     println!("{}: {:?}", control.name, control.control_type);
//! }
//!
//! let mut params = ReportParams::new();
//! params.insert("ShipCountry".to_string(), ParameterValue::from("France"));
//! let output = client.run("/reports/samples/Freight", "HTML", &params, &ReportArgs::new())?;
//! println!("{} parts", output.parts().len());
//! # Ok::<(), jrclient::ReportError>(())
//! ```

pub mod client;
pub mod config_ext;
pub mod error;
pub mod models;
pub mod transport;

use indexmap::IndexMap;
use std::time::Duration;

pub use client::{ReportClient, ReportClientBuilder};
pub use config_ext::JasperConfigExt;
pub use error::{ReportError, Result};
pub use jrsoap::{Multipart, MultipartPart, ParameterValue};
pub use models::{
    ControlType, InputControl, OutputFormat, ParameterType, ReportDescriptor, ReportDetail,
    ReportOutput, ReportParameter, ResourceType,
};
pub use transport::{
    HttpTransport, PassthroughGuard, RawResponse, ResponseMode, SoapTransport, endpoint_from_url,
};

/// Report parameters, in insertion order.
pub type ReportParams = IndexMap<String, ParameterValue>;

/// Extra `runReport` arguments (`RUN_OUTPUT_FORMAT` is always set by the client).
pub type ReportArgs = IndexMap<String, String>;

/// Namespace of report definitions
pub const JRXML_NAMESPACE: &str = "http://jasperreports.sourceforge.net/jasperreports";

/// Argument selecting the output format of `runReport`
pub const RUN_OUTPUT_FORMAT: &str = "RUN_OUTPUT_FORMAT";

/// Resource property holding the control type code of an input control
pub const PROP_INPUTCONTROL_TYPE: &str = "PROP_INPUTCONTROL_TYPE";

/// Resource property flagging the main jrxml of a report unit
pub const PROP_RU_IS_MAIN_REPORT: &str = "PROP_RU_IS_MAIN_REPORT";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
