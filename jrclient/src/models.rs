//! Structures de données du dépôt JasperServer

use jrsoap::MultipartPart;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Kind of a repository resource (`wsType` attribute).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum ResourceType {
    Folder,
    ReportUnit,
    InputControl,
    Jrxml,
    Image,
    DataType,
    ListOfValues,
    Query,
    Datasource,
    JdbcDatasource,
    JndiDatasource,
    BeanDatasource,
    Reference,
    ResourceBundle,
    OlapConnection,
    ContentResource,
    Other(String),
}

impl ResourceType {
    pub fn from_ws_type(ws_type: &str) -> Self {
        match ws_type {
            "folder" => ResourceType::Folder,
            "reportUnit" => ResourceType::ReportUnit,
            "inputControl" => ResourceType::InputControl,
            "jrxml" => ResourceType::Jrxml,
            "img" => ResourceType::Image,
            "dataType" => ResourceType::DataType,
            "lov" => ResourceType::ListOfValues,
            "query" => ResourceType::Query,
            "datasource" => ResourceType::Datasource,
            "jdbc" => ResourceType::JdbcDatasource,
            "jndi" => ResourceType::JndiDatasource,
            "bean" => ResourceType::BeanDatasource,
            "reference" => ResourceType::Reference,
            "prop" => ResourceType::ResourceBundle,
            "olapMondrianCon" => ResourceType::OlapConnection,
            "contentResource" => ResourceType::ContentResource,
            other => ResourceType::Other(other.to_string()),
        }
    }

    /// Wire tag of the type.
    pub fn as_ws_type(&self) -> &str {
        match self {
            ResourceType::Folder => "folder",
            ResourceType::ReportUnit => "reportUnit",
            ResourceType::InputControl => "inputControl",
            ResourceType::Jrxml => "jrxml",
            ResourceType::Image => "img",
            ResourceType::DataType => "dataType",
            ResourceType::ListOfValues => "lov",
            ResourceType::Query => "query",
            ResourceType::Datasource => "datasource",
            ResourceType::JdbcDatasource => "jdbc",
            ResourceType::JndiDatasource => "jndi",
            ResourceType::BeanDatasource => "bean",
            ResourceType::Reference => "reference",
            ResourceType::ResourceBundle => "prop",
            ResourceType::OlapConnection => "olapMondrianCon",
            ResourceType::ContentResource => "contentResource",
            ResourceType::Other(tag) => tag,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ws_type())
    }
}

impl From<ResourceType> for String {
    fn from(value: ResourceType) -> Self {
        value.as_ws_type().to_string()
    }
}

/// Widget kind of an input control, from the `PROP_INPUTCONTROL_TYPE` code.
///
/// | code            | control                                  | kind          |
/// |-----------------|------------------------------------------|---------------|
/// | 1               | boolean                                  | `Boolean`     |
/// | 2               | single value                             | `SingleValue` |
/// | 3, 8            | single-select list of values (radio)     | `SingleValue` |
/// | 4, 9            | single-select query (radio)              | `SingleValue` |
/// | 6, 10           | multi-select list of values (check box)  | `MultiValue`  |
/// | 7, 11           | multi-select query (check box)           | `MultiValue`  |
/// | anything else   |                                          | `Unknown`     |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ControlType {
    Boolean,
    SingleValue,
    MultiValue,
    Unknown,
}

impl ControlType {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => ControlType::Boolean,
            2 | 3 | 4 | 8 | 9 => ControlType::SingleValue,
            6 | 7 | 10 | 11 => ControlType::MultiValue,
            _ => ControlType::Unknown,
        }
    }

    /// Maps the textual property value; non-numeric values are `Unknown`.
    pub fn from_property(value: &str) -> Self {
        value
            .trim()
            .parse::<i64>()
            .map(Self::from_code)
            .unwrap_or(ControlType::Unknown)
    }
}

/// Value type of a report parameter, from its Java `class` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParameterType {
    Integer,
    String,
    Unknown,
}

impl ParameterType {
    pub fn from_java_class(class: &str) -> Self {
        match class {
            "java.lang.Integer" => ParameterType::Integer,
            "java.lang.String" => ParameterType::String,
            _ => ParameterType::Unknown,
        }
    }
}

/// Output formats accepted by `runReport`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OutputFormat {
    Pdf,
    /// Serialized JasperPrint object, only useful to Java clients
    Jrprint,
    Html,
    Xls,
    Xml,
    Csv,
    Rtf,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 7] = [
        OutputFormat::Pdf,
        OutputFormat::Jrprint,
        OutputFormat::Html,
        OutputFormat::Xls,
        OutputFormat::Xml,
        OutputFormat::Csv,
        OutputFormat::Rtf,
    ];

    /// Value of the `RUN_OUTPUT_FORMAT` argument.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "PDF",
            OutputFormat::Jrprint => "JRPRINT",
            OutputFormat::Html => "HTML",
            OutputFormat::Xls => "XLS",
            OutputFormat::Xml => "XML",
            OutputFormat::Csv => "CSV",
            OutputFormat::Rtf => "RTF",
        }
    }

    /// Content type of the rendered attachment.
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "application/pdf",
            OutputFormat::Jrprint => "application/octet-stream",
            OutputFormat::Html => "text/html",
            OutputFormat::Xls => "application/xls",
            OutputFormat::Xml => "text/xml",
            OutputFormat::Csv => "text/csv",
            OutputFormat::Rtf => "application/rtf",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Jrprint => "jrprint",
            OutputFormat::Html => "html",
            OutputFormat::Xls => "xls",
            OutputFormat::Xml => "xml",
            OutputFormat::Csv => "csv",
            OutputFormat::Rtf => "rtf",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        OutputFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == upper)
            .ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry of a folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportDescriptor {
    /// Repository path (`uriString`)
    pub id: String,
    pub label: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
}

impl ReportDescriptor {
    pub fn is_report(&self) -> bool {
        self.resource_type == ResourceType::ReportUnit
    }
}

/// Input control attached to a report unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputControl {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub control_type: ControlType,
    pub label: Option<String>,
    pub description: Option<String>,
}

/// Parameter declared by the report definition (jrxml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportParameter {
    pub name: String,
    pub value_type: ParameterType,
    pub default_value_expression: Option<String>,
}

/// Full description of a report unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportDetail {
    #[serde(flatten)]
    pub descriptor: ReportDescriptor,
    pub name: String,
    pub jrxml_path: Option<String>,
    pub controls: Vec<InputControl>,
    pub parameters: Vec<ReportParameter>,
}

/// Parts returned by `runReport`, in response order.
///
/// Part 0 is normally the SOAP envelope, the rendered report follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutput {
    format: OutputFormat,
    parts: Vec<MultipartPart>,
}

impl ReportOutput {
    pub fn new(format: OutputFormat, parts: Vec<MultipartPart>) -> Self {
        Self { format, parts }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn parts(&self) -> &[MultipartPart] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<MultipartPart> {
        self.parts
    }

    pub fn envelope(&self) -> Option<&MultipartPart> {
        self.parts.first()
    }

    pub fn attachment(&self, content_id: &str) -> Option<&MultipartPart> {
        jrsoap::find_by_content_id(&self.parts, content_id)
    }

    /// The rendered report: first part after the envelope whose content
    /// type matches the requested format, else the first part after the
    /// envelope.
    pub fn report_part(&self) -> Option<&MultipartPart> {
        let mime = self.format.mime_type();
        // l'enveloppe est aussi du text/xml
        self.parts
            .iter()
            .skip(1)
            .find(|p| p.content_type == mime)
            .or_else(|| self.parts.get(1))
    }
}
