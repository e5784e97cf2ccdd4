//! Request documents of the JasperServer repository service.
//!
//! Every operation (`list`, `get`, `runReport`, ...) takes a small XML
//! document as its single string argument:
//!
//! ```text
//! <request operationName="runReport">
//!   <argument name="RUN_OUTPUT_FORMAT">PDF</argument>
//!   <resourceDescriptor name="" wsType="reportUnit" uriString="/reports/AllAccounts">
//!     <label>null</label>
//!     <parameter name="Country">France</parameter>
//!     <parameter name="City" isListItem="true">Lyon</parameter>
//!   </resourceDescriptor>
//! </request>
//! ```

use crate::error::Result;
use indexmap::IndexMap;
use xmltree::{Element, XMLNode};

pub const DEFAULT_OPERATION: &str = "list";
pub const DEFAULT_WS_TYPE: &str = "folder";

/// Value of a report parameter.
///
/// A list value is sent as one `<parameter isListItem="true">` per item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    Single(String),
    List(Vec<String>),
}

impl ParameterValue {
    pub fn is_list(&self) -> bool {
        matches!(self, ParameterValue::List(_))
    }

    /// Appends a value, turning a single value into a list.
    pub fn push(&mut self, value: impl Into<String>) {
        match self {
            ParameterValue::List(items) => items.push(value.into()),
            ParameterValue::Single(first) => {
                let first = std::mem::take(first);
                *self = ParameterValue::List(vec![first, value.into()]);
            }
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Single(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Single(value)
    }
}

impl From<Vec<String>> for ParameterValue {
    fn from(values: Vec<String>) -> Self {
        ParameterValue::List(values)
    }
}

impl From<Vec<&str>> for ParameterValue {
    fn from(values: Vec<&str>) -> Self {
        ParameterValue::List(values.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for ParameterValue {
    fn from(values: &[&str]) -> Self {
        ParameterValue::List(values.iter().map(|v| v.to_string()).collect())
    }
}

/// Builder for a repository service request document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    operation: String,
    ws_type: String,
    uri: String,
    arguments: IndexMap<String, String>,
    parameters: IndexMap<String, ParameterValue>,
}

impl Default for ReportRequest {
    fn default() -> Self {
        Self {
            operation: DEFAULT_OPERATION.to_string(),
            ws_type: DEFAULT_WS_TYPE.to_string(),
            uri: String::new(),
            arguments: IndexMap::new(),
            parameters: IndexMap::new(),
        }
    }
}

impl ReportRequest {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Self::default()
        }
    }

    pub fn ws_type(mut self, ws_type: impl Into<String>) -> Self {
        self.ws_type = ws_type.into();
        self
    }

    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    pub fn argument(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    pub fn arguments<I, K, V>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in arguments {
            self.arguments.insert(name.into(), value.into());
        }
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn parameters<I, K, V>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParameterValue>,
    {
        for (name, value) in parameters {
            self.parameters.insert(name.into(), value.into());
        }
        self
    }

    pub fn operation_name(&self) -> &str {
        &self.operation
    }

    pub fn resource_type(&self) -> &str {
        &self.ws_type
    }

    pub fn resource_uri(&self) -> &str {
        &self.uri
    }

    pub fn argument_value(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).map(String::as_str)
    }

    pub fn to_element(&self) -> Element {
        let mut request = Element::new("request");
        request
            .attributes
            .insert("operationName".to_string(), self.operation.clone());

        for (name, value) in &self.arguments {
            let mut argument = text_element("argument", value);
            argument.attributes.insert("name".to_string(), name.clone());
            request.children.push(XMLNode::Element(argument));
        }

        let mut descriptor = Element::new("resourceDescriptor");
        descriptor
            .attributes
            .insert("name".to_string(), String::new());
        descriptor
            .attributes
            .insert("wsType".to_string(), self.ws_type.clone());
        descriptor
            .attributes
            .insert("uriString".to_string(), self.uri.clone());
        descriptor
            .children
            .push(XMLNode::Element(text_element("label", "null")));

        for (name, value) in &self.parameters {
            match value {
                ParameterValue::Single(v) => {
                    descriptor
                        .children
                        .push(XMLNode::Element(parameter_element(name, v, false)));
                }
                ParameterValue::List(items) => {
                    for item in items {
                        descriptor
                            .children
                            .push(XMLNode::Element(parameter_element(name, item, true)));
                    }
                }
            }
        }

        request.children.push(XMLNode::Element(descriptor));
        request
    }

    /// Serialises the request without XML declaration.
    pub fn to_xml(&self) -> Result<String> {
        let mut buf = Vec::new();
        let config = xmltree::EmitterConfig::new()
            .write_document_declaration(false)
            .perform_indent(false);
        self.to_element().write_with_config(&mut buf, config)?;
        Ok(String::from_utf8(buf)?)
    }
}

fn text_element(name: &str, text: &str) -> Element {
    let mut elem = Element::new(name);
    if !text.is_empty() {
        elem.children.push(XMLNode::Text(text.to_string()));
    }
    elem
}

fn parameter_element(name: &str, value: &str, list_item: bool) -> Element {
    let mut param = text_element("parameter", value);
    param.attributes.insert("name".to_string(), name.to_string());
    if list_item {
        param
            .attributes
            .insert("isListItem".to_string(), "true".to_string());
    }
    param
}
