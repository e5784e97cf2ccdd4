//! Construction d'enveloppes SOAP RPC

use crate::error::Result;
use crate::SOAP_ENV_NAMESPACE;
use xmltree::{Element, XMLNode};

pub(crate) fn build_soap_envelope_with_body(body_child: Element) -> Result<String> {
    // Body
    let mut body = Element::new("soapenv:Body");
    body.children.push(XMLNode::Element(body_child));

    // Envelope
    let mut envelope = Element::new("soapenv:Envelope");
    envelope.attributes.insert(
        "xmlns:soapenv".to_string(),
        SOAP_ENV_NAMESPACE.to_string(),
    );
    envelope.children.push(XMLNode::Element(body));

    let mut buf = Vec::new();
    let config = xmltree::EmitterConfig::new()
        .write_document_declaration(true)
        .perform_indent(true)
        .indent_string("  ");
    envelope.write_with_config(&mut buf, config)?;

    Ok(String::from_utf8(buf)?)
}

fn rpc_element(name: &str, namespace: &str, children: Vec<(String, String)>) -> Element {
    let mut elem = Element::new(&format!("ns:{}", name));
    elem.attributes
        .insert("xmlns:ns".to_string(), namespace.to_string());

    for (key, value) in children {
        let mut child = Element::new(&key);
        child.children.push(XMLNode::Text(value));
        elem.children.push(XMLNode::Element(child));
    }
    elem
}

/// Builds an RPC-style SOAP request.
///
/// * `namespace` - namespace of the operation element
/// * `operation` - operation name, e.g. "runReport"
/// * `args` - (name, value) pairs; values are escaped as text
pub fn build_rpc_request(namespace: &str, operation: &str, args: &[(&str, &str)]) -> Result<String> {
    let children = args
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    build_soap_envelope_with_body(rpc_element(operation, namespace, children))
}

/// Builds the matching RPC response: `<ns:{operation}Response>` wrapping a
/// single `<{operation}Return>` text element.
pub fn build_rpc_response(namespace: &str, operation: &str, return_value: &str) -> Result<String> {
    let children = vec![(format!("{operation}Return"), return_value.to_string())];
    build_soap_envelope_with_body(rpc_element(
        &format!("{operation}Response"),
        namespace,
        children,
    ))
}
