//! Parser d'enveloppes SOAP

use super::{SoapBody, SoapEnvelope, SoapHeader};
use crate::SOAP_ENV_NAMESPACE;
use crate::error::{Result, SoapError};
use std::io::BufReader;
use xmltree::Element;

/// Parse une enveloppe SOAP complète
pub fn parse_soap_envelope(xml: &[u8]) -> Result<SoapEnvelope> {
    let reader = BufReader::new(xml);
    let root = Element::parse(reader)?;

    if root.name != "Envelope" || root.namespace.as_deref() != Some(SOAP_ENV_NAMESPACE) {
        return Err(SoapError::MissingEnvelope);
    }

    let header = root
        .get_child(("Header", SOAP_ENV_NAMESPACE))
        .map(|e| SoapHeader { content: e.clone() });

    let body_elem = root
        .get_child(("Body", SOAP_ENV_NAMESPACE))
        .ok_or(SoapError::MissingBody)?;

    let body = SoapBody {
        content: body_elem.clone(),
    };

    Ok(SoapEnvelope { header, body })
}

/// Parse a standalone XML document (result documents, report definitions).
pub fn parse_xml(xml: &[u8]) -> Result<Element> {
    Ok(Element::parse(BufReader::new(xml))?)
}
