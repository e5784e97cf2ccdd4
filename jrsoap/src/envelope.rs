//! Structures de l'enveloppe SOAP

use crate::error::{Result, SoapError};
use crate::fault::SoapFault;
use xmltree::{Element, XMLNode};

/// Enveloppe SOAP complète
#[derive(Debug, Clone)]
pub struct SoapEnvelope {
    /// En-tête SOAP optionnel
    pub header: Option<SoapHeader>,

    /// Corps SOAP contenant la réponse RPC ou un Fault
    pub body: SoapBody,
}

/// En-tête SOAP
#[derive(Debug, Clone)]
pub struct SoapHeader {
    /// Contenu XML brut de l'en-tête
    pub content: Element,
}

/// Corps SOAP
#[derive(Debug, Clone)]
pub struct SoapBody {
    /// Contenu XML brut du corps
    pub content: Element,
}

impl SoapEnvelope {
    /// Returns the SOAP Fault carried by the body, if any.
    pub fn fault(&self) -> Option<SoapFault> {
        SoapFault::from_body(&self.body)
    }

    /// Finds the `<{operation}Return>` element of an RPC-style response.
    ///
    /// When `namespace` is given, the `<{operation}Response>` wrapper must be
    /// qualified with it; otherwise any prefix is accepted.
    pub fn rpc_return(&self, namespace: Option<&str>, operation: &str) -> Option<&Element> {
        let response_name = format!("{operation}Response");
        let return_name = format!("{operation}Return");

        let response = self.body.content.children.iter().find_map(|node| match node {
            XMLNode::Element(elem) if elem.name == response_name => match namespace {
                Some(ns) if elem.namespace.as_deref() != Some(ns) => None,
                _ => Some(elem),
            },
            _ => None,
        })?;

        response.children.iter().find_map(|node| match node {
            XMLNode::Element(elem) if elem.name == return_name => Some(elem),
            _ => None,
        })
    }

    /// Text of the `<{operation}Return>` element (the escaped result document).
    pub fn rpc_return_text(&self, namespace: Option<&str>, operation: &str) -> Result<String> {
        self.rpc_return(namespace, operation)
            .map(|elem| elem.get_text().map(|t| t.into_owned()).unwrap_or_default())
            .ok_or_else(|| SoapError::missing_return(&format!("{operation}Return")))
    }
}
