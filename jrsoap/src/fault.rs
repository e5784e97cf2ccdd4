//! SOAP Faults

use crate::SOAP_ENV_NAMESPACE;
use crate::envelope::SoapBody;
use crate::error::Result;
use xmltree::{Element, XMLNode};

/// Erreur SOAP (Fault)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapFault {
    /// Code d'erreur (ex: "soapenv:Server.userException")
    pub fault_code: String,

    /// Description de l'erreur
    pub fault_string: String,

    /// Texte brut de l'élément `detail`, s'il existe
    pub detail: Option<String>,
}

impl SoapFault {
    /// Extracts a `Fault` element from a SOAP body.
    ///
    /// `faultcode`, `faultstring` and `detail` are unqualified in SOAP 1.1;
    /// missing children become empty strings.
    pub fn from_body(body: &SoapBody) -> Option<Self> {
        let fault = body.content.get_child(("Fault", SOAP_ENV_NAMESPACE))?;

        let child_text = |name: &str| {
            fault
                .get_child(name)
                .and_then(|e| e.get_text())
                .map(|t| t.trim().to_string())
        };

        Some(Self {
            fault_code: child_text("faultcode").unwrap_or_default(),
            fault_string: child_text("faultstring").unwrap_or_default(),
            detail: child_text("detail").filter(|d| !d.is_empty()),
        })
    }
}

/// Construit un SOAP Fault XML
pub fn build_soap_fault(fault_code: &str, fault_string: &str) -> Result<String> {
    let mut fault = Element::new("soapenv:Fault");

    let mut faultcode_elem = Element::new("faultcode");
    faultcode_elem
        .children
        .push(XMLNode::Text(fault_code.to_string()));
    fault.children.push(XMLNode::Element(faultcode_elem));

    let mut faultstring_elem = Element::new("faultstring");
    faultstring_elem
        .children
        .push(XMLNode::Text(fault_string.to_string()));
    fault.children.push(XMLNode::Element(faultstring_elem));

    crate::builder::build_soap_envelope_with_body(fault)
}
