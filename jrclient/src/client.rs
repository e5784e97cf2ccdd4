//! Client du service `repository` de JasperServer
//!
//! Wraps the three repository operations the client needs (`list`, `get`,
//! `runReport`) on top of a [`SoapTransport`].

use crate::config_ext::JasperConfigExt;
use crate::error::{ReportError, Result};
use crate::models::{
    ControlType, InputControl, OutputFormat, ParameterType, ReportDescriptor, ReportDetail,
    ReportOutput, ReportParameter, ResourceType,
};
use crate::transport::{HttpTransport, PassthroughGuard, RawResponse, ResponseMode, SoapTransport};
use crate::{
    DEFAULT_TIMEOUT, JRXML_NAMESPACE, PROP_INPUTCONTROL_TYPE, PROP_RU_IS_MAIN_REPORT,
    RUN_OUTPUT_FORMAT, ReportArgs, ReportParams,
};
use jrconfig::Config;
use jrsoap::{
    ATTACHMENT_CONTENT_ID, Multipart, REPOSITORY_NAMESPACE, REQUEST_ARGUMENT,
    ReportRequest, SoapError, build_rpc_request, find_by_content_id, parse_soap_envelope, parse_xml,
};
use std::cell::Cell;
use std::time::Duration;
use tracing::{debug, info, warn};
use xmltree::{Element, XMLNode};

/// Client for the JasperServer repository web service.
///
/// The client is authenticated from construction on: credentials live in the
/// transport and are sent with every call. It is not `Sync`; use one client
/// per thread.
///
/// # Example
///
/// ```no_run
/// use jrclient::{ReportArgs, ReportClient, ReportParams};
///
/// let client = ReportClient::new(
///     "http://localhost:8080/jasperserver/services/repository?wsdl",
///     "jasperadmin",
///     "jasperadmin",
/// )?;
///
/// for report in client.list_reports("/reports")? {
///     println!("{} ({:?})", report.id, report.label);
/// }
///
/// let output = client.run("/reports/AllAccounts", "PDF", &ReportParams::new(), &ReportArgs::new())?;
/// if let Some(pdf) = output.report_part() {
///     std::fs::write("AllAccounts.pdf", &pdf.data)?;
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ReportClient<T: SoapTransport = HttpTransport> {
    transport: T,
    mode: Cell<ResponseMode>,
}

/// Builder for an HTTP [`ReportClient`].
#[derive(Debug, Clone)]
pub struct ReportClientBuilder {
    url: String,
    username: String,
    password: String,
    timeout: Duration,
}

impl ReportClientBuilder {
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<ReportClient> {
        let transport =
            HttpTransport::new(&self.url, &self.username, &self.password, self.timeout)?;
        info!(endpoint = %transport.endpoint(), user = %self.username, "JasperServer client ready");
        Ok(ReportClient::with_transport(transport))
    }
}

impl ReportClient<HttpTransport> {
    /// Creates a client with the default timeout (300 s).
    pub fn new(url: &str, username: &str, password: &str) -> Result<Self> {
        Self::builder(url).credentials(username, password).build()
    }

    pub fn builder(url: impl Into<String>) -> ReportClientBuilder {
        ReportClientBuilder {
            url: url.into(),
            username: String::new(),
            password: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Creates a client from the global configuration.
    pub fn from_config() -> Result<Self> {
        let config = jrconfig::get_config();
        Self::from_config_obj(&config)
    }

    /// Creates a client from a specific configuration.
    pub fn from_config_obj(config: &Config) -> Result<Self> {
        let endpoint = config.get_jasper_endpoint()?;
        let (username, password) = config.get_jasper_credentials()?;
        let timeout = config.get_jasper_timeout()?;

        Self::builder(endpoint)
            .credentials(username, password)
            .timeout(timeout)
            .build()
    }
}

impl<T: SoapTransport> ReportClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            mode: Cell::new(ResponseMode::Envelope),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn response_mode(&self) -> ResponseMode {
        self.mode.get()
    }

    /// Lists the resources of a repository folder (`""` is the root).
    pub fn list(&self, path: &str) -> Result<Vec<ReportDescriptor>> {
        let request = ReportRequest::new("list").ws_type("folder").uri(path);
        let result = self.call(&request)?;

        let descriptors: Vec<ReportDescriptor> = child_elements(&result, "resourceDescriptor")
            .map(parse_descriptor)
            .collect();

        info!(uri = %path, count = descriptors.len(), "Listed repository folder");
        Ok(descriptors)
    }

    /// Report units of a folder.
    pub fn list_reports(&self, path: &str) -> Result<Vec<ReportDescriptor>> {
        Ok(self
            .list(path)?
            .into_iter()
            .filter(ReportDescriptor::is_report)
            .collect())
    }

    /// Describes a report unit: input controls and report parameters.
    pub fn get(&self, report_path: &str) -> Result<ReportDetail> {
        let request = ReportRequest::new("get")
            .ws_type("reportUnit")
            .uri(report_path);
        let result = self.call(&request)?;

        let unit = result
            .get_child("resourceDescriptor")
            .ok_or_else(|| ReportError::ResourceNotFound(report_path.to_string()))?;

        let controls: Vec<InputControl> = child_elements(unit, "resourceDescriptor")
            .filter(|rd| ws_type(rd) == ResourceType::InputControl)
            .map(parse_input_control)
            .collect();

        let jrxml_path = main_jrxml(unit).and_then(|rd| attribute(rd, "uriString"));

        let parameters = match &jrxml_path {
            Some(path) => self.parameters(path)?,
            None => {
                debug!(uri = %report_path, "Report unit without jrxml resource");
                Vec::new()
            }
        };

        info!(
            uri = %report_path,
            controls = controls.len(),
            parameters = parameters.len(),
            "Fetched report unit"
        );

        Ok(ReportDetail {
            name: attribute(unit, "name").unwrap_or_default(),
            descriptor: parse_descriptor(unit),
            jrxml_path,
            controls,
            parameters,
        })
    }

    /// Parameters declared by a report definition (jrxml resource).
    ///
    /// The definition comes back as the `<attachment>` part of a multipart
    /// response.
    pub fn parameters(&self, jrxml_path: &str) -> Result<Vec<ReportParameter>> {
        let request = ReportRequest::new("get").ws_type("jrxml").uri(jrxml_path);

        let raw = {
            let _guard = PassthroughGuard::acquire(&self.mode);
            self.post(&request)?
        };

        let parts = match split_multipart(&raw)? {
            Multipart::Parts(parts) => parts,
            Multipart::NotMultipart => {
                raise_fault(&raw)?;
                return Err(ReportError::NotMultipart);
            }
        };

        let attachment = find_by_content_id(&parts, ATTACHMENT_CONTENT_ID)
            .ok_or_else(|| ReportError::MissingAttachment(jrxml_path.to_string()))?;
        let definition = parse_xml(&attachment.data)?;

        let parameters: Vec<ReportParameter> = elements(&definition)
            .filter(|e| e.name == "parameter" && in_jrxml_namespace(e))
            .map(parse_report_parameter)
            .collect();

        debug!(uri = %jrxml_path, count = parameters.len(), "Parsed report definition");
        Ok(parameters)
    }

    /// Runs a report and returns every part of the response.
    ///
    /// `output_format` is checked before anything is sent.
    pub fn run(
        &self,
        report_path: &str,
        output_format: &str,
        params: &ReportParams,
        extra_args: &ReportArgs,
    ) -> Result<ReportOutput> {
        let format: OutputFormat = output_format
            .parse()
            .map_err(ReportError::WrongOutputFormat)?;

        let mut arguments = extra_args.clone();
        arguments.insert(RUN_OUTPUT_FORMAT.to_string(), format.as_str().to_string());

        let request = ReportRequest::new("runReport")
            .ws_type("reportUnit")
            .uri(report_path)
            .arguments(arguments)
            .parameters(params.clone());

        let raw = {
            let _guard = PassthroughGuard::acquire(&self.mode);
            self.post(&request)?
        };

        match split_multipart(&raw)? {
            Multipart::Parts(parts) => {
                info!(uri = %report_path, format = %format, parts = parts.len(), "Report rendered");
                Ok(ReportOutput::new(format, parts))
            }
            Multipart::NotMultipart => Err(run_failure(&raw)),
        }
    }

    /// Sends a request and returns the raw response.
    ///
    /// Outside passthrough mode, HTTP errors and SOAP faults are raised here.
    fn post(&self, request: &ReportRequest) -> Result<RawResponse> {
        let operation = request.operation_name();
        let document = request.to_xml()?;
        let envelope = build_rpc_request(
            REPOSITORY_NAMESPACE,
            operation,
            &[(REQUEST_ARGUMENT, document.as_str())],
        )?;

        let mode = self.mode.get();
        debug!(
            operation = %operation,
            uri = %request.resource_uri(),
            ws_type = %request.resource_type(),
            mode = ?mode,
            "Calling repository service"
        );

        let raw = self.transport.call(operation, envelope)?;
        if mode == ResponseMode::Envelope && !raw.is_success() {
            raise_fault(&raw)?;
            return Err(ReportError::HttpStatus {
                status: raw.status,
                body: raw.body_text(),
            });
        }
        Ok(raw)
    }

    /// Sends a request and decodes the `operationResult` document.
    fn call(&self, request: &ReportRequest) -> Result<Element> {
        let operation = request.operation_name();
        let raw = self.post(request)?;

        let envelope = parse_soap_envelope(&raw.body)?;
        if let Some(fault) = envelope.fault() {
            return Err(fault_error(fault));
        }
        let text = envelope.rpc_return_text(None, operation)?;
        let result = parse_xml(text.as_bytes())?;

        check_return_code(&result)?;
        Ok(result)
    }
}

/// Multipart split, using the HTTP content type when it is multipart.
///
/// A boundary sniffed from the body that delimits nothing is text that
/// happens to contain `----=`, so the body is treated as a plain envelope.
fn split_multipart(raw: &RawResponse) -> Result<Multipart> {
    let multipart = match raw.content_type.as_deref() {
        Some(ct) if ct.trim_start().to_ascii_lowercase().starts_with("multipart/") => {
            Multipart::parse_with_content_type(ct, &raw.body)?
        }
        _ => match Multipart::parse(&raw.body) {
            Err(SoapError::MalformedMultipart(reason)) => {
                debug!(reason = %reason, "Boundary marker without parts, reading as envelope");
                Multipart::NotMultipart
            }
            other => other?,
        },
    };
    Ok(multipart)
}

/// Fails with the SOAP fault carried by a raw response, if any.
fn raise_fault(raw: &RawResponse) -> Result<()> {
    match parse_soap_envelope(&raw.body).ok().and_then(|env| env.fault()) {
        Some(fault) => Err(fault_error(fault)),
        None => Ok(()),
    }
}

fn fault_error(fault: jrsoap::SoapFault) -> ReportError {
    warn!(code = %fault.fault_code, message = %fault.fault_string, "SOAP fault");
    ReportError::SoapFault {
        code: fault.fault_code,
        message: fault.fault_string,
    }
}

/// Error for a `runReport` response without attachments.
fn run_failure(raw: &RawResponse) -> ReportError {
    let unknown = || ReportError::UnknownResponse(raw.body_text());

    let Ok(envelope) = parse_soap_envelope(&raw.body) else {
        return unknown();
    };
    if let Some(fault) = envelope.fault() {
        return fault_error(fault);
    }
    let Some(ret) = envelope.rpc_return(Some(REPOSITORY_NAMESPACE), "runReport") else {
        return unknown();
    };
    let text = ret.get_text().unwrap_or_default();
    match parse_xml(text.as_bytes()) {
        Ok(result) => {
            let message = flatten_result(&result);
            warn!(message = %message, "runReport failed");
            ReportError::ServerError(message)
        }
        Err(_) => unknown(),
    }
}

/// `tag: text` for every child of a result document, joined with `, `.
pub(crate) fn flatten_result(result: &Element) -> String {
    elements(result)
        .map(|e| format!("{}: {}", e.name, element_text(e).unwrap_or_default()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn check_return_code(result: &Element) -> Result<()> {
    let code = result
        .get_child("returnCode")
        .and_then(element_text)
        .unwrap_or_default();

    match code.as_str() {
        "" | "0" => Ok(()),
        _ => {
            let message = flatten_result(result);
            warn!(code = %code, message = %message, "Repository operation failed");
            Err(ReportError::ServerError(message))
        }
    }
}

fn elements(parent: &Element) -> impl Iterator<Item = &Element> {
    parent.children.iter().filter_map(|node| match node {
        XMLNode::Element(elem) => Some(elem),
        _ => None,
    })
}

fn child_elements<'a>(parent: &'a Element, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
    elements(parent).filter(move |e| e.name == name)
}

/// Trimmed text of an element; empty text is `None`.
fn element_text(elem: &Element) -> Option<String> {
    elem.get_text()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn child_text(elem: &Element, name: &str) -> Option<String> {
    elem.get_child(name).and_then(element_text)
}

fn attribute(elem: &Element, name: &str) -> Option<String> {
    elem.attributes.get(name).cloned()
}

fn ws_type(descriptor: &Element) -> ResourceType {
    ResourceType::from_ws_type(descriptor.attributes.get("wsType").map_or("", String::as_str))
}

/// `<value>` of the named `resourceProperty` of a descriptor.
fn property_value(descriptor: &Element, property: &str) -> Option<String> {
    child_elements(descriptor, "resourceProperty")
        .find(|p| p.attributes.get("name").map(String::as_str) == Some(property))
        .and_then(|p| child_text(p, "value"))
}

fn parse_descriptor(descriptor: &Element) -> ReportDescriptor {
    ReportDescriptor {
        id: attribute(descriptor, "uriString").unwrap_or_default(),
        label: child_text(descriptor, "label"),
        description: child_text(descriptor, "description"),
        resource_type: ws_type(descriptor),
    }
}

fn parse_input_control(descriptor: &Element) -> InputControl {
    let control_type = property_value(descriptor, PROP_INPUTCONTROL_TYPE)
        .map(|v| ControlType::from_property(&v))
        .unwrap_or(ControlType::Unknown);

    InputControl {
        id: attribute(descriptor, "uriString").unwrap_or_default(),
        name: attribute(descriptor, "name").unwrap_or_default(),
        control_type,
        label: child_text(descriptor, "label"),
        description: child_text(descriptor, "description"),
    }
}

/// The main jrxml of a report unit; subreport definitions are skipped when
/// the main one is flagged.
fn main_jrxml(unit: &Element) -> Option<&Element> {
    let mut jrxmls = child_elements(unit, "resourceDescriptor")
        .filter(|rd| ws_type(rd) == ResourceType::Jrxml)
        .peekable();
    let first = *jrxmls.peek()?;

    Some(
        jrxmls
            .find(|rd| property_value(rd, PROP_RU_IS_MAIN_REPORT).as_deref() == Some("true"))
            .unwrap_or(first),
    )
}

fn in_jrxml_namespace(elem: &Element) -> bool {
    elem.namespace.as_deref().is_none_or(|ns| ns == JRXML_NAMESPACE)
}

fn parse_report_parameter(parameter: &Element) -> ReportParameter {
    // JRXML : classe absente = java.lang.String
    let class = parameter
        .attributes
        .get("class")
        .map_or("java.lang.String", String::as_str);

    let default_value_expression = elements(parameter)
        .find(|e| e.name == "defaultValueExpression" && in_jrxml_namespace(e))
        .and_then(element_text);

    ReportParameter {
        name: attribute(parameter, "name").unwrap_or_default(),
        value_type: ParameterType::from_java_class(class),
        default_value_expression,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jrsoap::{build_rpc_response, build_soap_fault};
    use std::cell::RefCell;

    /// Canned responses, records every call.
    struct FakeTransport {
        responses: RefCell<Vec<Result<RawResponse>>>,
        calls: RefCell<Vec<(String, String)>>,
    }

    impl FakeTransport {
        fn new(responses: Vec<Result<RawResponse>>) -> Self {
            Self {
                responses: RefCell::new(responses),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.borrow().clone()
        }
    }

    impl SoapTransport for FakeTransport {
        fn call(&self, operation: &str, envelope: String) -> Result<RawResponse> {
            self.calls.borrow_mut().push((operation.to_string(), envelope));
            let mut responses = self.responses.borrow_mut();
            assert!(!responses.is_empty(), "unexpected call to {operation}");
            responses.remove(0)
        }
    }

    fn ok_xml(body: String) -> Result<RawResponse> {
        Ok(RawResponse {
            status: 200,
            content_type: Some("text/xml; charset=utf-8".to_string()),
            body: body.into_bytes(),
        })
    }

    fn result_envelope(operation: &str, result: &str) -> Result<RawResponse> {
        ok_xml(build_rpc_response(REPOSITORY_NAMESPACE, operation, result).unwrap())
    }

    const LIST_RESULT: &str = r#"<operationResult version="2.0.1">
  <returnCode><![CDATA[0]]></returnCode>
  <resourceDescriptor name="AllAccounts" wsType="reportUnit" uriString="/reports/AllAccounts" isNew="false">
    <label><![CDATA[All Accounts]]></label>
    <description><![CDATA[All accounts report]]></description>
  </resourceDescriptor>
  <resourceDescriptor name="samples" wsType="folder" uriString="/reports/samples" isNew="false">
    <label>Samples</label>
  </resourceDescriptor>
  <resourceDescriptor name="Freight" wsType="reportUnit" uriString="/reports/Freight" isNew="false"/>
</operationResult>"#;

    #[test]
    fn test_list_folder() {
        let transport = FakeTransport::new(vec![result_envelope("list", LIST_RESULT)]);
        let client = ReportClient::with_transport(&transport);

        let all = client.list("/reports").unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, "/reports/AllAccounts");
        assert_eq!(all[0].label.as_deref(), Some("All Accounts"));
        assert_eq!(all[0].description.as_deref(), Some("All accounts report"));
        assert_eq!(all[1].resource_type, ResourceType::Folder);
        assert_eq!(all[2].label, None);
        assert_eq!(all[2].description, None);

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "list");
        assert!(calls[0].1.contains("&lt;request"));
        assert!(calls[0].1.contains("folder"));
        assert!(calls[0].1.contains("/reports"));
    }

    #[test]
    fn test_list_reports_filters_report_units() {
        let transport = FakeTransport::new(vec![result_envelope("list", LIST_RESULT)]);
        let client = ReportClient::with_transport(&transport);

        let reports = client.list_reports("/reports").unwrap();
        let ids: Vec<&str> = reports.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["/reports/AllAccounts", "/reports/Freight"]);
    }

    #[test]
    fn test_list_server_error() {
        let result = "<operationResult><returnCode>2</returnCode><returnMessage>Resource not found</returnMessage></operationResult>";
        let transport = FakeTransport::new(vec![result_envelope("list", result)]);
        let client = ReportClient::with_transport(&transport);

        match client.list("/missing") {
            Err(ReportError::ServerError(message)) => {
                assert_eq!(message, "returnCode: 2, returnMessage: Resource not found");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_soap_fault_in_envelope_mode() {
        let fault = build_soap_fault("soapenv:Server.userException", "Access denied").unwrap();
        let transport = FakeTransport::new(vec![Ok(RawResponse {
            status: 500,
            content_type: Some("text/xml".to_string()),
            body: fault.into_bytes(),
        })]);
        let client = ReportClient::with_transport(&transport);

        match client.list("/") {
            Err(ReportError::SoapFault { code, message }) => {
                assert_eq!(code, "soapenv:Server.userException");
                assert_eq!(message, "Access denied");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_http_error_without_envelope() {
        let transport = FakeTransport::new(vec![Ok(RawResponse {
            status: 401,
            content_type: Some("text/html".to_string()),
            body: b"<html>Unauthorized</html>".to_vec(),
        })]);
        let client = ReportClient::with_transport(&transport);

        match client.list("/") {
            Err(ReportError::HttpStatus { status, body }) => {
                assert_eq!(status, 401);
                assert!(body.contains("Unauthorized"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_run_rejects_unknown_format_before_network() {
        let transport = FakeTransport::new(Vec::new());
        let client = ReportClient::with_transport(&transport);

        let err = client
            .run("/reports/AllAccounts", "DOCX", &ReportParams::new(), &ReportArgs::new())
            .unwrap_err();
        assert!(matches!(err, ReportError::WrongOutputFormat(ref f) if f == "DOCX"));
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn test_run_multipart() {
        let body = b"\r\n------=_Part_0_123\r\nContent-Type: text/xml; charset=UTF-8\r\nContent-Id: <envelope>\r\n\r\n<soapenv:Envelope/>\r\n------=_Part_0_123\r\nContent-Type: application/pdf\r\nContent-Id: <report>\r\n\r\n%PDF-1.4 data\r\n------=_Part_0_123--\r\n";
        let transport = FakeTransport::new(vec![Ok(RawResponse {
            status: 200,
            content_type: None,
            body: body.to_vec(),
        })]);
        let client = ReportClient::with_transport(&transport);

        let mut params = ReportParams::new();
        params.insert("Country".to_string(), "France".into());
        params.insert("City".to_string(), vec!["Lyon", "Paris"].into());
        let mut args = ReportArgs::new();
        args.insert("PAGE".to_string(), "1".to_string());

        let output = client.run("/reports/AllAccounts", "pdf", &params, &args).unwrap();
        assert_eq!(output.format(), OutputFormat::Pdf);
        assert_eq!(output.parts().len(), 2);
        assert_eq!(output.report_part().unwrap().data, b"%PDF-1.4 data");
        assert_eq!(client.response_mode(), ResponseMode::Envelope);

        // caller's argument map is left untouched
        assert_eq!(args.len(), 1);

        let calls = transport.calls();
        assert_eq!(calls[0].0, "runReport");
        let sent = &calls[0].1;
        assert!(sent.contains("RUN_OUTPUT_FORMAT"));
        assert!(sent.contains("PDF"));
        assert!(sent.contains("Lyon"));
        assert!(sent.contains("isListItem"));
    }

    #[test]
    fn test_run_server_error_restores_mode() {
        let result = "<operationResult><returnCode>1</returnCode><returnMessage>Report not found</returnMessage></operationResult>";
        let transport = FakeTransport::new(vec![result_envelope("runReport", result)]);
        let client = ReportClient::with_transport(&transport);

        let err = client
            .run("/reports/Nope", "HTML", &ReportParams::new(), &ReportArgs::new())
            .unwrap_err();
        match err {
            ReportError::ServerError(message) => {
                assert_eq!(message, "returnCode: 1, returnMessage: Report not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(client.response_mode(), ResponseMode::Envelope);
    }

    #[test]
    fn test_run_transport_error_restores_mode() {
        let transport = FakeTransport::new(vec![Err(ReportError::HttpStatus {
            status: 502,
            body: "bad gateway".to_string(),
        })]);
        let client = ReportClient::with_transport(&transport);

        let err = client
            .run("/reports/AllAccounts", "PDF", &ReportParams::new(), &ReportArgs::new())
            .unwrap_err();
        assert!(matches!(err, ReportError::HttpStatus { status: 502, .. }));
        assert_eq!(client.response_mode(), ResponseMode::Envelope);
    }

    #[test]
    fn test_run_unknown_response() {
        let transport = FakeTransport::new(vec![Ok(RawResponse {
            status: 200,
            content_type: Some("text/html".to_string()),
            body: b"<html><body>Maintenance</body></html>".to_vec(),
        })]);
        let client = ReportClient::with_transport(&transport);

        let err = client
            .run("/reports/AllAccounts", "PDF", &ReportParams::new(), &ReportArgs::new())
            .unwrap_err();
        match err {
            ReportError::UnknownResponse(raw) => assert!(raw.contains("Maintenance")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_run_envelope_without_run_report_return() {
        let result = "<operationResult><returnCode>0</returnCode></operationResult>";
        let responses = vec![
            result_envelope("list", result),
            ok_xml(build_rpc_response("urn:other", "runReport", result).unwrap()),
        ];
        let transport = FakeTransport::new(responses);
        let client = ReportClient::with_transport(&transport);

        for _ in 0..2 {
            let err = client
                .run("/reports/AllAccounts", "PDF", &ReportParams::new(), &ReportArgs::new())
                .unwrap_err();
            match err {
                ReportError::UnknownResponse(raw) => assert!(raw.contains("Envelope")),
                other => panic!("unexpected error: {other:?}"),
            }
            assert_eq!(client.response_mode(), ResponseMode::Envelope);
        }
    }

    #[test]
    fn test_run_server_error_mentioning_boundary_marker() {
        let result = "<operationResult><returnCode>1</returnCode><returnMessage>bad value ----=x</returnMessage></operationResult>";
        let transport = FakeTransport::new(vec![result_envelope("runReport", result)]);
        let client = ReportClient::with_transport(&transport);

        let err = client
            .run("/reports/AllAccounts", "PDF", &ReportParams::new(), &ReportArgs::new())
            .unwrap_err();
        match err {
            ReportError::ServerError(message) => {
                assert_eq!(message, "returnCode: 1, returnMessage: bad value ----=x");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_run_xml_skips_envelope_part() {
        let body = b"------=_Part_5_5\r\nContent-Type: text/xml\r\n\r\n<soapenv:Envelope/>\r\n------=_Part_5_5\r\nContent-Type: text/xml\r\n\r\n<jasperPrint/>\r\n------=_Part_5_5--\r\n";
        let transport = FakeTransport::new(vec![Ok(RawResponse {
            status: 200,
            content_type: None,
            body: body.to_vec(),
        })]);
        let client = ReportClient::with_transport(&transport);

        let output = client
            .run("/reports/AllAccounts", "XML", &ReportParams::new(), &ReportArgs::new())
            .unwrap();
        assert_eq!(output.report_part().unwrap().data, b"<jasperPrint/>");
    }

    #[test]
    fn test_run_fault_in_raw_mode() {
        let fault = build_soap_fault("soapenv:Server", "Report execution failed").unwrap();
        let transport = FakeTransport::new(vec![Ok(RawResponse {
            status: 500,
            content_type: Some("text/xml".to_string()),
            body: fault.into_bytes(),
        })]);
        let client = ReportClient::with_transport(&transport);

        let err = client
            .run("/reports/AllAccounts", "PDF", &ReportParams::new(), &ReportArgs::new())
            .unwrap_err();
        assert!(matches!(err, ReportError::SoapFault { ref message, .. } if message == "Report execution failed"));
    }

    #[test]
    fn test_get_without_descriptor() {
        let result = "<operationResult><returnCode>0</returnCode></operationResult>";
        let transport = FakeTransport::new(vec![result_envelope("get", result)]);
        let client = ReportClient::with_transport(&transport);

        let err = client.get("/reports/Nope").unwrap_err();
        assert!(matches!(err, ReportError::ResourceNotFound(ref p) if p == "/reports/Nope"));
    }

    #[test]
    fn test_get_report_unit_without_jrxml() {
        let result = format!(
            r#"<operationResult><returnCode>0</returnCode>
<resourceDescriptor name="Freight" wsType="reportUnit" uriString="/reports/Freight">
  <label>Freight</label>
  <resourceDescriptor name="ShipCountry" wsType="inputControl" uriString="/reports/Freight_files/ShipCountry">
    <label>Ship country</label>
    <resourceProperty name="{PROP_INPUTCONTROL_TYPE}"><value>7</value></resourceProperty>
  </resourceDescriptor>
  <resourceDescriptor name="Urgent" wsType="inputControl" uriString="/reports/Freight_files/Urgent">
    <resourceProperty name="{PROP_INPUTCONTROL_TYPE}"><value>1</value></resourceProperty>
  </resourceDescriptor>
  <resourceDescriptor name="Odd" wsType="inputControl" uriString="/reports/Freight_files/Odd"/>
</resourceDescriptor>
</operationResult>"#
        );
        let transport = FakeTransport::new(vec![result_envelope("get", &result)]);
        let client = ReportClient::with_transport(&transport);

        let detail = client.get("/reports/Freight").unwrap();
        assert_eq!(detail.name, "Freight");
        assert_eq!(detail.descriptor.id, "/reports/Freight");
        assert!(detail.descriptor.is_report());
        assert_eq!(detail.jrxml_path, None);
        assert!(detail.parameters.is_empty());

        let kinds: Vec<ControlType> = detail.controls.iter().map(|c| c.control_type).collect();
        assert_eq!(
            kinds,
            [ControlType::MultiValue, ControlType::Boolean, ControlType::Unknown]
        );
        assert_eq!(detail.controls[0].label.as_deref(), Some("Ship country"));
        assert_eq!(detail.controls[0].name, "ShipCountry");
        assert_eq!(transport.calls().len(), 1);
    }

    #[test]
    fn test_parameters_requires_multipart() {
        let transport = FakeTransport::new(vec![result_envelope(
            "get",
            "<operationResult><returnCode>0</returnCode></operationResult>",
        )]);
        let client = ReportClient::with_transport(&transport);

        let err = client.parameters("/reports/Freight_files/main.jrxml").unwrap_err();
        assert!(matches!(err, ReportError::NotMultipart));
        assert_eq!(client.response_mode(), ResponseMode::Envelope);
    }

    #[test]
    fn test_parameters_fault_mentioning_boundary_marker() {
        let fault = build_soap_fault("soapenv:Server", "bad value ----=x").unwrap();
        let transport = FakeTransport::new(vec![ok_xml(fault)]);
        let client = ReportClient::with_transport(&transport);

        let err = client.parameters("/reports/main.jrxml").unwrap_err();
        match err {
            ReportError::SoapFault { message, .. } => assert_eq!(message, "bad value ----=x"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(client.response_mode(), ResponseMode::Envelope);
    }

    #[test]
    fn test_parameters_missing_attachment() {
        let body = b"------=_Part_3_3\r\nContent-Type: text/xml\r\n\r\n<soapenv:Envelope/>\r\n------=_Part_3_3--\r\n";
        let transport = FakeTransport::new(vec![Ok(RawResponse {
            status: 200,
            content_type: None,
            body: body.to_vec(),
        })]);
        let client = ReportClient::with_transport(&transport);

        let err = client.parameters("/reports/main.jrxml").unwrap_err();
        assert!(matches!(err, ReportError::MissingAttachment(_)));
    }

    #[test]
    fn test_parse_report_parameters() {
        let jrxml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<jasperReport xmlns="{JRXML_NAMESPACE}" name="Freight">
  <parameter name="ShipCountry" class="java.lang.String">
    <defaultValueExpression><![CDATA["France"]]></defaultValueExpression>
  </parameter>
  <parameter name="MaxFreight" class="java.lang.Integer"/>
  <parameter name="From" class="java.util.Date"/>
  <group name="g"><parameter name="NotTopLevel" class="java.lang.String"/></group>
</jasperReport>"#
        );
        let mut body = Vec::new();
        body.extend_from_slice(b"------=_Part_4_4\r\nContent-Type: text/xml\r\n\r\n<soapenv:Envelope/>\r\n");
        body.extend_from_slice(b"------=_Part_4_4\r\nContent-Type: application/octet-stream\r\nContent-Id: <attachment>\r\n\r\n");
        body.extend_from_slice(jrxml.as_bytes());
        body.extend_from_slice(b"\r\n------=_Part_4_4--\r\n");

        let transport = FakeTransport::new(vec![Ok(RawResponse {
            status: 200,
            content_type: None,
            body,
        })]);
        let client = ReportClient::with_transport(&transport);

        let params = client.parameters("/reports/Freight_files/main.jrxml").unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].name, "ShipCountry");
        assert_eq!(params[0].value_type, ParameterType::String);
        assert_eq!(params[0].default_value_expression.as_deref(), Some("\"France\""));
        assert_eq!(params[1].value_type, ParameterType::Integer);
        assert_eq!(params[1].default_value_expression, None);
        assert_eq!(params[2].value_type, ParameterType::Unknown);
    }

    #[test]
    fn test_flatten_result() {
        let result = parse_xml(b"<operationResult><returnCode>3</returnCode><returnMessage/></operationResult>").unwrap();
        assert_eq!(flatten_result(&result), "returnCode: 3, returnMessage: ");
    }
}
