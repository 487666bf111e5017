// ==============================================================================
// HTTP Translation Strategy
// ==============================================================================
//
// POSTs the IDL file and every sibling file in its directory to a translation
// service as `application/x-www-form-urlencoded` fields:
//
//     idl.0.filename=<name>&idl.0.content=<text>&idl.1.filename=...
//
// The primary file is always index 0. A 500 response carries the service's
// error text (typically an IDL syntax error), which is surfaced verbatim.
// A successful response must be a JSON array; it is written to the JSON path
// unchanged.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;

use super::{SourceFile, TranslationRequest, Translator, validate_json_array, write_json};
use crate::error::{BuildError, Result};
use crate::log::DynLogSink;

/// Translates by POSTing to a remote translation service.
pub struct HttpTranslator {
    client: Client,
    endpoint: String,
    log: DynLogSink,
}

impl HttpTranslator {
    /// Build a translator with its own client. `timeout` bounds the whole
    /// request; `None` waits indefinitely.
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Option<Duration>,
        log: DynLogSink,
    ) -> Result<Self> {
        let endpoint = endpoint.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| BuildError::TranslationTransport {
                endpoint: endpoint.clone(),
                source,
            })?;
        Ok(Self::with_client(endpoint, client, log))
    }

    /// Use a preconfigured client (proxy settings, TLS roots, ...).
    pub fn with_client(endpoint: impl Into<String>, client: Client, log: DynLogSink) -> Self {
        HttpTranslator {
            client,
            endpoint: endpoint.into(),
            log,
        }
    }

    fn transport_error(&self, source: reqwest::Error) -> BuildError {
        BuildError::TranslationTransport {
            endpoint: self.endpoint.clone(),
            source,
        }
    }
}

/// The indexed form fields for a set of source files, in order.
#[must_use]
pub fn form_fields(sources: &[SourceFile]) -> Vec<(String, String)> {
    sources
        .iter()
        .enumerate()
        .flat_map(|(i, source)| {
            [
                (format!("idl.{i}.filename"), source.name.clone()),
                (
                    format!("idl.{i}.content"),
                    String::from_utf8_lossy(&source.content).into_owned(),
                ),
            ]
        })
        .collect()
}

impl Translator for HttpTranslator {
    fn translate(&self, request: &TranslationRequest<'_>) -> Result<()> {
        let sources = request.sources()?;
        self.log.debug(&format!(
            "POST {} ({} files)",
            self.endpoint,
            sources.len()
        ));

        let response = self
            .client
            .post(&self.endpoint)
            .form(&form_fields(&sources))
            .send()
            .map_err(|e| self.transport_error(e))?;

        if response.status() == StatusCode::INTERNAL_SERVER_ERROR {
            let body = response.text().map_err(|e| self.transport_error(e))?;
            return Err(BuildError::TranslationServiceFailure {
                endpoint: self.endpoint.clone(),
                body,
            });
        }

        let body = response
            .error_for_status()
            .and_then(|r| r.bytes())
            .map_err(|e| self.transport_error(e))?;

        validate_json_array(&body, &self.endpoint)?;
        write_json(&body, request.json_path)
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::IdlFile;
    use crate::log::MemorySink;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::thread::{self, JoinHandle};

    /// Accept one connection on a loopback port, answer it with `status` and
    /// `body`, and hand back the raw request text.
    fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
        let addr = listener.local_addr().expect("listener address");
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept connection");
            let request = read_request(&mut stream);
            let response = format!(
                "HTTP/1.1 {status} Mock\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).expect("write response");
            request
        });
        (format!("http://{addr}/idl2json"), handle)
    }

    fn read_request(stream: &mut impl Read) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).expect("read request");
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let length = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    struct Fixture {
        _tmp: tempfile::TempDir,
        idl: IdlFile,
        json: PathBuf,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().expect("create temp dir");
        fs::write(tmp.path().join("calc.idl"), "interface Calc { add(a int) int }\n")
            .expect("write idl");
        fs::write(tmp.path().join("types.idl"), "struct Pair { a int }\n").expect("write sibling");
        let idl = IdlFile::new(tmp.path().join("calc.idl")).expect("idl file");
        let json = tmp.path().join("gen").join("calc.json");
        Fixture {
            _tmp: tmp,
            idl,
            json,
        }
    }

    fn translator(url: &str) -> HttpTranslator {
        let client = Client::builder()
            .no_proxy()
            .build()
            .expect("build test client");
        HttpTranslator::with_client(url, client, Arc::new(MemorySink::new()))
    }

    #[test]
    fn form_fields_are_indexed() {
        let sources = vec![
            SourceFile {
                name: "a.idl".to_string(),
                content: b"struct A {}".to_vec(),
            },
            SourceFile {
                name: "b.idl".to_string(),
                content: b"enum B { x }".to_vec(),
            },
        ];
        let fields = form_fields(&sources);
        let keys: Vec<&str> = fields.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec!["idl.0.filename", "idl.0.content", "idl.1.filename", "idl.1.content"]
        );
        assert_eq!(fields[3].1, "enum B { x }");
    }

    #[test]
    fn success_writes_body_verbatim() {
        let fx = fixture();
        let payload = r#"[{"type":"interface","name":"Calc"}]"#;
        let (url, server) = serve_once(200, payload);

        translator(&url)
            .translate(&TranslationRequest::new(&fx.idl, &fx.json))
            .expect("translation should succeed");

        assert_eq!(fs::read_to_string(&fx.json).expect("read json"), payload);

        let request = server.join().expect("server thread");
        let lower = request.to_ascii_lowercase();
        assert!(request.starts_with("POST /idl2json "), "got: {request}");
        assert!(lower.contains("content-type: application/x-www-form-urlencoded"));
        assert!(
            request.contains("idl.0.filename=calc.idl&idl.0.content=interface+Calc+%7B"),
            "primary file must be index 0: {request}"
        );
        assert!(request.contains("idl.1.filename=types.idl"));
    }

    #[test]
    fn server_error_body_is_surfaced() {
        let fx = fixture();
        let (url, server) = serve_once(500, "calc.idl:1: unexpected token 'int'");

        let err = translator(&url)
            .translate(&TranslationRequest::new(&fx.idl, &fx.json))
            .expect_err("500 must fail");
        server.join().expect("server thread");

        match err {
            BuildError::TranslationServiceFailure { body, .. } => {
                assert_eq!(body, "calc.idl:1: unexpected token 'int'");
            }
            other => panic!("expected TranslationServiceFailure, got {other:?}"),
        }
        assert!(!fx.json.exists(), "nothing should be written on failure");
    }

    #[test]
    fn html_response_is_invalid() {
        let fx = fixture();
        let (url, server) = serve_once(200, "<html><body>proxy login</body></html>");

        let err = translator(&url)
            .translate(&TranslationRequest::new(&fx.idl, &fx.json))
            .expect_err("non-array body must fail");
        server.join().expect("server thread");

        match err {
            BuildError::InvalidTranslationResponse { body, .. } => {
                assert_eq!(body, "<html><body>proxy login</body></html>");
            }
            other => panic!("expected InvalidTranslationResponse, got {other:?}"),
        }
    }

    #[test]
    fn empty_response_is_invalid() {
        let fx = fixture();
        let (url, server) = serve_once(200, "");
        let err = translator(&url)
            .translate(&TranslationRequest::new(&fx.idl, &fx.json))
            .expect_err("empty body must fail");
        server.join().expect("server thread");
        assert!(matches!(err, BuildError::InvalidTranslationResponse { .. }));
    }

    #[test]
    fn other_error_status_is_a_transport_failure() {
        let fx = fixture();
        let (url, server) = serve_once(404, "[]");
        let err = translator(&url)
            .translate(&TranslationRequest::new(&fx.idl, &fx.json))
            .expect_err("404 must fail");
        server.join().expect("server thread");

        match err {
            BuildError::TranslationTransport { source, .. } => {
                assert_eq!(source.status(), Some(StatusCode::NOT_FOUND));
            }
            other => panic!("expected TranslationTransport, got {other:?}"),
        }
    }

    #[test]
    fn connection_refused_is_a_transport_failure() {
        let fx = fixture();
        // Bind then drop to get a port nobody is listening on.
        let port = TcpListener::bind("127.0.0.1:0")
            .and_then(|l| l.local_addr())
            .expect("free port")
            .port();
        let err = translator(&format!("http://127.0.0.1:{port}/"))
            .translate(&TranslationRequest::new(&fx.idl, &fx.json))
            .expect_err("nothing listening must fail");
        assert!(matches!(err, BuildError::TranslationTransport { .. }));
    }
}
