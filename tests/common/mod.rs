// ==============================================================================
// Shared Test Helpers
// ==============================================================================
//
// Each test file that imports this module compiles its own copy, so not every
// function is used in every binary. Suppress the resulting dead_code warnings.
#![allow(dead_code)]
// Import this module in each test file with:
//
//     mod common;
//     use common::{render_diagnostic, serve_once, write_tree};

use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread::{self, JoinHandle};

use miette::{GraphicalReportHandler, GraphicalTheme};

/// Shell script standing in for a local translator. Invoked as
/// `sh -c SCRIPT translator -j <json> <idl>`, it writes a one-element JSON
/// array naming the IDL file and echoes a line on each stream.
pub const FAKE_TRANSLATOR: &str = r#"printf '[{"idl":"%s"}]' "$(basename "$3")" > "$2"; echo "translated $3"; echo "warning: none" >&2"#;

/// Like [`FAKE_TRANSLATOR`], but fails for any file named `broken.idl`.
pub const PICKY_TRANSLATOR: &str = r#"case "$3" in */broken.idl) echo "broken.idl:1: syntax error" >&2; exit 2;; esac; printf '[]' > "$2""#;

/// Create `files` (relative path, contents) under `root`, making parent
/// directories as needed.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (rel, contents) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture directory");
        }
        fs::write(&path, contents).expect("write fixture file");
    }
}

/// Render a diagnostic to a deterministic string. Uses non-unicode theme at
/// 80 columns.
pub fn render_diagnostic(report: &miette::Report) -> String {
    let handler = GraphicalReportHandler::new_themed(GraphicalTheme::none()).with_width(80);
    let mut buf = String::new();
    handler
        .render_report(&mut buf, report.as_ref())
        .expect("render to String is infallible");
    buf
}

/// Accept one connection on a loopback port, answer it with `status` and
/// `body`, and hand back the raw request text once the thread is joined.
pub fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
    let addr = listener.local_addr().expect("listener address");
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept connection");
        let request = read_request(&mut stream);
        let response = format!(
            "HTTP/1.1 {status} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
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
