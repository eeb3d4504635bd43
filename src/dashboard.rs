//! Web dashboard for the panel
//!
//! Renders the index page listing the main configuration files and serves
//! the script that drives the Nginx status indicator and restart button.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Response, StatusCode};

/// Render the index page listing the main configuration files
pub fn serve_index(config_files: &[String]) -> Response<Full<Bytes>> {
    let items: String = config_files
        .iter()
        .map(|name| {
            let escaped = escape_html(name);
            format!(
                "            <li><a href=\"/api/config/{}\">{}</a></li>\n",
                urlencoding::encode(name),
                escaped
            )
        })
        .collect();

    let html = INDEX_HTML
        .replace("{{version}}", env!("CARGO_PKG_VERSION"))
        .replace("{{config_files}}", &items);

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Full::new(Bytes::from(html)))
        .expect("valid response with StatusCode enum and static header")
}

/// Serve dashboard CSS
pub fn serve_css() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/css")
        .body(Full::new(Bytes::from(PANEL_CSS)))
        .expect("valid response with StatusCode enum and static header")
}

/// Serve dashboard JavaScript
pub fn serve_js() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/javascript")
        .body(Full::new(Bytes::from(PANEL_JS)))
        .expect("valid response with StatusCode enum and static header")
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Nginx Panel</title>
    <link rel="stylesheet" href="/static/panel.css">
</head>
<body>
    <nav class="navbar">
        <h1>Nginx Panel</h1>
        <div class="nav-actions">
            <span id="nginx-status-circle" class="status-circle status-loading"></span>
            <button id="nginx-restart-btn" class="btn" onclick="restartNginx()">
                <span id="nginx-restart-btn-spinner"></span>Restart Nginx
            </button>
        </div>
    </nav>
    <main class="container">
        <section>
            <h2>Main configuration</h2>
            <ul class="config-list">
{{config_files}}            </ul>
        </section>
        <section>
            <h2>Sites</h2>
            <a href="/api/domains">Site list (JSON)</a>
        </section>
    </main>
    <footer>nginx-panel {{version}}</footer>
    <script src="/static/panel.js"></script>
</body>
</html>
"##;

const PANEL_CSS: &str = r#"body { font-family: sans-serif; margin: 0; background: #f5f6f8; color: #222; }
.navbar { display: flex; justify-content: space-between; align-items: center; padding: 0 1.5rem; background: #1d2b36; color: #fff; }
.nav-actions { display: flex; align-items: center; gap: 0.75rem; }
.container { max-width: 960px; margin: 1.5rem auto; padding: 0 1rem; }
.config-list li { padding: 0.25rem 0; }
.btn { padding: 0.4rem 0.9rem; border: 0; border-radius: 4px; background: #009639; color: #fff; cursor: pointer; }
.btn:disabled { opacity: 0.6; cursor: default; }
.status-circle { display: inline-block; width: 14px; height: 14px; border-radius: 50%; background: #999; }
.status-running { background: #2ecc71; }
.status-restarting, .status-loading { background: #f1c40f; }
.status-exited, .status-dead, .status-unknown { background: #e74c3c; }
.status-black { background: #000; }
.custom-spinner { display: inline-block; width: 10px; height: 10px; margin-right: 6px; border: 2px solid #fff; border-top-color: transparent; border-radius: 50%; animation: spin 0.8s linear infinite; }
@keyframes spin { to { transform: rotate(360deg); } }
footer { text-align: center; color: #888; font-size: 0.8rem; padding: 1rem; }
"#;

const PANEL_JS: &str = r#"document.addEventListener('DOMContentLoaded', setNginxStatusCircle);

function setNginxStatusCircle() {
    const circle = document.getElementById('nginx-status-circle');
    fetch('/api/status-nginx')
        .then(response => response.json())
        .then(body => {
            const status = body.success ? body.data.status : 'unknown';
            circle.className = 'status-circle status-' + status;
        })
        .catch(() => { circle.className = 'status-circle status-unknown'; });
}

let restartInProgress = false;

function blinkWhileRestarting() {
    const circle = document.getElementById('nginx-status-circle');
    circle.className = 'status-circle status-loading';
    const intervalId = setInterval(() => {
        if (!restartInProgress) {
            clearInterval(intervalId);
            setNginxStatusCircle();
        } else if (circle.className === 'status-circle status-loading') {
            circle.className = 'status-circle status-black';
        } else {
            circle.className = 'status-circle status-loading';
        }
    }, 100);
}

function restartNginx() {
    restartInProgress = true;
    blinkWhileRestarting();

    const button = document.getElementById('nginx-restart-btn');
    const spinner = document.getElementById('nginx-restart-btn-spinner');
    button.disabled = true;
    spinner.className = 'custom-spinner';

    fetch('/api/restart-nginx', { method: 'POST' })
        .then(response => response.json())
        .then(body => { if (!body.success) { alert(body.error); } })
        .finally(() => {
            restartInProgress = false;
            spinner.className = '';
            button.disabled = false;
        });
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_serve_index_lists_files() {
        let response = serve_index(&["nginx.conf".to_string(), "<odd>&name".to_string()]);
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(CONTENT_TYPE).unwrap().to_str().unwrap().contains("text/html"));

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("<a href=\"/api/config/nginx.conf\">nginx.conf</a>"));
        assert!(html.contains("&lt;odd&gt;&amp;name"));
        assert!(!html.contains("{{config_files}}"));
    }

    #[test]
    fn test_serve_css() {
        let response = serve_css();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(CONTENT_TYPE).unwrap().to_str().unwrap().contains("text/css"));
    }

    #[test]
    fn test_serve_js() {
        let response = serve_js();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(CONTENT_TYPE).unwrap().to_str().unwrap().contains("javascript"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b>&\"'"), "a&lt;b&gt;&amp;&quot;&#39;");
        assert_eq!(escape_html("plain.conf"), "plain.conf");
    }
}
