use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};

/// Ask for a server-side Table, falling back to plain JSON.
pub const TABLE_ACCEPT: &str = "application/json;as=Table;v=v1;g=meta.k8s.io,application/json";
pub const JSON_ACCEPT: &str = "application/json";

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub url: String,
    pub token: String,
    pub accept: &'static str,
    pub query: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// One GET against the API. Non-2xx statuses come back as responses, not errors.
pub trait HubApi {
    fn get(&self, req: &ApiRequest) -> Result<ApiResponse>;
}

pub struct HttpHubApi {
    agent: ureq::Agent,
}

impl HttpHubApi {
    /// The hub's ingress certificate is not verified and redirects are not followed.
    pub fn new(timeout: Option<Duration>) -> Self {
        let tls = ureq::tls::TlsConfig::builder()
            .disable_verification(true)
            .build();
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .tls_config(tls)
            .max_redirects(0)
            .max_redirects_will_error(false)
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .into();

        Self { agent }
    }
}

impl HubApi for HttpHubApi {
    fn get(&self, req: &ApiRequest) -> Result<ApiResponse> {
        if req.url.is_empty() {
            return Err(Error::Request("empty URL".into()));
        }
        debug!(url = %req.url, query = ?req.query, accept = req.accept, "GET");

        let mut request = self
            .agent
            .get(&req.url)
            .header("Content-Type", "application/json")
            .header("Authorization", &format!("Bearer {}", req.token))
            .header("Accept", req.accept);
        for (key, value) in &req.query {
            request = request.query(key, value);
        }

        let mut resp = request.call()?;
        let status = resp.status().as_u16();
        // managed cluster tables with embedded objects outgrow ureq's default 10 MiB cap
        let body = resp
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(Error::Body)?;
        debug!(status, bytes = body.len(), "response");

        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    use super::*;

    /// Serve one canned response on loopback and hand back the request head it got.
    fn serve_once(response: String) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut head = String::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
                head.push_str(&line);
            }
            let mut stream = stream;
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            let _ = tx.send(head);
        });

        (format!("http://{addr}/multicloud/hub-of-hubs-nonk8s-api/managedclusters"), rx)
    }

    fn response(status: &str, headers: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\n{headers}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn request(url: String) -> ApiRequest {
        ApiRequest {
            url,
            token: "sha256~secret".into(),
            accept: TABLE_ACCEPT,
            query: vec![("labelSelector".into(), "cloud=Amazon".into())],
        }
    }

    #[test]
    fn sends_token_accept_and_query() {
        let (url, head) = serve_once(response("200 OK", "Content-Type: application/json\r\n", "[]"));
        let resp = HttpHubApi::new(None).get(&request(url)).unwrap();

        assert_eq!(resp, ApiResponse { status: 200, body: b"[]".to_vec() });
        let head = head.recv().unwrap();
        assert!(head.starts_with("GET /multicloud/hub-of-hubs-nonk8s-api/managedclusters?labelSelector=cloud"));
        let lower = head.to_lowercase();
        assert!(lower.contains("authorization: bearer sha256~secret"));
        assert!(lower.contains(&format!("accept: {}", TABLE_ACCEPT.to_lowercase())));
    }

    #[test]
    fn error_statuses_are_responses() {
        let (url, _head) = serve_once(response("404 Not Found", "", "{\"kind\":\"Status\"}"));
        let resp = HttpHubApi::new(None).get(&request(url)).unwrap();

        assert_eq!(resp.status, 404);
        assert_eq!(resp.body, br#"{"kind":"Status"}"#.to_vec());
    }

    #[test]
    fn redirects_are_not_followed() {
        let (url, _head) = serve_once(response(
            "302 Found",
            "Location: http://127.0.0.1:1/elsewhere\r\n",
            "",
        ));
        let resp = HttpHubApi::new(None).get(&request(url)).unwrap();

        assert_eq!(resp.status, 302);
    }

    #[test]
    fn bodies_beyond_ten_mebibytes_are_read() {
        let body = format!("[{}]", vec!["\"x\""; 3 * 1024 * 1024].join(","));
        let (url, _head) = serve_once(response("200 OK", "", &body));
        let resp = HttpHubApi::new(None).get(&request(url)).unwrap();

        assert_eq!(resp.body.len(), body.len());
    }

    #[test]
    fn empty_url_is_refused_before_dialing() {
        let api = HttpHubApi::new(None);
        let err = api
            .get(&ApiRequest {
                url: String::new(),
                token: "t".into(),
                accept: JSON_ACCEPT,
                query: Vec::new(),
            })
            .unwrap_err();

        assert_eq!(err.to_string(), "unable to create request: empty URL");
    }
}
