//! Vault crypto client contract and remote implementation.
//!
//! # Responsibility
//! - Hide where encryption happens behind `VaultCipher`.
//! - Invoke the hosted vault crypto function over HTTP.
//!
//! # Invariants
//! - Key material never reaches this process.
//! - Plaintext is never logged; only lengths and status codes are.

use log::{error, info};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_ERROR_BODY_CHARS: usize = 200;

pub type CipherResult<T> = Result<T, CipherError>;

/// Failure while talking to the crypto function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// Request never produced an HTTP response.
    Transport(String),
    /// Function answered with a non-success status.
    Status { code: u16, body: String },
    /// Response body did not match the expected envelope.
    Decode(String),
    /// Function answered 2xx but reported an error.
    Rejected(String),
}

impl Display for CipherError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "vault function unreachable: {message}"),
            Self::Status { code, body } => {
                write!(f, "vault function returned status {code}: {body}")
            }
            Self::Decode(message) => write!(f, "invalid vault function response: {message}"),
            Self::Rejected(message) => write!(f, "vault function rejected request: {message}"),
        }
    }
}

impl Error for CipherError {}

/// Encrypt/decrypt seam. Implementations own all key handling.
pub trait VaultCipher {
    fn encrypt(&self, plaintext: &str) -> CipherResult<String>;
    fn decrypt(&self, ciphertext: &str) -> CipherResult<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CipherAction {
    Encrypt,
    Decrypt,
}

impl CipherAction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Encrypt => "encrypt",
            Self::Decrypt => "decrypt",
        }
    }
}

#[derive(Debug, Serialize)]
struct CipherRequest<'a> {
    action: CipherAction,
    value: &'a str,
}

#[derive(Debug, Deserialize)]
struct CipherResponse {
    value: Option<String>,
    error: Option<String>,
}

/// Calls `POST {functions_url}/{function_name}` with
/// `{"action": "...", "value": "..."}` and reads `{"value": "..."}`.
pub struct RemoteVaultCipher {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
}

impl RemoteVaultCipher {
    pub fn new(functions_url: &str, function_name: &str, api_key: impl Into<String>) -> CipherResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| CipherError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: function_endpoint(functions_url, function_name),
            api_key: api_key.into(),
        })
    }

    fn invoke(&self, action: CipherAction, value: &str) -> CipherResult<String> {
        let started_at = Instant::now();
        info!(
            "event=vault_function module=vault status=start action={} input_len={}",
            action.as_str(),
            value.len()
        );

        let result = self.send(action, value);
        match &result {
            Ok(output) => info!(
                "event=vault_function module=vault status=ok action={} duration_ms={} output_len={}",
                action.as_str(),
                started_at.elapsed().as_millis(),
                output.len()
            ),
            Err(err) => error!(
                "event=vault_function module=vault status=error action={} duration_ms={} error={}",
                action.as_str(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn send(&self, action: CipherAction, value: &str) -> CipherResult<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&CipherRequest { action, value })
            .send()
            .map_err(|err| CipherError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CipherError::Status {
                code: status.as_u16(),
                body: crate::logging::sanitize_message(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        let body = response
            .text()
            .map_err(|err| CipherError::Decode(err.to_string()))?;
        parse_cipher_response(&body)
    }
}

impl VaultCipher for RemoteVaultCipher {
    fn encrypt(&self, plaintext: &str) -> CipherResult<String> {
        self.invoke(CipherAction::Encrypt, plaintext)
    }

    fn decrypt(&self, ciphertext: &str) -> CipherResult<String> {
        self.invoke(CipherAction::Decrypt, ciphertext)
    }
}

fn function_endpoint(functions_url: &str, function_name: &str) -> String {
    format!(
        "{}/{}",
        functions_url.trim().trim_end_matches('/'),
        function_name.trim().trim_matches('/')
    )
}

fn parse_cipher_response(body: &str) -> CipherResult<String> {
    let parsed: CipherResponse =
        serde_json::from_str(body).map_err(|err| CipherError::Decode(err.to_string()))?;
    if let Some(message) = parsed.error.filter(|message| !message.trim().is_empty()) {
        return Err(CipherError::Rejected(message));
    }
    parsed
        .value
        .ok_or_else(|| CipherError::Decode("missing `value` field".to_string()))
}

#[cfg(test)]
mod tests {
    use super::{
        function_endpoint, parse_cipher_response, CipherAction, CipherError, CipherRequest,
        RemoteVaultCipher, VaultCipher,
    };
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc::{self, Receiver};
    use std::thread;

    /// Answers exactly one request with `status` and `body`, handing the raw
    /// request text back through the receiver.
    fn serve_once(status: &str, body: String) -> (String, Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind local listener");
        let addr = listener.local_addr().expect("listener address");
        let status = status.to_string();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept request");
            tx.send(read_request(&mut stream)).expect("hand back request");
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).expect("write response");
        });
        (format!("http://{addr}/functions/v1/"), rx)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut raw = Vec::new();
        let mut chunk = [0_u8; 1024];
        loop {
            let read = stream.read(&mut chunk).expect("read request");
            if read == 0 {
                break;
            }
            raw.extend_from_slice(&chunk[..read]);
            let text = String::from_utf8_lossy(&raw);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if raw.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8(raw).expect("utf-8 request")
    }

    fn local_cipher(functions_url: &str) -> RemoteVaultCipher {
        RemoteVaultCipher {
            client: reqwest::blocking::Client::builder()
                .no_proxy()
                .build()
                .expect("http client"),
            endpoint: function_endpoint(functions_url, "vault-crypto"),
            api_key: "anon-key".to_string(),
        }
    }

    #[test]
    fn encrypt_posts_json_with_both_auth_headers() {
        let (url, requests) = serve_once("200 OK", r#"{"value":"c1ph3r"}"#.to_string());

        let ciphertext = local_cipher(&url).encrypt("hunter2").unwrap();
        assert_eq!(ciphertext, "c1ph3r");

        let request = requests.recv().unwrap();
        let (head, body) = request.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("POST /functions/v1/vault-crypto HTTP/1.1\r\n"));
        let head = head.to_lowercase();
        assert!(head.contains("\r\napikey: anon-key\r\n"));
        assert!(head.contains("\r\nauthorization: bearer anon-key\r\n"));
        assert!(head.contains("\r\ncontent-type: application/json\r\n"));
        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"action": "encrypt", "value": "hunter2"})
        );
    }

    #[test]
    fn non_success_status_keeps_a_flattened_bounded_body() {
        let body = format!("upstream\nfailed {}", "x".repeat(400));
        let (url, _requests) = serve_once("503 Service Unavailable", body);

        let (code, body) = match local_cipher(&url).decrypt("c1ph3r") {
            Err(CipherError::Status { code, body }) => (code, body),
            other => panic!("expected status error, got {other:?}"),
        };
        assert_eq!(code, 503);
        assert!(body.starts_with("upstream failed x"));
        assert!(!body.contains('\n'));
        assert!(body.ends_with("..."));
        assert_eq!(body.chars().count(), 203);
    }

    #[test]
    fn success_status_with_error_field_is_rejected() {
        let (url, _requests) = serve_once("200 OK", r#"{"error":"bad key"}"#.to_string());

        assert_eq!(
            local_cipher(&url).decrypt("c1ph3r"),
            Err(CipherError::Rejected("bad key".to_string()))
        );
    }

    #[test]
    fn unreachable_function_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        assert!(matches!(
            local_cipher(&format!("http://{addr}")).encrypt("x"),
            Err(CipherError::Transport(_))
        ));
    }

    #[test]
    fn endpoint_joins_without_duplicate_slashes() {
        assert_eq!(
            function_endpoint("https://x.example.co/functions/v1/", "/vault-crypto"),
            "https://x.example.co/functions/v1/vault-crypto"
        );
    }

    #[test]
    fn request_body_uses_snake_case_action() {
        let body = serde_json::to_value(CipherRequest {
            action: CipherAction::Decrypt,
            value: "abc",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"action": "decrypt", "value": "abc"}));
    }

    #[test]
    fn response_envelope_is_validated() {
        assert_eq!(parse_cipher_response(r#"{"value":"plain"}"#).unwrap(), "plain");
        assert!(matches!(
            parse_cipher_response(r#"{"error":"bad key"}"#),
            Err(CipherError::Rejected(message)) if message == "bad key"
        ));
        assert!(matches!(
            parse_cipher_response("{}"),
            Err(CipherError::Decode(_))
        ));
        assert!(matches!(
            parse_cipher_response("not json"),
            Err(CipherError::Decode(_))
        ));
    }
}
