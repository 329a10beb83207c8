//! HTTP transport for OpenAI-compatible Responses endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};

use crate::error::{Result, VisionAnalysisError};
use crate::invoker::{TransportError, VisionRequest, VisionTransport};

pub const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1/responses";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct OpenAiTransport {
    client: reqwest::Client,
    endpoint: url::Url,
}

impl OpenAiTransport {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = url::Url::parse(endpoint).map_err(|e| {
            VisionAnalysisError::config(format!("Invalid vision api_endpoint '{endpoint}': {e}"))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| VisionAnalysisError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, endpoint })
    }

}

#[async_trait]
impl VisionTransport for OpenAiTransport {
    async fn send(
        &self,
        api_key: &str,
        request: &VisionRequest,
    ) -> std::result::Result<Value, TransportError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(api_key)
            .json(&request_body(request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::Api {
                status: status.as_u16(),
                message: error_message(status.as_u16(), &body),
            });
        }

        serde_json::from_str(&body).map_err(|e| TransportError::Api {
            status: status.as_u16(),
            message: format!("provider returned a non-JSON body: {e}"),
        })
    }
}

pub(crate) fn request_body(request: &VisionRequest) -> Value {
    json!({
        "model": request.model,
        "instructions": request.instructions,
        "max_output_tokens": request.max_output_tokens,
        "input": [
            {
                "role": "user",
                "content": [
                    { "type": "input_text", "text": request.prompt },
                    {
                        "type": "input_image",
                        "image_url": data_url(&request.desktop_image),
                        "detail": "high"
                    },
                    {
                        "type": "input_image",
                        "image_url": data_url(&request.mobile_image),
                        "detail": "high"
                    }
                ]
            }
        ],
        "text": { "format": { "type": "json_object" } }
    })
}

fn data_url(image_b64: &str) -> String {
    let image_b64 = image_b64.trim();
    format!("data:{};base64,{}", sniff_mime(image_b64), image_b64)
}

/// Guess the image type from the base64 form of its magic bytes.
fn sniff_mime(image_b64: &str) -> &'static str {
    if image_b64.starts_with("/9j/") {
        "image/jpeg"
    } else if image_b64.starts_with("UklGR") {
        "image/webp"
    } else if image_b64.starts_with("R0lGOD") {
        "image/gif"
    } else {
        "image/png"
    }
}

fn error_message(status: u16, body: &str) -> String {
    let from_body = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        value
            .get("error")
            .and_then(|err| err.get("message").or(Some(err)))
            .and_then(Value::as_str)
            .map(str::to_owned)
    });

    match from_body {
        Some(msg) if !msg.trim().is_empty() => msg,
        _ if !body.trim().is_empty() && body.len() <= 500 => body.trim().to_string(),
        _ => format!("vision API returned status {status}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> VisionRequest {
        VisionRequest {
            model: "gpt-4o".into(),
            instructions: "system".into(),
            prompt: "analyze".into(),
            desktop_image: "iVBORw0KGgo=".into(),
            mobile_image: "/9j/4AAQSkZJRg==".into(),
            max_output_tokens: 1200,
        }
    }

    #[test]
    fn body_carries_prompt_and_both_images_in_order() {
        let body = request_body(&request());
        let content = &body["input"][0]["content"];

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["instructions"], "system");
        assert_eq!(body["max_output_tokens"], 1200);
        assert_eq!(body["text"]["format"]["type"], "json_object");
        assert_eq!(content[0]["text"], "analyze");
        assert_eq!(content[1]["image_url"], "data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(content[2]["image_url"], "data:image/jpeg;base64,/9j/4AAQSkZJRg==");
    }

    #[test]
    fn sniffs_common_image_types() {
        assert_eq!(sniff_mime("UklGRiQAAABXRUJQ"), "image/webp");
        assert_eq!(sniff_mime("R0lGODlhAQABAAAA"), "image/gif");
        assert_eq!(sniff_mime("anything-else"), "image/png");
    }

    #[test]
    fn error_message_prefers_provider_message() {
        let body = r#"{"error":{"message":"Rate limit reached for gpt-4o","type":"requests"}}"#;
        assert_eq!(error_message(429, body), "Rate limit reached for gpt-4o");
        assert_eq!(error_message(502, "bad gateway"), "bad gateway");
        assert_eq!(error_message(500, ""), "vision API returned status 500");
    }

    #[test]
    fn rejects_invalid_endpoint() {
        let err = OpenAiTransport::new("not a url", DEFAULT_TIMEOUT).unwrap_err();
        assert!(matches!(err, VisionAnalysisError::Config(msg) if msg.contains("api_endpoint")));
    }

    /// Read one HTTP request (headers plus `Content-Length` body) off the socket.
    async fn read_request(stream: &mut tokio::net::TcpStream) -> Vec<u8> {
        use tokio::io::AsyncReadExt;

        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.expect("read request");
            if n == 0 {
                return buf;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    return buf;
                }
            }
        }
    }

    #[tokio::test]
    async fn truncated_success_body_is_a_request_error() {
        use tokio::io::AsyncWriteExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            read_request(&mut stream).await;
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 500\r\n\r\n{\"output_text\":")
                .await
                .expect("write response");
            stream.shutdown().await.ok();
        });

        let transport =
            OpenAiTransport::new(&format!("http://{addr}/v1/responses"), DEFAULT_TIMEOUT)
                .expect("valid endpoint");
        let err = transport.send("key", &request()).await.unwrap_err();
        server.await.expect("server task");

        assert!(matches!(err, TransportError::Request(_)), "got {err:?}");
        assert_eq!(err.status(), None);
    }
}
