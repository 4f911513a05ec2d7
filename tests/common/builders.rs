// Response builders for the structured error bodies the API returns

use serde_json::{Value, json};
use wiremock::ResponseTemplate;

pub const SYSTEM_MAINTENANCE: i32 = 4001;
pub const SERVER_TIMEOUT: i32 = 4002;
pub const RATE_LIMITED: i32 = 4003;
pub const UNEXPECTED_ERROR: i32 = 4004;

pub const RETRYABLE_CODES: [(u16, i32); 4] = [
    (503, SYSTEM_MAINTENANCE),
    (500, SERVER_TIMEOUT),
    (429, RATE_LIMITED),
    (500, UNEXPECTED_ERROR),
];

/// Builder for `{errorCode, message, refId}` responses
pub struct ErrorResponseBuilder {
    status: u16,
    error_code: i32,
    message: String,
    ref_id: Option<String>,
}

impl ErrorResponseBuilder {
    pub fn new(status: u16, error_code: i32) -> Self {
        Self {
            status,
            error_code,
            message: format!("error {}", error_code),
            ref_id: None,
        }
    }

    pub fn rate_limited() -> Self {
        Self::new(429, RATE_LIMITED).with_message("Rate limit exceeded.")
    }

    pub fn not_found() -> Self {
        Self::new(404, 1006).with_message("Not Found")
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = message.to_string();
        self
    }

    pub fn with_ref_id(mut self, ref_id: &str) -> Self {
        self.ref_id = Some(ref_id.to_string());
        self
    }

    pub fn body(&self) -> Value {
        let mut body = json!({
            "errorCode": self.error_code,
            "message": self.message,
        });
        if let Some(ref_id) = &self.ref_id {
            body["refId"] = json!(ref_id);
        }
        body
    }

    pub fn build(self) -> ResponseTemplate {
        ResponseTemplate::new(self.status).set_body_json(self.body())
    }
}

/// A `resultCode: 0` mutation envelope wrapping `result`
pub fn success_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "message": "SUCCESS",
        "resultCode": 0,
        "result": result,
    }))
}
