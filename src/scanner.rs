//! Statement image analysis.
//!
//! Sends a photo of a bank or brokerage statement to Gemini with an
//! extraction prompt and parses the JSON answer into [`ScannedAsset`]s.
//! Quota and capacity errors are retried according to a [`RetryPolicy`];
//! anything else fails immediately. Every final failure is reported as a
//! single [`WealthError::Scan`] with a generic message, the details go to
//! the log.
//!
//! [`ScannedAsset`]: crate::models::ScannedAsset
//! [`RetryPolicy`]: crate::retry::RetryPolicy
//! [`WealthError::Scan`]: crate::error::WealthError::Scan

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, WealthError};
use crate::models::ScannedAsset;
use crate::retry::{RetryPolicy, is_overloaded_message, is_retryable_status};

/// Default Gemini API host.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Message surfaced for every final scan failure.
const SCAN_FAILED: &str = "could not analyse the statement image, please try again later";

/// Extraction instructions sent with the image.
pub const EXTRACTION_PROMPT: &str = "\
Instructions:
1. Analyze the attached financial statement image.
2. Extract all assets into a JSON array.
3. For each asset:
   - category: 'STOCK' (for shares/equities/funds) or 'CASH' (for bank balances/deposits).
   - institution: Name of the bank or brokerage. Clearly identify names like 'CommSec', 'Hang Seng', 'HSBC', 'Schwab', 'IBKR'.
   - symbol: The ticker or stock code (e.g., 'AAPL', '0700.HK', 'GOLD.AX', 'IVV'). If CASH, leave empty.
   - amount: If STOCK, must be the QUANTITY of shares. If CASH, must be the BALANCE.
   - currency: Extract 'HKD', 'USD', or 'AUD'. Default to 'HKD' if not found.

Return ONLY a JSON array.";

// ── Wire types ──────────────────────────────────────────────────────────

/// `generateContent` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    /// Single user turn.
    contents: Vec<Content>,
    /// Output constraints.
    generation_config: GenerationConfig,
}

/// One conversation turn.
#[derive(Debug, Serialize)]
struct Content {
    /// Image then prompt.
    parts: Vec<Part>,
}

/// Request part: inline image or text.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    /// Base64 image.
    InlineData {
        /// Image payload.
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    /// Prompt text.
    Text {
        /// The text.
        text: String,
    },
}

/// Base64-encoded blob.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    /// MIME type of the image.
    mime_type: &'static str,
    /// Base64 data without a data-URL prefix.
    data: String,
}

/// Generation settings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    /// Forces a JSON answer.
    response_mime_type: &'static str,
}

/// `generateContent` response body (only the parts read here).
#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    /// Candidate answers; the first is used.
    #[serde(default)]
    candidates: Vec<Candidate>,
}

/// One candidate answer.
#[derive(Debug, Default, Deserialize)]
struct Candidate {
    /// Answer content.
    #[serde(default)]
    content: Option<CandidateContent>,
}

/// Content of a candidate.
#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    /// Answer parts.
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

/// One answer part.
#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    /// Text, if this is a text part.
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Outcome of one failed attempt.
#[derive(Debug)]
enum AttemptFailure {
    /// Quota or capacity problem; worth retrying.
    Transient(String),
    /// Anything else.
    Fatal(String),
}

/// Classifies an error response.
fn classify(status: u16, body: &str) -> AttemptFailure {
    let detail = format!("HTTP {status}: {body}");
    if is_retryable_status(status) || is_overloaded_message(body) {
        AttemptFailure::Transient(detail)
    } else {
        AttemptFailure::Fatal(detail)
    }
}

/// Builds the request for an already encoded image.
fn build_request(image_base64: String, mime_type: &'static str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type,
                        data: image_base64,
                    },
                },
                Part::Text {
                    text: EXTRACTION_PROMPT.to_owned(),
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
        },
    }
}

/// Guesses the MIME type from the file signature; JPEG unless it is PNG
/// or WebP.
#[must_use]
fn sniff_mime(image: &[u8]) -> &'static str {
    if image.starts_with(b"\x89PNG") {
        "image/png"
    } else if image.starts_with(b"RIFF") && image.get(8..12) == Some(b"WEBP".as_slice()) {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

/// Parses the model's JSON answer.
///
/// Accepts a bare array or an object wrapping the array in `assets`; any
/// other JSON value yields no assets.
///
/// # Errors
///
/// Returns [`WealthError::Serialization`] if the text is not JSON or an
/// element does not look like an asset.
#[inline]
pub fn parse_scanned_assets(text: &str) -> Result<Vec<ScannedAsset>> {
    let value: Value = serde_json::from_str(text.trim())?;
    let list = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => map.remove("assets").unwrap_or(Value::Null),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => Value::Null,
    };
    if list.is_array() {
        serde_json::from_value(list).map_err(WealthError::from)
    } else {
        Ok(Vec::new())
    }
}

/// Generates a statement scanner (async or blocking) with builder,
/// methods, and tests.
macro_rules! define_scanner {
    (
        scanner_name: $scanner:ident,
        builder_name: $builder:ident,
        http_type: $http_type:ty,
        sleep: $sleep:path,
        scanner_doc: $scanner_doc:expr,
        builder_doc: $builder_doc:expr,
        $(async_kw: $async_kw:tt,)?
        $(await_kw: $await_ext:tt,)?
    ) => {
        #[doc = $builder_doc]
        #[derive(Debug)]
        pub struct $builder {
            /// Gemini API key.
            api_key: Option<SecretString>,
            /// Model override.
            model: Option<String>,
            /// API host override (for testing).
            base_url: Option<String>,
            /// Retry schedule.
            retry: RetryPolicy,
        }

        impl $builder {
            /// Sets the Gemini API key.
            #[inline]
            #[must_use]
            pub fn api_key<T: Into<String>>(mut self, key: T) -> Self {
                self.api_key = Some(SecretString::from(key.into()));
                self
            }

            /// Overrides the model (default [`DEFAULT_MODEL`]).
            #[inline]
            #[must_use]
            pub fn model<T: Into<String>>(mut self, model: T) -> Self {
                self.model = Some(model.into());
                self
            }

            /// Overrides the API host (useful for testing with a mock server).
            #[inline]
            #[must_use]
            pub fn base_url<T: Into<String>>(mut self, url: T) -> Self {
                self.base_url = Some(url.into());
                self
            }

            /// Replaces the retry schedule.
            #[inline]
            #[must_use]
            pub const fn retry_policy(mut self, policy: RetryPolicy) -> Self {
                self.retry = policy;
                self
            }

            /// Builds the scanner.
            ///
            /// # Errors
            ///
            /// Returns [`WealthError::MissingCredential`] if no API key was
            /// provided and [`WealthError::Http`] if the HTTP client fails
            /// to build.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub fn build(self) -> Result<$scanner> {
                let api_key = self
                    .api_key
                    .filter(|key| !key.expose_secret().trim().is_empty())
                    .ok_or(WealthError::MissingCredential("gemini api key"))?;
                let base_url = self
                    .base_url
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
                let model = self.model.unwrap_or_else(|| DEFAULT_MODEL.to_owned());
                tracing::debug!(base_url = %base_url, model = %model, "building statement scanner");
                let http = <$http_type>::builder().build()?;
                Ok($scanner {
                    http,
                    api_key,
                    endpoint: format!(
                        "{}/v1beta/models/{model}:generateContent",
                        base_url.trim_end_matches('/')
                    ),
                    retry: self.retry,
                })
            }
        }

        #[doc = $scanner_doc]
        #[derive(Debug)]
        pub struct $scanner {
            /// Underlying HTTP client.
            http: $http_type,
            /// Gemini API key.
            api_key: SecretString,
            /// Full `generateContent` URL.
            endpoint: String,
            /// Retry schedule.
            retry: RetryPolicy,
        }

        impl $scanner {
            /// Creates a new builder with the default retry schedule.
            #[inline]
            #[must_use]
            pub fn builder() -> $builder {
                $builder {
                    api_key: None,
                    model: None,
                    base_url: None,
                    retry: RetryPolicy::default(),
                }
            }

            /// Extracts holdings from raw image bytes (JPEG, PNG or WebP).
            ///
            /// # Errors
            ///
            /// Returns [`WealthError::Scan`] once retries are exhausted or
            /// on any non-retryable failure.
            #[inline]
            #[tracing::instrument(skip_all, fields(bytes = image.len()))]
            pub $($async_kw)? fn scan(&self, image: &[u8]) -> Result<Vec<ScannedAsset>> {
                let request = build_request(BASE64.encode(image), sniff_mime(image));
                self.run(&request) $( .$await_ext )?
            }

            /// Extracts holdings from an already base64-encoded JPEG.
            ///
            /// # Errors
            ///
            /// Returns [`WealthError::Scan`] once retries are exhausted or
            /// on any non-retryable failure.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn scan_base64(&self, image_base64: &str) -> Result<Vec<ScannedAsset>> {
                let request = build_request(image_base64.to_owned(), "image/jpeg");
                self.run(&request) $( .$await_ext )?
            }

            /// Runs the request with retries and parses the answer.
            $($async_kw)? fn run(&self, request: &GenerateContentRequest) -> Result<Vec<ScannedAsset>> {
                let mut retries_done: u32 = 0;
                loop {
                    match self.attempt(request) $( .$await_ext )? {
                        Ok(text) => {
                            return parse_scanned_assets(&text).map_err(|err| {
                                tracing::warn!(error = %err, "model answer is not an asset list");
                                WealthError::Scan(SCAN_FAILED.to_owned())
                            });
                        }
                        Err(AttemptFailure::Transient(detail)) if self.retry.should_retry(retries_done) => {
                            let delay = self.retry.delay_for(retries_done);
                            retries_done += 1;
                            tracing::warn!(
                                detail = %detail,
                                retry = retries_done,
                                delay = ?delay,
                                "model busy, retrying"
                            );
                            $sleep(delay) $( .$await_ext )?;
                        }
                        Err(AttemptFailure::Transient(detail) | AttemptFailure::Fatal(detail)) => {
                            tracing::error!(detail = %detail, retries = retries_done, "statement analysis failed");
                            return Err(WealthError::Scan(SCAN_FAILED.to_owned()));
                        }
                    }
                }
            }

            /// Sends one request and returns the answer text.
            $($async_kw)? fn attempt(
                &self,
                request: &GenerateContentRequest,
            ) -> core::result::Result<String, AttemptFailure> {
                let response = self
                    .http
                    .post(&self.endpoint)
                    .header(API_KEY_HEADER, self.api_key.expose_secret())
                    .json(request)
                    .send()
                    $( .$await_ext )?
                    .map_err(|err| AttemptFailure::Fatal(format!("transport: {err}")))?;
                let status = response.status();
                let body = response
                    .text()
                    $( .$await_ext )?
                    .map_err(|err| AttemptFailure::Fatal(format!("reading body: {err}")))?;
                if !status.is_success() {
                    return Err(classify(status.as_u16(), &body));
                }
                let parsed: GenerateContentResponse = serde_json::from_str(&body)
                    .map_err(|err| AttemptFailure::Fatal(format!("response body: {err}")))?;
                let text = parsed.text();
                if text.trim().is_empty() {
                    return Err(AttemptFailure::Fatal("empty answer".to_owned()));
                }
                Ok(text)
            }
        }

    };
}

#[cfg(feature = "async")]
mod async_scanner {
    //! Async statement scanner.

    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use secrecy::{ExposeSecret as _, SecretString};

    use super::{
        API_KEY_HEADER, AttemptFailure, DEFAULT_BASE_URL, DEFAULT_MODEL, GenerateContentRequest,
        GenerateContentResponse, RetryPolicy, SCAN_FAILED, build_request, classify,
        parse_scanned_assets, sniff_mime,
    };
    use crate::error::{Result, WealthError};
    use crate::models::ScannedAsset;

    define_scanner! {
        scanner_name: StatementScanner,
        builder_name: StatementScannerBuilder,
        http_type: reqwest::Client,
        sleep: tokio::time::sleep,
        scanner_doc: "Async statement scanner.\n\nUse [`StatementScanner::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`StatementScanner`].",
        async_kw: async,
        await_kw: await,
    }
}

#[cfg(feature = "blocking")]
mod blocking_scanner {
    //! Blocking (synchronous) statement scanner.

    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use secrecy::{ExposeSecret as _, SecretString};

    use super::{
        API_KEY_HEADER, AttemptFailure, DEFAULT_BASE_URL, DEFAULT_MODEL, GenerateContentRequest,
        GenerateContentResponse, RetryPolicy, SCAN_FAILED, build_request, classify,
        parse_scanned_assets, sniff_mime,
    };
    use crate::error::{Result, WealthError};
    use crate::models::ScannedAsset;

    define_scanner! {
        scanner_name: StatementBlockingScanner,
        builder_name: StatementBlockingScannerBuilder,
        http_type: reqwest::blocking::Client,
        sleep: std::thread::sleep,
        scanner_doc: "Blocking (synchronous) statement scanner.\n\nUse [`StatementBlockingScanner::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`StatementBlockingScanner`].",
    }
}

#[cfg(feature = "async")]
pub use async_scanner::{StatementScanner, StatementScannerBuilder};
#[cfg(feature = "blocking")]
pub use blocking_scanner::{StatementBlockingScanner, StatementBlockingScannerBuilder};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssetClass, Currency};

    #[test]
    fn parses_bare_array() {
        let assets = parse_scanned_assets(
            r#"[{"category":"CASH","institution":"HSBC","amount":1200.5,"currency":"HKD"}]"#,
        )
        .unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].category, AssetClass::Cash);
    }

    #[test]
    fn parses_wrapped_array() {
        let assets = parse_scanned_assets(
            r#"{"assets":[{"category":"STOCK","institution":"CommSec","symbol":"CBA.AX","amount":50,"currency":"AUD"}]}"#,
        )
        .unwrap();
        assert_eq!(assets[0].currency, Currency::Aud);
        assert_eq!(assets[0].symbol.as_deref(), Some("CBA.AX"));
    }

    #[test]
    fn other_shapes_yield_nothing() {
        assert!(parse_scanned_assets(r#"{"items":[]}"#).unwrap().is_empty());
        assert!(parse_scanned_assets("42").unwrap().is_empty());
    }

    #[test]
    fn non_json_is_an_error() {
        assert!(parse_scanned_assets("Sure! Here are the assets").is_err());
    }

    #[test]
    fn retryable_responses_are_transient() {
        assert!(matches!(classify(429, ""), AttemptFailure::Transient(_)));
        assert!(matches!(classify(503, ""), AttemptFailure::Transient(_)));
        assert!(matches!(
            classify(500, "The model is overloaded"),
            AttemptFailure::Transient(_)
        ));
        assert!(matches!(classify(403, "bad key"), AttemptFailure::Fatal(_)));
    }

    #[test]
    fn request_puts_image_before_prompt() {
        let json = serde_json::to_value(build_request("AAAA".to_owned(), "image/jpeg")).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "AAAA");
        assert!(parts[1]["text"].as_str().unwrap().contains("Return ONLY a JSON array."));
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn mime_sniffing() {
        assert_eq!(sniff_mime(b"\x89PNG\r\n\x1a\n"), "image/png");
        assert_eq!(sniff_mime(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF]), "image/jpeg");
    }

    #[test]
    fn response_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"[1"},{"text":"]"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.text(), "[1]");
        assert_eq!(GenerateContentResponse::default().text(), "");
    }
}
