use crate::booking::EndpointResponse;
use serde_json::Value;

/// Decides whether a 2xx reply from the endpoint means the booking went through.
pub trait SuccessClassifier: Send + Sync {
    fn is_success(&self, response: &EndpointResponse) -> bool;
}

/// Substring match on the raw body. This is what the endpoint has always been
/// checked with; it also accepts any body that happens to contain the marker.
#[derive(Debug, Clone)]
pub struct LegacyMarkerClassifier {
    marker: String,
}

impl LegacyMarkerClassifier {
    pub fn new(marker: &str) -> Self {
        Self {
            marker: marker.to_string(),
        }
    }
}

impl Default for LegacyMarkerClassifier {
    fn default() -> Self {
        Self::new("200")
    }
}

impl SuccessClassifier for LegacyMarkerClassifier {
    fn is_success(&self, response: &EndpointResponse) -> bool {
        response.body.contains(&self.marker)
    }
}

/// Parses the body as a JSON object and compares one top-level field to the
/// expected value, accepting either a number or a string.
#[derive(Debug, Clone)]
pub struct StructuredFieldClassifier {
    field: String,
    expected: String,
}

impl StructuredFieldClassifier {
    pub fn new(field: &str, expected: &str) -> Self {
        Self {
            field: field.to_string(),
            expected: expected.to_string(),
        }
    }
}

impl SuccessClassifier for StructuredFieldClassifier {
    fn is_success(&self, response: &EndpointResponse) -> bool {
        let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(&response.body) else {
            return false;
        };
        match obj.get(&self.field) {
            Some(Value::String(s)) => s.trim() == self.expected,
            Some(Value::Number(n)) => n.to_string() == self.expected,
            _ => false,
        }
    }
}
