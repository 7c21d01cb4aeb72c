//! Form payload decoding.

use percent_encoding::percent_decode_str;
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::ReceiverError;

/// Media type MailChimp uses for deliveries.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Decoded WebHook payload.
///
/// Keeps every `(key, value)` pair in arrival order. Single-value lookups
/// return the last occurrence of a key. Serializes as a JSON object using
/// the same last-wins rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedEvent {
    pairs: Vec<(String, String)>,
}

impl NormalizedEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Last value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value recorded for `key`, in arrival order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// All pairs in arrival order, duplicates included.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Distinct keys in order of first appearance.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for (key, _) in &self.pairs {
            if !keys.contains(&key.as_str()) {
                keys.push(key.as_str());
            }
        }
        keys
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Serialize for NormalizedEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let keys = self.keys();
        let mut map = serializer.serialize_map(Some(keys.len()))?;
        for key in keys {
            map.serialize_entry(key, &self.get(key))?;
        }
        map.end()
    }
}

/// Decodes `application/x-www-form-urlencoded` bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormPayloadReader;

impl FormPayloadReader {
    pub fn new() -> Self {
        Self
    }

    /// Decode a form body.
    ///
    /// The content type must be form data; parameters such as `charset` are
    /// ignored. The body must be UTF-8 and every percent escape must decode to
    /// valid UTF-8. Unknown keys are kept.
    pub fn decode(
        &self,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<NormalizedEvent, ReceiverError> {
        if !is_form_content_type(content_type) {
            return Err(ReceiverError::UnsupportedContentType {
                content_type: content_type.map(str::to_string),
            });
        }

        let text = std::str::from_utf8(body).map_err(|e| ReceiverError::MalformedBody {
            message: format!("body is not valid UTF-8 after byte {}", e.valid_up_to()),
        })?;

        let mut event = NormalizedEvent::new();
        for pair in text.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            event.push(decode_component(key)?, decode_component(value)?);
        }

        Ok(event)
    }
}

/// Decode one key or value: `+` is a space and every escape must form UTF-8.
fn decode_component(raw: &str) -> Result<String, ReceiverError> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| ReceiverError::MalformedBody {
            message: format!(
                "percent-encoded data is not valid UTF-8 after byte {}",
                e.valid_up_to()
            ),
        })
}

fn is_form_content_type(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|value| value.split(';').next())
        .map(|media_type| media_type.trim().eq_ignore_ascii_case(FORM_URLENCODED))
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
