//! Event discriminator extraction.

use super::{NormalizedEvent, ReceiverError};

/// Non-empty list of event names used to select handlers.
///
/// For form-based vendors this is the value of the event-type field, so the
/// list usually holds a single name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discriminators(Vec<String>);

impl Discriminators {
    /// Build from a list of names. Returns `None` if the list is empty or any
    /// name is empty.
    pub fn new(values: Vec<String>) -> Option<Self> {
        if values.is_empty() || values.iter().any(String::is_empty) {
            return None;
        }
        Some(Self(values))
    }

    pub fn single(value: impl Into<String>) -> Option<Self> {
        Self::new(vec![value.into()])
    }

    /// The primary event name.
    pub fn first(&self) -> &str {
        &self.0[0]
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|v| v == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Display for Discriminators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

/// Reads the discriminator from a single named field of the event.
#[derive(Debug, Clone)]
pub struct FieldEventRouter {
    field: String,
}

impl FieldEventRouter {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Extract the discriminator. An absent or empty field is an error naming
    /// the field.
    pub fn route(&self, event: &NormalizedEvent) -> Result<Discriminators, ReceiverError> {
        event
            .get(&self.field)
            .and_then(Discriminators::single)
            .ok_or_else(|| ReceiverError::MissingDiscriminator {
                field: self.field.clone(),
            })
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
