pub mod db_errors;
pub mod pagination;

use serde::{Deserialize, Deserializer, Serialize};

/// Distinguishes an absent field from an explicit `null` in PATCH bodies.
///
/// Use with `#[serde(default, deserialize_with = "deserialize_some")]` on an
/// `Option<Option<T>>`: missing keeps `None`, `null` becomes `Some(None)`.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Trim a string and return `None` when nothing is left
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Per-item outcome of a bulk operation. Items are processed independently
/// and successes are kept when others fail.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkOutcome {
    pub succeeded: Vec<i32>,
    pub failed: Vec<BulkFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkFailure {
    pub id: i32,
    pub error: String,
}

impl BulkOutcome {
    pub fn success(&mut self, id: i32) {
        self.succeeded.push(id);
    }

    pub fn failure(&mut self, id: i32, error: impl Into<String>) {
        self.failed.push(BulkFailure {
            id,
            error: error.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "deserialize_some")]
        notes: Option<Option<String>>,
    }

    #[test]
    fn missing_and_null_are_distinct() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.notes, None);

        let null: Patch = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert_eq!(null.notes, Some(None));

        let set: Patch = serde_json::from_str(r#"{"notes": "vegan"}"#).unwrap();
        assert_eq!(set.notes, Some(Some("vegan".to_string())));
    }

    #[test]
    fn non_empty_trims() {
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some(" a ".into())), Some("a".into()));
        assert_eq!(non_empty(None), None);
    }
}
