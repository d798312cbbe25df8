//! Serde utilities for persisted session records.

/// Optional token stored as a JSON string or `null`.
///
/// A blank string decodes as no token, matching how a signed-out record is
/// written by older clients.
pub mod optional_token {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::domain::entities::AuthToken;

    /// Serializes the token as its raw string, or `null` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the serializer fails.
    pub fn serialize<S>(value: &Option<AuthToken>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.serialize(serializer)
    }

    /// Deserializes a token from a string or `null`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is neither a string nor `null`.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<AuthToken>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.and_then(AuthToken::new))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use crate::domain::entities::AuthToken;

    #[derive(Debug, Serialize, Deserialize)]
    struct Record {
        #[serde(default, with = "super::optional_token")]
        token: Option<AuthToken>,
    }

    #[test]
    fn test_token_from_string() {
        let record: Record = serde_json::from_str(r#"{"token":"abc"}"#).unwrap();
        assert_eq!(record.token.unwrap().as_str(), "abc");
    }

    #[test]
    fn test_null_blank_and_missing_tokens() {
        for json in [r#"{"token":null}"#, r#"{"token":"  "}"#, "{}"] {
            let record: Record = serde_json::from_str(json).unwrap();
            assert!(record.token.is_none(), "{json}");
        }
    }

    #[test]
    fn test_non_string_token_is_an_error() {
        assert!(serde_json::from_str::<Record>(r#"{"token":42}"#).is_err());
    }

    #[test]
    fn test_absent_token_serializes_as_null() {
        let json = serde_json::to_string(&Record { token: None }).unwrap();
        assert_eq!(json, r#"{"token":null}"#);
    }
}
