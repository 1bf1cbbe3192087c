//! Call parameters sent alongside each completion request.
//!
//! A session holds one immutable set of defaults. Each call may supply
//! overrides; [`CallParams::merged`] builds the effective set, with every
//! field present in the overrides winning over the default.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

/// Request keys owned by the session; `extra` may not set them.
pub const RESERVED_KEYS: [&str; 3] = ["model", "messages", "stream"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Passed through to the service verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CallParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_n(mut self, n: u32) -> Self {
        self.n = Some(n);
        self
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Effective parameters for one call: `overrides` win field by field,
    /// `extra` entries win key by key.
    pub fn merged(&self, overrides: &CallParams) -> CallParams {
        let mut extra = self.extra.clone();
        extra.extend(
            overrides
                .extra
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        CallParams {
            temperature: overrides.temperature.or(self.temperature),
            top_p: overrides.top_p.or(self.top_p),
            max_tokens: overrides.max_tokens.or(self.max_tokens),
            n: overrides.n.or(self.n),
            presence_penalty: overrides.presence_penalty.or(self.presence_penalty),
            frequency_penalty: overrides.frequency_penalty.or(self.frequency_penalty),
            stop: overrides.stop.clone().or_else(|| self.stop.clone()),
            user: overrides.user.clone().or_else(|| self.user.clone()),
            extra,
        }
    }

    /// Reject values the service would refuse.
    pub fn validate(&self) -> Result<()> {
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ChatError::validation("temperature", "must be between 0 and 2"));
            }
        }
        if let Some(p) = self.top_p {
            if !(0.0..=1.0).contains(&p) {
                return Err(ChatError::validation("top_p", "must be between 0 and 1"));
            }
        }
        for (field, value) in [
            ("presence_penalty", self.presence_penalty),
            ("frequency_penalty", self.frequency_penalty),
        ] {
            if value.is_some_and(|v| !(-2.0..=2.0).contains(&v)) {
                return Err(ChatError::validation(field, "must be between -2 and 2"));
            }
        }
        if self.n == Some(0) {
            return Err(ChatError::validation("n", "must be greater than 0"));
        }
        if let Some(key) = self.extra.keys().find(|k| RESERVED_KEYS.contains(&k.as_str())) {
            return Err(ChatError::validation(
                format!("params.{key}"),
                "is set by the session and cannot be overridden",
            ));
        }
        if self.max_tokens == Some(0) {
            return Err(ChatError::validation("max_tokens", "must be greater than 0"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win_on_collision() {
        let defaults = CallParams::new().with_temperature(0.2).with_max_tokens(100);
        let overrides = CallParams::new().with_temperature(0.9);
        let merged = defaults.merged(&overrides);
        assert_eq!(merged.temperature, Some(0.9));
        assert_eq!(merged.max_tokens, Some(100));
    }

    #[test]
    fn merge_leaves_defaults_untouched() {
        let defaults = CallParams::new().with_temperature(0.2);
        let _ = defaults.merged(&CallParams::new().with_temperature(1.0));
        assert_eq!(defaults.temperature, Some(0.2));
    }

    #[test]
    fn extra_keys_merge_keywise() {
        let defaults = CallParams::new()
            .with_extra("seed", serde_json::json!(1))
            .with_extra("logprobs", serde_json::json!(false));
        let overrides = CallParams::new().with_extra("seed", serde_json::json!(7));
        let merged = defaults.merged(&overrides);
        assert_eq!(merged.extra["seed"], serde_json::json!(7));
        assert_eq!(merged.extra["logprobs"], serde_json::json!(false));
    }

    #[test]
    fn serializes_only_set_fields_and_flattens_extra() {
        let params = CallParams::new()
            .with_temperature(0.5)
            .with_extra("seed", serde_json::json!(3));
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value, serde_json::json!({"temperature": 0.5, "seed": 3}));
    }

    #[test]
    fn validation_rejects_out_of_range() {
        assert!(CallParams::new().with_temperature(2.5).validate().is_err());
        assert!(CallParams::new().with_top_p(1.5).validate().is_err());
        assert!(CallParams::new().with_n(0).validate().is_err());
        assert!(CallParams::new().with_temperature(1.0).validate().is_ok());
    }

    #[test]
    fn validation_rejects_reserved_extra_keys() {
        for key in RESERVED_KEYS {
            let err = CallParams::new()
                .with_extra(key, serde_json::json!([]))
                .validate()
                .unwrap_err();
            assert!(err.to_string().contains(key), "{key}: {err}");
            assert!(err.is_user_error());
        }
        assert!(CallParams::new()
            .with_extra("seed", serde_json::json!(1))
            .validate()
            .is_ok());
    }

    #[test]
    fn stop_and_user_survive_merge_and_serialize() {
        let defaults = CallParams::new().with_stop(vec!["\n\n".into()]);
        let overrides = CallParams::new().with_user("alice");
        let merged = defaults.merged(&overrides);
        assert_eq!(merged.stop, Some(vec!["\n\n".to_string()]));
        assert_eq!(merged.user.as_deref(), Some("alice"));

        let value = serde_json::to_value(&merged).unwrap();
        assert_eq!(value, serde_json::json!({"stop": ["\n\n"], "user": "alice"}));
    }
}
