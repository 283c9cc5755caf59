use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Configuration that can change while the service runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceConfig {
    pub confidence_threshold: f32,
    pub classes: Vec<String>,
}

/// Partial update; absent fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigUpdate {
    #[serde(default, deserialize_with = "number_or_numeric_string")]
    pub confidence_threshold: Option<f32>,
    #[serde(default)]
    pub classes: Option<Vec<String>>,
}

fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Threshold {
        Number(f64),
        Text(String),
    }

    match Option::<Threshold>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Threshold::Number(n)) => Ok(Some(n as f32)),
        Some(Threshold::Text(s)) => s.trim().parse::<f32>().map(Some).map_err(|_| {
            de::Error::custom(format!("confidence_threshold must be numeric, got {:?}", s))
        }),
    }
}

#[derive(Debug)]
pub struct ConfigStore {
    inner: RwLock<ServiceConfig>,
}

impl ConfigStore {
    pub fn new(initial: ServiceConfig) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    /// Snapshot of the current configuration.
    pub fn get(&self) -> ServiceConfig {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Apply the fields present in `update` and return the resulting configuration.
    ///
    /// Values are stored as given, including thresholds outside `[0, 1]`.
    pub fn update(&self, update: ConfigUpdate) -> ServiceConfig {
        let mut config = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(threshold) = update.confidence_threshold {
            tracing::info!(
                old = config.confidence_threshold,
                new = threshold,
                "Confidence threshold updated"
            );
            config.confidence_threshold = threshold;
        }
        if let Some(classes) = update.classes {
            tracing::info!(?classes, "Class taxonomy updated");
            config.classes = classes;
        }

        config.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ConfigStore {
        ConfigStore::new(ServiceConfig {
            confidence_threshold: 0.5,
            classes: vec!["Bad Sitting Posture".into(), "Good Sitting Posture".into()],
        })
    }

    fn parse(json: &str) -> Result<ConfigUpdate, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn threshold_update_leaves_classes_unchanged() {
        let store = store();
        let before = store.get();

        let after = store.update(parse(r#"{"confidence_threshold": 0.7}"#).unwrap());

        assert_eq!(after.confidence_threshold, 0.7);
        assert_eq!(after.classes, before.classes);
        assert_eq!(store.get(), after);
    }

    #[test]
    fn classes_update_leaves_threshold_unchanged() {
        let store = store();
        let after = store.update(parse(r#"{"classes": ["slouch", "upright", "away"]}"#).unwrap());

        assert_eq!(after.confidence_threshold, 0.5);
        assert_eq!(after.classes, vec!["slouch", "upright", "away"]);
    }

    #[test]
    fn empty_update_is_a_no_op() {
        let store = store();
        let before = store.get();
        assert_eq!(store.update(parse("{}").unwrap()), before);
    }

    #[test]
    fn numeric_string_threshold_is_coerced() {
        assert_eq!(
            parse(r#"{"confidence_threshold": "0.7"}"#).unwrap().confidence_threshold,
            Some(0.7)
        );
        assert_eq!(
            parse(r#"{"confidence_threshold": " 1 "}"#).unwrap().confidence_threshold,
            Some(1.0)
        );
    }

    #[test]
    fn non_numeric_threshold_is_rejected() {
        let err = parse(r#"{"confidence_threshold": "high"}"#).unwrap_err();
        assert!(err.to_string().contains("must be numeric"));
        assert!(parse(r#"{"confidence_threshold": [0.5]}"#).is_err());
    }

    #[test]
    fn out_of_range_threshold_is_stored_as_is() {
        let store = store();
        assert_eq!(
            store
                .update(parse(r#"{"confidence_threshold": 1.5}"#).unwrap())
                .confidence_threshold,
            1.5
        );
        assert_eq!(
            store
                .update(parse(r#"{"confidence_threshold": -2}"#).unwrap())
                .confidence_threshold,
            -2.0
        );
    }

    #[test]
    fn null_threshold_is_ignored() {
        assert_eq!(
            parse(r#"{"confidence_threshold": null}"#).unwrap(),
            ConfigUpdate::default()
        );
    }
}
