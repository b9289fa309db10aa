use std::sync::Arc;

use crate::error::{EngineError, Result};

/// Host-supplied key source, e.g. an interactive key picker.
pub trait CredentialBroker: Send + Sync {
    fn credential(&self) -> Option<String>;
}

/// Resolves the API key: environment first, then the broker, then a
/// persisted value from settings.
#[derive(Clone)]
pub struct CredentialChain {
    env_keys: Vec<String>,
    broker: Option<Arc<dyn CredentialBroker>>,
    persisted: Option<String>,
}

impl CredentialChain {
    pub fn new() -> Self {
        Self {
            env_keys: vec!["GEMINI_API_KEY".to_string(), "GOOGLE_API_KEY".to_string()],
            broker: None,
            persisted: None,
        }
    }

    /// A chain that only ever yields `key`.
    pub fn fixed(key: impl Into<String>) -> Self {
        Self {
            env_keys: Vec::new(),
            broker: None,
            persisted: Some(key.into()),
        }
    }

    pub fn with_env_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.env_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_broker(mut self, broker: Arc<dyn CredentialBroker>) -> Self {
        self.broker = Some(broker);
        self
    }

    pub fn with_persisted(mut self, key: Option<String>) -> Self {
        self.persisted = key;
        self
    }

    pub fn credential(&self) -> Option<String> {
        self.env_keys
            .iter()
            .find_map(|key| non_empty(std::env::var(key).ok()))
            .or_else(|| {
                self.broker
                    .as_ref()
                    .and_then(|broker| non_empty(broker.credential()))
            })
            .or_else(|| non_empty(self.persisted.clone()))
    }

    pub fn has_credential(&self) -> bool {
        self.credential().is_some()
    }

    pub fn require(&self) -> Result<String> {
        self.credential().ok_or_else(|| {
            let mut sources: Vec<&str> = self.env_keys.iter().map(String::as_str).collect();
            if self.broker.is_some() {
                sources.push("key broker");
            }
            sources.push("saved settings");
            EngineError::Configuration(format!(
                "no API key available (checked {})",
                sources.join(", ")
            ))
        })
    }
}

impl Default for CredentialChain {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CredentialChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialChain")
            .field("env_keys", &self.env_keys)
            .field("broker", &self.broker.is_some())
            .field("persisted", &self.persisted.is_some())
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticBroker(Option<&'static str>);

    impl CredentialBroker for StaticBroker {
        fn credential(&self) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    // Env keys are unique per test so parallel tests never race on them.
    fn chain(env_key: &str) -> CredentialChain {
        CredentialChain::new().with_env_keys([env_key])
    }

    #[test]
    fn broker_wins_over_persisted_value() {
        let chain = chain("MOCKUP_TEST_KEY_UNSET_A")
            .with_broker(Arc::new(StaticBroker(Some("from-broker"))))
            .with_persisted(Some("saved".to_string()));
        assert_eq!(chain.credential().as_deref(), Some("from-broker"));
    }

    #[test]
    fn blank_sources_fall_through() {
        let chain = chain("MOCKUP_TEST_KEY_UNSET_B")
            .with_broker(Arc::new(StaticBroker(Some("   "))))
            .with_persisted(Some(" saved ".to_string()));
        assert_eq!(chain.credential().as_deref(), Some("saved"));
    }

    #[test]
    fn environment_comes_first() {
        std::env::set_var("MOCKUP_TEST_KEY_SET_C", "from-env");
        let chain = chain("MOCKUP_TEST_KEY_SET_C")
            .with_broker(Arc::new(StaticBroker(Some("from-broker"))));
        assert_eq!(chain.credential().as_deref(), Some("from-env"));
        std::env::remove_var("MOCKUP_TEST_KEY_SET_C");
    }

    #[test]
    fn require_names_the_sources_it_checked() {
        let chain = chain("MOCKUP_TEST_KEY_UNSET_D").with_broker(Arc::new(StaticBroker(None)));
        assert!(!chain.has_credential());
        match chain.require() {
            Err(EngineError::Configuration(message)) => {
                assert!(message.contains("MOCKUP_TEST_KEY_UNSET_D"));
                assert!(message.contains("key broker"));
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
        assert_eq!(CredentialChain::fixed("k").require().ok().as_deref(), Some("k"));
    }
}
