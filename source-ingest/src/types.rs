//! Core types for the source-ingest crate.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subscription_sync::ProjectId;

use crate::error::SourceConfigError;

/// Unique identifier for a source.
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub String);

impl SourceId {
    /// Create a new source ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the source ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Provider family of a pub/sub source.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Amazon SQS queue
    Sqs,
    /// Google Cloud Pub/Sub subscription
    Google,
    /// Kafka topic consumed through a consumer group
    Kafka,
    /// AMQP (RabbitMQ) queue
    Amqp,
}

impl SourceType {
    /// Lowercase provider name, as used in logs
    pub fn name(&self) -> &'static str {
        match self {
            SourceType::Sqs => "sqs",
            SourceType::Google => "google",
            SourceType::Kafka => "kafka",
            SourceType::Amqp => "amqp",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Provider address and credentials, one variant per [`SourceType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderSettings {
    /// SQS queue
    Sqs {
        queue_name: String,
        region: String,
        access_key_id: String,
        secret_key: String,
    },
    /// Google Pub/Sub subscription
    Google {
        project_id: String,
        subscription_id: String,
        /// Service account JSON
        service_account: String,
    },
    /// Kafka topic
    Kafka {
        brokers: Vec<String>,
        topic: String,
        consumer_group_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auth: Option<KafkaAuth>,
    },
    /// AMQP queue
    Amqp {
        host: String,
        port: u16,
        queue: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auth: Option<AmqpAuth>,
    },
}

/// SASL credentials for Kafka
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KafkaAuth {
    pub mechanism: String,
    pub username: String,
    pub password: String,
}

/// Plain credentials for AMQP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmqpAuth {
    pub user: String,
    pub password: String,
}

impl ProviderSettings {
    /// The provider family these settings belong to
    pub fn source_type(&self) -> SourceType {
        match self {
            ProviderSettings::Sqs { .. } => SourceType::Sqs,
            ProviderSettings::Google { .. } => SourceType::Google,
            ProviderSettings::Kafka { .. } => SourceType::Kafka,
            ProviderSettings::Amqp { .. } => SourceType::Amqp,
        }
    }

    fn validate(&self) -> Result<(), SourceConfigError> {
        let provider = self.source_type();
        let require = |field: &'static str, value: &str| {
            if value.trim().is_empty() {
                Err(SourceConfigError::MissingField { provider, field })
            } else {
                Ok(())
            }
        };

        match self {
            ProviderSettings::Sqs {
                queue_name,
                region,
                access_key_id,
                secret_key,
            } => {
                require("queue_name", queue_name)?;
                require("region", region)?;
                require("access_key_id", access_key_id)?;
                require("secret_key", secret_key)
            }
            ProviderSettings::Google {
                project_id,
                subscription_id,
                service_account,
            } => {
                require("project_id", project_id)?;
                require("subscription_id", subscription_id)?;
                require("service_account", service_account)
            }
            ProviderSettings::Kafka {
                brokers,
                topic,
                consumer_group_id,
                ..
            } => {
                if brokers.iter().all(|broker| broker.trim().is_empty()) {
                    return Err(SourceConfigError::MissingField {
                        provider,
                        field: "brokers",
                    });
                }
                require("topic", topic)?;
                require("consumer_group_id", consumer_group_id)
            }
            ProviderSettings::Amqp { host, queue, .. } => {
                require("host", host)?;
                require("queue", queue)
            }
        }
    }
}

/// Consumer configuration of a pub/sub source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubSubConfig {
    /// Number of independent polling workers
    pub workers: u32,
    /// Provider address and credentials
    pub provider: ProviderSettings,
}

impl PubSubConfig {
    /// Create a config with `workers` workers
    pub fn new(workers: u32, provider: ProviderSettings) -> Self {
        Self { workers, provider }
    }

    /// Reject configs an adapter cannot be built from
    pub fn validate(&self) -> Result<(), SourceConfigError> {
        if self.workers == 0 {
            return Err(SourceConfigError::InvalidWorkerCount(self.workers));
        }
        self.provider.validate()
    }

    /// Lowercase hex SHA-256 of the JSON encoding
    ///
    /// Any change to workers, address or credentials changes the hash.
    pub fn content_hash(&self) -> String {
        let encoded = match serde_json::to_vec(self) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode source config, hashing debug form");
                format!("{self:?}").into_bytes()
            }
        };
        hex::encode(Sha256::digest(&encoded))
    }
}

/// A configured inbound pub/sub source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Unique identifier
    pub uid: SourceId,
    /// Owning project
    pub project_id: ProjectId,
    /// Human-readable name
    pub name: String,
    /// Consumer configuration
    pub config: PubSubConfig,
    /// Last modification time in storage
    pub updated_at: DateTime<Utc>,
}

impl Source {
    /// Create a source
    pub fn new(
        uid: impl Into<SourceId>,
        project_id: impl Into<ProjectId>,
        config: PubSubConfig,
    ) -> Self {
        Self {
            uid: uid.into(),
            project_id: project_id.into(),
            name: String::new(),
            config,
            updated_at: Utc::now(),
        }
    }

    /// Set the source name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Provider family
    pub fn source_type(&self) -> SourceType {
        self.config.provider.source_type()
    }

    /// Fingerprint of the consumer configuration
    pub fn content_hash(&self) -> String {
        self.config.content_hash()
    }

    /// Configured worker count
    pub fn workers(&self) -> usize {
        self.config.workers as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqs(queue: &str) -> ProviderSettings {
        ProviderSettings::Sqs {
            queue_name: queue.to_string(),
            region: "eu-west-1".to_string(),
            access_key_id: "AKIA".to_string(),
            secret_key: "secret".to_string(),
        }
    }

    #[test]
    fn test_hash_is_stable_and_hex() {
        let a = PubSubConfig::new(3, sqs("orders"));
        let b = PubSubConfig::new(3, sqs("orders"));

        assert_eq!(a.content_hash(), b.content_hash());
        assert_eq!(a.content_hash().len(), 64);
        assert!(a.content_hash().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_hash_tracks_every_field() {
        let base = PubSubConfig::new(3, sqs("orders"));

        assert_ne!(base.content_hash(), PubSubConfig::new(4, sqs("orders")).content_hash());
        assert_ne!(base.content_hash(), PubSubConfig::new(3, sqs("refunds")).content_hash());
    }

    #[test]
    fn test_source_hash_ignores_name() {
        let a = Source::new("src-1", "p1", PubSubConfig::new(1, sqs("q"))).with_name("one");
        let b = Source::new("src-1", "p1", PubSubConfig::new(1, sqs("q"))).with_name("two");
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_validate() {
        assert!(PubSubConfig::new(1, sqs("q")).validate().is_ok());
        assert_eq!(
            PubSubConfig::new(0, sqs("q")).validate(),
            Err(SourceConfigError::InvalidWorkerCount(0))
        );
        assert_eq!(
            PubSubConfig::new(1, sqs(" ")).validate(),
            Err(SourceConfigError::MissingField {
                provider: SourceType::Sqs,
                field: "queue_name"
            })
        );

        let kafka = ProviderSettings::Kafka {
            brokers: vec![],
            topic: "t".to_string(),
            consumer_group_id: "g".to_string(),
            auth: None,
        };
        assert!(matches!(
            PubSubConfig::new(1, kafka).validate(),
            Err(SourceConfigError::MissingField { field: "brokers", .. })
        ));
    }

    #[test]
    fn test_settings_serde_tag() {
        let json = serde_json::to_value(sqs("q")).unwrap();
        assert_eq!(json["type"], "sqs");
        assert_eq!(sqs("q").source_type(), SourceType::Sqs);
        assert_eq!(SourceType::Google.to_string(), "google");
    }
}
