//! Unified error handling for rediscloud-core
//!
//! Every remote call, wait and codec operation returns [`CoreError`]. Errors
//! from the `redis-cloud` client are wrapped as they come, except a 404,
//! which is tagged with the family of the endpoint that answered it. The
//! helper predicates let callers decide between recovering (not found during
//! read/delete), polling again (retryable) and surfacing the error.
//!
//! # Example
//!
//! ```rust
//! use rediscloud_core::{CoreError, ResourceFamily};
//!
//! let err = CoreError::NotFound {
//!     family: ResourceFamily::Database,
//!     message: "Database 12 not found".to_string(),
//! };
//! assert!(err.is_not_found());
//! assert!(err.is_not_found_in(ResourceFamily::Database));
//! assert!(!err.is_not_found_in(ResourceFamily::Subscription));
//! ```

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Resource families of the Redis Cloud API. Not-found errors carry the
/// family so a missing subscription is never mistaken for a missing database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceFamily {
    Subscription,
    Database,
    FixedSubscription,
    FixedDatabase,
    FixedPlan,
    CloudAccount,
    Region,
    MaintenanceWindow,
    Pricing,
    Tag,
    AclRule,
    AclRole,
    AclUser,
    TransitGateway,
    PrivateServiceConnect,
    Backup,
    Import,
    PaymentMethod,
    Task,
}

impl fmt::Display for ResourceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceFamily::Subscription => "subscription",
            ResourceFamily::Database => "database",
            ResourceFamily::FixedSubscription => "essentials subscription",
            ResourceFamily::FixedDatabase => "essentials database",
            ResourceFamily::FixedPlan => "essentials plan",
            ResourceFamily::CloudAccount => "cloud account",
            ResourceFamily::Region => "region",
            ResourceFamily::MaintenanceWindow => "maintenance window",
            ResourceFamily::Pricing => "pricing",
            ResourceFamily::Tag => "tag",
            ResourceFamily::AclRule => "ACL rule",
            ResourceFamily::AclRole => "ACL role",
            ResourceFamily::AclUser => "ACL user",
            ResourceFamily::TransitGateway => "transit gateway",
            ResourceFamily::PrivateServiceConnect => "private service connect",
            ResourceFamily::Backup => "backup",
            ResourceFamily::Import => "import",
            ResourceFamily::PaymentMethod => "payment method",
            ResourceFamily::Task => "task",
        };
        f.write_str(name)
    }
}

/// Core error type for the Redis Cloud provider
#[derive(Error, Debug)]
pub enum CoreError {
    /// Failure reported by the Redis Cloud API client, other than a 404
    #[error(transparent)]
    Cloud(redis_cloud::CloudError),

    /// The resource no longer exists remotely
    #[error("{family} not found: {message}")]
    NotFound {
        family: ResourceFamily,
        message: String,
    },

    /// An asynchronous task finished in an error state
    #[error("Task failed: {0}")]
    TaskFailed(String),

    /// The waiter deadline elapsed
    #[error("Timed out after {timeout:?} waiting for state change (last state: {last_state})")]
    TaskTimeout {
        timeout: Duration,
        last_state: String,
    },

    /// A polled resource entered a state outside the expected pending/target sets
    #[error("Unexpected state '{state}', wanted target {target:?}")]
    UnexpectedState { state: String, target: Vec<String> },

    /// The host cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,

    /// Pre-flight validation failure
    #[error("Validation error: {0}")]
    Validation(String),

    /// Bad credentials or client settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Composite resource ID could not be parsed
    #[error("Invalid resource ID: {0}")]
    Id(String),

    /// Response body could not be decoded
    #[error("Failed to decode API response: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Shorthand used across the core crate
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Build a not-found error for a family
    pub fn not_found(family: ResourceFamily, message: impl Into<String>) -> Self {
        CoreError::NotFound {
            family,
            message: message.into(),
        }
    }

    /// Attribute a client error to the family whose endpoint produced it.
    /// Only a 404 carries the family; everything else is kept as reported.
    pub fn from_cloud(family: ResourceFamily, err: redis_cloud::CloudError) -> Self {
        match err {
            redis_cloud::CloudError::NotFound { message } => CoreError::NotFound {
                family,
                message: server_message(&message),
            },
            other => CoreError::Cloud(other),
        }
    }

    /// Returns true if this is a "not found" error (404) of any family
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound { .. })
    }

    /// Returns true if this is a "not found" error for the given family
    #[must_use]
    pub fn is_not_found_in(&self, wanted: ResourceFamily) -> bool {
        matches!(self, CoreError::NotFound { family, .. } if *family == wanted)
    }

    /// Returns true if this is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        match self {
            CoreError::Cloud(e) => {
                e.is_server_error()
                    || matches!(e, redis_cloud::CloudError::ApiError { code, .. } if *code >= 500)
            }
            _ => false,
        }
    }

    /// Task or waiter deadline elapsed
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            CoreError::TaskTimeout { .. } => true,
            CoreError::Cloud(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns true if the host cancelled the operation
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CoreError::Cancelled)
    }

    /// Returns true if this is a bad request error (400) or a local validation failure
    #[must_use]
    pub fn is_bad_request(&self) -> bool {
        match self {
            CoreError::Cloud(e) => e.is_bad_request(),
            CoreError::Validation(_) | CoreError::Id(_) => true,
            _ => false,
        }
    }

    /// Returns true if the waiter should keep polling after this error
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            // A body that fails to decode will not decode on the next poll either
            CoreError::Cloud(redis_cloud::CloudError::ConnectionError(msg))
                if msg.starts_with("Failed to deserialize") =>
            {
                false
            }
            CoreError::Cloud(e) => e.is_retryable() || self.is_server_error(),
            _ => false,
        }
    }
}

/// Attach a [`ResourceFamily`] to results coming straight from the API client
pub trait InFamily<T> {
    fn in_family(self, family: ResourceFamily) -> Result<T>;
}

impl<T> InFamily<T> for std::result::Result<T, redis_cloud::CloudError> {
    fn in_family(self, family: ResourceFamily) -> Result<T> {
        self.map_err(|e| CoreError::from_cloud(family, e))
    }
}

/// Pull the human-readable message out of an API error body
fn server_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["description", "message", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(serde_json::Value::as_str))
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis_cloud::CloudError;

    #[test]
    fn test_not_found_is_scoped_to_family() {
        let err = CoreError::not_found(ResourceFamily::AclUser, "User 7 not found");

        assert!(err.is_not_found());
        assert!(err.is_not_found_in(ResourceFamily::AclUser));
        assert!(!err.is_not_found_in(ResourceFamily::AclRule));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_client_404_takes_the_endpoint_family() {
        let err = CoreError::from_cloud(
            ResourceFamily::Pricing,
            CloudError::NotFound {
                message: r#"{"status":404,"description":"Pricing for subscription 77 not found"}"#
                    .to_string(),
            },
        );
        assert!(err.is_not_found_in(ResourceFamily::Pricing));
        assert!(!err.is_not_found_in(ResourceFamily::Subscription));
        assert_eq!(
            err.to_string(),
            "pricing not found: Pricing for subscription 77 not found"
        );
    }

    #[test]
    fn test_in_family_keeps_plain_text_body() {
        let result: std::result::Result<(), CloudError> = Err(CloudError::NotFound {
            message: "no such user".to_string(),
        });
        match result.in_family(ResourceFamily::AclUser) {
            Err(CoreError::NotFound { family, message }) => {
                assert_eq!(family, ResourceFamily::AclUser);
                assert_eq!(message, "no such user");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_server_errors_are_retryable() {
        let unavailable = CoreError::from_cloud(
            ResourceFamily::Subscription,
            CloudError::ServiceUnavailable {
                message: "try later".to_string(),
            },
        );
        assert!(unavailable.is_server_error());
        assert!(unavailable.is_retryable());

        let gateway = CoreError::Cloud(CloudError::ApiError {
            code: 502,
            message: "Bad Gateway".to_string(),
        });
        assert!(gateway.is_server_error());
        assert!(gateway.is_retryable());
        assert!(!gateway.is_not_found());
    }

    #[test]
    fn test_rate_limit_is_retryable_but_other_4xx_are_not() {
        let limited = CoreError::Cloud(CloudError::RateLimited {
            message: "Too many requests".to_string(),
        });
        assert!(limited.is_retryable());

        let bad = CoreError::Cloud(CloudError::BadRequest {
            message: "SUBSCRIPTION_NOT_ACTIVE".to_string(),
        });
        assert!(!bad.is_retryable());
        assert!(bad.is_bad_request());
    }

    #[test]
    fn test_decode_failures_are_not_retried() {
        let err = CoreError::Cloud(CloudError::ConnectionError(
            "Failed to deserialize field 'status': invalid type".to_string(),
        ));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_timeout_carries_last_state() {
        let err = CoreError::TaskTimeout {
            timeout: Duration::from_secs(600),
            last_state: "pending".to_string(),
        };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("last state: pending"));
    }

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = CoreError::Validation("creation_plan is required".to_string());
        assert!(err.is_bad_request());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_display_keeps_server_message() {
        let err = CoreError::Cloud(CloudError::ApiError {
            code: 409,
            message: "Subscription 12 is not in active state".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "API error (409): Subscription 12 is not in active state"
        );
    }
}
