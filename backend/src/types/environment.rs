//! Environment configuration for different deployment stages

use std::env;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};
use tracing::Level;

/// Default lifetime of presigned attachment upload URLs (5 minutes)
const DEFAULT_SIGNED_URL_EXPIRY_SECS: u64 = 5 * 60;

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack`)
    Development {
        /// Trust the bearer token as the user ID without verifying it
        disable_auth: bool,
    },
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => {
                let disable_auth = env::var("DISABLE_AUTH")
                    .is_ok_and(|val| matches!(val.trim(), "true" | "1"));

                Self::Development { disable_auth }
            }
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Whether the process was started by the AWS Lambda runtime
    #[must_use]
    pub fn running_on_lambda() -> bool {
        env::var("AWS_LAMBDA_RUNTIME_API").is_ok()
    }

    /// Reads a variable that deployed stages must set, with a fallback for development
    fn required_var(&self, name: &str, development_default: &str) -> String {
        match self {
            Self::Production | Self::Staging => {
                env::var(name).unwrap_or_else(|_| panic!("{name} environment variable is not set"))
            }
            Self::Development { .. } => {
                env::var(name).unwrap_or_else(|_| development_default.to_string())
            }
        }
    }

    /// Returns the `DynamoDB` todo table name
    ///
    /// # Panics
    ///
    /// Panics if `TODOS_TABLE` is not set outside development
    #[must_use]
    pub fn todos_table(&self) -> String {
        self.required_var("TODOS_TABLE", "todos")
    }

    /// Returns the name of the GSI keyed by `userId`
    ///
    /// # Panics
    ///
    /// Panics if `TODOS_BY_USER_INDEX` is not set outside development
    #[must_use]
    pub fn todos_by_user_index(&self) -> String {
        self.required_var("TODOS_BY_USER_INDEX", "user-id-index")
    }

    /// Returns the S3 bucket name for attachments
    ///
    /// # Panics
    ///
    /// Panics if `ATTACHMENTS_S3_BUCKET` is not set outside development
    #[must_use]
    pub fn attachments_bucket(&self) -> String {
        self.required_var("ATTACHMENTS_S3_BUCKET", "todo-attachments")
    }

    /// Presigned upload URL expiry time in seconds
    #[must_use]
    pub fn signed_url_expiry_secs(&self) -> u64 {
        env::var("SIGNED_URL_EXPIRATION")
            .ok()
            .and_then(|val| val.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_SIGNED_URL_EXPIRY_SECS)
    }

    /// URL of the identity provider's JSON Web Key Set
    #[must_use]
    pub fn jwks_url(&self) -> Option<String> {
        env::var("AUTH0_JWKS_URL").ok().filter(|url| !url.is_empty())
    }

    /// Expected `aud` claim, if any
    #[must_use]
    pub fn jwt_audience(&self) -> Option<String> {
        env::var("AUTH0_AUDIENCE").ok().filter(|aud| !aud.is_empty())
    }

    /// Expected `iss` claim, if any
    #[must_use]
    pub fn jwt_issuer(&self) -> Option<String> {
        env::var("AUTH0_ISSUER").ok().filter(|iss| !iss.is_empty())
    }

    /// Whether token verification is skipped (development only)
    #[must_use]
    pub const fn disable_auth(&self) -> bool {
        matches!(self, Self::Development { disable_auth: true })
    }

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development { .. } | Self::Staging)
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub const fn override_aws_endpoint_url(&self) -> Option<&str> {
        match self {
            Self::Production | Self::Staging => None,
            Self::Development { .. } => Some("http://localhost:4566"),
        }
    }

    /// AWS configuration with retry and timeout settings
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(50));

        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(30))
            .build();

        let mut config_builder = aws_config::load_defaults(BehaviorVersion::latest())
            .await
            .to_builder()
            .retry_config(retry_config)
            .timeout_config(timeout_config);

        if let Some(endpoint_url) = self.override_aws_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.build()
    }

    /// AWS S3 service configuration
    pub async fn s3_client_config(&self) -> aws_sdk_s3::Config {
        let aws_config = self.aws_config().await;
        let s3_config: aws_sdk_s3::Config = (&aws_config).into();
        let mut builder = s3_config.to_builder();

        // LocalStack only supports path style addressing
        // https://github.com/awslabs/aws-sdk-rust/discussions/874
        if matches!(self, Self::Development { .. }) {
            builder.set_force_path_style(Some(true));
        }

        builder.build()
    }

    /// Default log level when `RUST_LOG` is not set
    #[must_use]
    pub fn tracing_level(&self) -> Level {
        env::var("TRACING_LEVEL")
            .ok()
            .and_then(|val| val.parse::<Level>().ok())
            .unwrap_or(match self {
                Self::Production | Self::Staging => Level::INFO,
                Self::Development { .. } => Level::DEBUG,
            })
    }
}
