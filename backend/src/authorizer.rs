//! API Gateway custom (TOKEN) authorizer
//!
//! The gateway calls this function with the raw `Authorization` header before routing a
//! request. It answers with an IAM policy that lets the request through when the bearer
//! token verifies, and denies it otherwise.

use serde::{Deserialize, Serialize};

use crate::jwt::JwtVerifier;

/// IAM policy language version
const POLICY_VERSION: &str = "2012-10-17";

/// Action granted or denied by the policy
const INVOKE_ACTION: &str = "execute-api:Invoke";

/// Principal reported for denied requests
const ANONYMOUS_PRINCIPAL: &str = "user";

/// Event sent by API Gateway to a TOKEN authorizer
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerRequest {
    /// Always `TOKEN` for this authorizer type
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Raw `Authorization` header value
    #[serde(default)]
    pub authorization_token: Option<String>,
    /// ARN of the method being invoked
    #[serde(default)]
    pub method_arn: Option<String>,
}

/// Response expected by API Gateway from a TOKEN authorizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerResponse {
    /// User the request is attributed to
    pub principal_id: String,
    /// Policy applied to the request
    pub policy_document: PolicyDocument,
}

/// IAM policy document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    /// Policy language version
    pub version: String,
    /// Policy statements
    pub statement: Vec<PolicyStatement>,
}

/// Single IAM policy statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    /// Action the statement applies to
    pub action: String,
    /// Allow or deny
    pub effect: PolicyEffect,
    /// Resource the statement applies to
    pub resource: String,
}

/// IAM statement effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PolicyEffect {
    /// Let the request through
    Allow,
    /// Reject the request
    Deny,
}

impl AuthorizerResponse {
    fn with_effect(principal_id: String, effect: PolicyEffect) -> Self {
        Self {
            principal_id,
            policy_document: PolicyDocument {
                version: POLICY_VERSION.to_string(),
                statement: vec![PolicyStatement {
                    action: INVOKE_ACTION.to_string(),
                    effect,
                    resource: "*".to_string(),
                }],
            },
        }
    }

    /// Allow policy for `principal_id`
    #[must_use]
    pub fn allow(principal_id: String) -> Self {
        Self::with_effect(principal_id, PolicyEffect::Allow)
    }

    /// Deny policy for an unidentified caller
    #[must_use]
    pub fn deny() -> Self {
        Self::with_effect(ANONYMOUS_PRINCIPAL.to_string(), PolicyEffect::Deny)
    }
}

/// Verifies the request's bearer token and builds the matching policy
///
/// Verification failures deny the request; they are never surfaced as errors.
#[tracing::instrument(skip_all, fields(method_arn = request.method_arn.as_deref()))]
pub async fn authorize(verifier: &JwtVerifier, request: &AuthorizerRequest) -> AuthorizerResponse {
    tracing::info!("Authorizing a user");

    match verifier
        .verify_authorization_header(request.authorization_token.as_deref())
        .await
    {
        Ok(claims) => {
            tracing::info!(principal_id = %claims.sub, "User was authorized");
            AuthorizerResponse::allow(claims.sub)
        }
        Err(err) => {
            tracing::warn!(error = %err, "User not authorized");
            AuthorizerResponse::deny()
        }
    }
}
