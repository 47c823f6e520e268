// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mode-switched credential validation and role enforcement.

use ft_core::{ErrorKind, Principal, Role};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::BTreeSet;
use thiserror::Error;

/// Header carrying the per-request role set in `testing` mode.
pub const TEST_ROLES_HEADER: &str = "x-ft-roles";

/// How strictly credentials are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Valid bearer credential required on every request.
    Production,
    /// Credentials validated when present; absent means anonymous.
    Development,
    /// Every request runs as the synthetic mock principal.
    Debug,
    /// Like debug, but roles come from an unauthenticated header.
    Testing,
}

impl AuthMode {
    pub fn parse(s: &str) -> Option<AuthMode> {
        match s {
            "production" => Some(AuthMode::Production),
            "development" => Some(AuthMode::Development),
            "debug" => Some(AuthMode::Debug),
            "testing" => Some(AuthMode::Testing),
            _ => None,
        }
    }
}

ft_core::simple_display! {
    AuthMode {
        Production => "production",
        Development => "development",
        Debug => "debug",
        Testing => "testing",
    }
}

/// Authentication failures, mapped to the wire taxonomy.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("insufficient role: {0}")]
    Insufficient(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            AuthError::Insufficient(_) => ErrorKind::AuthInsufficient,
        }
    }
}

/// Bearer token claims issued by the identity provider.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    roles: Vec<String>,
    #[allow(dead_code)]
    exp: u64,
}

/// The credential validator handed to every request handler.
pub struct AuthGate {
    mode: AuthMode,
    decoding: Option<DecodingKey>,
    validation: Validation,
    mock_roles: BTreeSet<Role>,
}

impl AuthGate {
    pub fn new(
        mode: AuthMode,
        jwt_secret: Option<&str>,
        issuer: Option<&str>,
        mock_roles: BTreeSet<Role>,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match issuer {
            Some(issuer) => validation.set_issuer(&[issuer]),
            None => validation.iss = None,
        }
        Self {
            mode,
            decoding: jwt_secret.map(|s| DecodingKey::from_secret(s.as_bytes())),
            validation,
            mock_roles,
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Resolve the principal for a request.
    ///
    /// `bearer` is the token from the `Authorization: Bearer` header;
    /// `test_roles` is the raw `x-ft-roles` value, honoured only in
    /// testing mode.
    pub fn authenticate(
        &self,
        bearer: Option<&str>,
        test_roles: Option<&str>,
    ) -> Result<Principal, AuthError> {
        match self.mode {
            AuthMode::Production => match bearer {
                Some(token) => self.validate_token(token),
                None => Err(AuthError::Unauthenticated("missing bearer credential".to_string())),
            },
            AuthMode::Development => match bearer {
                Some(token) => self.validate_token(token),
                None => Ok(Principal::anonymous()),
            },
            AuthMode::Debug => Ok(Principal::mock(self.mock_roles.iter().copied())),
            AuthMode::Testing => {
                let roles = test_roles
                    .unwrap_or_default()
                    .split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(|name| {
                        Role::parse(name).ok_or_else(|| {
                            AuthError::Unauthenticated(format!("unknown role '{}'", name))
                        })
                    })
                    .collect::<Result<BTreeSet<Role>, _>>()?;
                Ok(Principal::mock(roles))
            }
        }
    }

    fn validate_token(&self, token: &str) -> Result<Principal, AuthError> {
        let Some(decoding) = &self.decoding else {
            return Err(AuthError::Unauthenticated(
                "no identity provider configured".to_string(),
            ));
        };
        let data = jsonwebtoken::decode::<Claims>(token, decoding, &self.validation)
            .map_err(|e| AuthError::Unauthenticated(format!("invalid credential: {}", e)))?;

        let roles = data
            .claims
            .roles
            .iter()
            .filter_map(|name| Role::parse(name))
            .collect::<BTreeSet<Role>>();
        Ok(Principal { id: data.claims.sub, roles })
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
