use anyhow::{anyhow, Result};
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::domain::identity::Identity;

const TOKEN_TYPE: &str = "access";

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// Verifies the bearer tokens minted by the identity provider.
///
/// Tokens are PASETO v4.local, sealed with a key shared with the provider.
/// The subject claim carries the user id.
#[derive(Clone)]
pub struct TokenAuthority {
    key: [u8; 32],
    issuer: String,
    ttl_minutes: u64,
}

impl TokenAuthority {
    pub fn new(key: [u8; 32], issuer: impl Into<String>, ttl_minutes: u64) -> Self {
        Self {
            key,
            issuer: issuer.into(),
            ttl_minutes,
        }
    }

    pub fn issue(&self, user_id: Uuid) -> Result<IssuedToken> {
        let duration = std::time::Duration::from_secs(self.ttl_minutes * 60);
        let mut claims = Claims::new_expires_in(&duration)?;
        claims.issuer(&self.issuer)?;
        claims.audience(&self.issuer)?;
        claims.subject(&user_id.to_string())?;
        claims.add_additional("typ", TOKEN_TYPE)?;

        let key = SymmetricKey::<V4>::from(&self.key)?;
        let token = local::encrypt(&key, &claims, None, None)?;
        let ttl_minutes = i64::try_from(self.ttl_minutes)?;
        Ok(IssuedToken {
            token,
            expires_at: OffsetDateTime::now_utc() + Duration::minutes(ttl_minutes),
        })
    }

    /// Resolves a bearer token. Anything that does not decrypt and validate
    /// resolves to [`Identity::Anonymous`].
    pub fn resolve(&self, token: &str) -> Identity {
        let Some(claims) = self.decrypt_claims(token) else {
            return Identity::Anonymous;
        };
        if !has_token_type(&claims, TOKEN_TYPE) {
            return Identity::Anonymous;
        }
        match claim_uuid(&claims, "sub") {
            Ok(user_id) => Identity::User(user_id),
            Err(err) => {
                tracing::debug!(error = %err, "token subject is not a user id");
                Identity::Anonymous
            }
        }
    }

    fn decrypt_claims(&self, token: &str) -> Option<Claims> {
        let key = SymmetricKey::<V4>::from(&self.key).ok()?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with(&self.issuer);
        rules.validate_audience_with(&self.issuer);

        let untrusted = UntrustedToken::<Local, V4>::try_from(token).ok()?;
        let trusted = local::decrypt(&key, &untrusted, &rules, None, None).ok()?;
        trusted.payload_claims().cloned()
    }
}

fn claim_uuid(claims: &Claims, name: &str) -> Result<Uuid> {
    let value = claims
        .get_claim(name)
        .and_then(|value| value.as_str())
        .ok_or_else(|| anyhow!("missing {} claim", name))?;
    Ok(Uuid::parse_str(value)?)
}

fn has_token_type(claims: &Claims, expected: &str) -> bool {
    claims
        .get_claim("typ")
        .and_then(|value| value.as_str())
        .map(|value| value == expected)
        .unwrap_or(false)
}
