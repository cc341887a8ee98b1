//! Invite tokens: unguessable, URL-safe, opaque.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use callgrid_core::{DomainError, DomainResult};

const TOKEN_BYTES: usize = 32;
/// Encoded length of [`TOKEN_BYTES`] in unpadded base64.
pub const TOKEN_LEN: usize = 43;

/// Secret carried in an invite link.
///
/// 256 bits from the operating system CSPRNG, encoded as unpadded URL-safe
/// base64 so it can sit in a query string without escaping.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InviteToken(String);

impl InviteToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Accept a token received from a link, rejecting anything that could not
    /// have been produced by [`InviteToken::generate`].
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let raw = raw.trim();
        let well_formed = raw.len() == TOKEN_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if !well_formed {
            return Err(DomainError::validation("malformed invite token"));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens are bearer secrets; keep them out of logs.
impl core::fmt::Debug for InviteToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "InviteToken({prefix}…)")
    }
}

impl core::fmt::Display for InviteToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
