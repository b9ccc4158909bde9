//! In-memory signing key store with lazy rotation.
//!
//! The store owns one active [`KeyPair`] used for new signatures, a bounded
//! history of retired pairs, and one permanently-expired pair kept for
//! exercising expiry handling in relying parties.
//!
//! # Concurrency
//!
//! All mutable state sits behind a single mutex. The expiry check, the
//! generation of a replacement, and its installation run as one critical
//! section, so concurrent callers crossing a rotation boundary trigger
//! exactly one generation and all observe the same new key. The replacement
//! is fully built before it is installed; a failed generation leaves the
//! store exactly as it was.

use crate::config::Config;
use crate::crypto;
use crate::errors::JwksError;
use crate::models::JsonWebKey;
use crate::observability::metrics::{record_key_rotation, set_key_rotation_last_success};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::EncodingKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Source of fresh RSA key material.
pub trait KeyGenerator: Send + Sync {
    fn generate(&self) -> Result<RsaPrivateKey, JwksError>;
}

/// Production generator backed by the OS CSPRNG.
#[derive(Debug, Clone, Copy)]
pub struct RsaKeyGenerator {
    bits: usize,
}

impl RsaKeyGenerator {
    pub fn new(bits: usize) -> Self {
        Self { bits }
    }

    pub fn bits(&self) -> usize {
        self.bits
    }
}

impl KeyGenerator for RsaKeyGenerator {
    fn generate(&self) -> Result<RsaPrivateKey, JwksError> {
        crypto::generate_rsa_key(self.bits)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Lifetime of a freshly generated signing key.
    pub rotation_window: Duration,
    /// How many rotated-out pairs to keep. Oldest are dropped first.
    pub retired_key_history: usize,
}

impl RotationPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            rotation_window: config.rotation_window(),
            retired_key_history: config.retired_key_history,
        }
    }
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// An RSA signing key pair and its metadata. Immutable once created.
///
/// The private half is held only as a ready-to-use signing key.
pub struct KeyPair {
    id: String,
    encoding_key: EncodingKey,
    public_key: RsaPublicKey,
    expiry: DateTime<Utc>,
}

impl KeyPair {
    fn generate(generator: &dyn KeyGenerator, expiry: DateTime<Utc>) -> Result<Self, JwksError> {
        let private_key = generator.generate()?;
        let encoding_key = crypto::encoding_key(&private_key)?;
        let public_key = private_key.to_public_key();

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            encoding_key,
            public_key,
            expiry,
        })
    }

    /// Key ID (`kid`).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    pub fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    /// A pair is expired at and after its expiry instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    pub fn verification_key(&self) -> VerificationKey {
        VerificationKey {
            kid: self.id.clone(),
            public_key: self.public_key.clone(),
            expiry: self.expiry,
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("id", &self.id)
            .field("encoding_key", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Public-only view of a key pair, safe to publish.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationKey {
    pub kid: String,
    pub public_key: RsaPublicKey,
    pub expiry: DateTime<Utc>,
}

impl VerificationKey {
    pub fn to_jwk(&self) -> JsonWebKey {
        crypto::public_jwk(&self.public_key, &self.kid)
    }
}

struct KeyState {
    active: Arc<KeyPair>,
    /// Newest last.
    retired: VecDeque<Arc<KeyPair>>,
}

pub struct KeyStore {
    generator: Arc<dyn KeyGenerator>,
    policy: RotationPolicy,
    state: Mutex<KeyState>,
    expired: Arc<KeyPair>,
}

impl KeyStore {
    /// Create a store holding one active pair (valid for one rotation window
    /// from `now`) and one pair that expired one window before `now`.
    #[instrument(skip_all)]
    pub fn new(
        generator: Arc<dyn KeyGenerator>,
        policy: RotationPolicy,
        now: DateTime<Utc>,
    ) -> Result<Self, JwksError> {
        let active_expiry = expiry_after(now, policy.rotation_window)?;
        let expired_expiry = now.checked_sub_signed(policy.rotation_window).ok_or_else(|| {
            error!("Rotation window reaches before the earliest representable time");
            JwksError::Internal
        })?;

        let active = KeyPair::generate(generator.as_ref(), active_expiry)?;
        let expired = KeyPair::generate(generator.as_ref(), expired_expiry)?;

        info!(
            active_key_id = %active.id,
            active_expiry = %active.expiry.to_rfc3339(),
            expired_key_id = %expired.id,
            "Key store initialized"
        );

        Ok(Self {
            generator,
            policy,
            state: Mutex::new(KeyState {
                active: Arc::new(active),
                retired: VecDeque::new(),
            }),
            expired: Arc::new(expired),
        })
    }

    /// Build a store with OS-random RSA keys sized and timed per `config`.
    pub fn from_config(config: &Config) -> Result<Self, JwksError> {
        let generator = RsaKeyGenerator::new(config.rsa_key_bits);
        info!(rsa_key_bits = generator.bits(), "Generating RSA signing keys");

        Self::new(
            Arc::new(generator),
            RotationPolicy::from_config(config),
            Utc::now(),
        )
    }

    pub fn policy(&self) -> RotationPolicy {
        self.policy
    }

    /// Return the active signing pair, rotating first if it is expired at `now`.
    ///
    /// On rotation the new pair expires at `now + rotation_window` and the old
    /// pair moves to the retired history. If generation fails the error is
    /// returned and the store is left untouched.
    pub fn active_signing_key(&self, now: DateTime<Utc>) -> Result<Arc<KeyPair>, JwksError> {
        let mut state = self.lock_state();

        if !state.active.is_expired_at(now) {
            return Ok(Arc::clone(&state.active));
        }

        let replacement = match expiry_after(now, self.policy.rotation_window)
            .and_then(|expiry| KeyPair::generate(self.generator.as_ref(), expiry))
        {
            Ok(pair) => Arc::new(pair),
            Err(e) => {
                warn!(
                    key_id = %state.active.id,
                    error = %e,
                    "Signing key rotation failed; keeping previous key"
                );
                record_key_rotation("error");
                return Err(e);
            }
        };

        let previous = std::mem::replace(&mut state.active, Arc::clone(&replacement));

        info!(
            old_key_id = %previous.id,
            new_key_id = %replacement.id,
            new_expiry = %replacement.expiry.to_rfc3339(),
            "Rotated signing key"
        );

        state.retired.push_back(previous);
        while state.retired.len() > self.policy.retired_key_history {
            state.retired.pop_front();
        }

        record_key_rotation("success");
        set_key_rotation_last_success(now.timestamp());

        Ok(replacement)
    }

    /// Public keys of every known pair still valid at `now` (`expiry > now`),
    /// active key first. Never rotates.
    pub fn verification_keys(&self, now: DateTime<Utc>) -> Vec<VerificationKey> {
        let state = self.lock_state();

        std::iter::once(&state.active)
            .chain(state.retired.iter().rev())
            .chain(std::iter::once(&self.expired))
            .filter(|pair| !pair.is_expired_at(now))
            .map(|pair| pair.verification_key())
            .collect()
    }

    /// The permanently-expired pair. Same pair on every call.
    pub fn deliberately_expired_key(&self) -> Arc<KeyPair> {
        Arc::clone(&self.expired)
    }

    pub fn retired_key_count(&self) -> usize {
        self.lock_state().retired.len()
    }

    // A panic while the lock is held cannot leave a half-installed pair
    // behind, so a poisoned lock still guards consistent state.
    fn lock_state(&self) -> MutexGuard<'_, KeyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `now + window`, or `Internal` if the result is outside chrono's range.
fn expiry_after(now: DateTime<Utc>, window: Duration) -> Result<DateTime<Utc>, JwksError> {
    now.checked_add_signed(window).ok_or_else(|| {
        error!("Rotation window reaches past the latest representable time");
        JwksError::Internal
    })
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore")
            .field("policy", &self.policy)
            .field("expired", &self.expired)
            .finish_non_exhaustive()
    }
}
