//! Runtime configuration loaded from the environment.
//!
//! Public key material is safe to expose; private halves are read from
//! server-only variables and are never serialized back out.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::chain::Address;
use crate::crypto_serde::{biguint_from_hex, decode_hex};
use crate::curve::bn254;
use crate::elgamal::{ElGamalPrivateKey, ElGamalPublicKey};
use crate::paillier::{PaillierPrivateKey, PaillierPublicKey};
use crate::resolution::{ElGamalMoveScheme, EncodedMoveScheme, PaillierMoveScheme, ResolutionError};
use crate::retry::RetryPolicy;

const LOG_TARGET: &str = "rps::config";

pub const ENV_SCHEME: &str = "RPS_SCHEME";
pub const ENV_ELGAMAL_PUBLIC_KEY: &str = "RPS_ELGAMAL_PUBLIC_KEY";
pub const ENV_ELGAMAL_PRIVATE_KEY: &str = "RPS_ELGAMAL_PRIVATE_KEY";
pub const ENV_PAILLIER_N: &str = "RPS_PAILLIER_N";
pub const ENV_PAILLIER_G: &str = "RPS_PAILLIER_G";
pub const ENV_PAILLIER_LAMBDA: &str = "RPS_PAILLIER_LAMBDA";
pub const ENV_PAILLIER_MU: &str = "RPS_PAILLIER_MU";
pub const ENV_SIGNERS: &str = "RPS_SIGNERS";
pub const ENV_ORCHESTRATOR: &str = "RPS_ORCHESTRATOR";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Lifetime of cache entries; processing entries older than this are stale.
    #[serde(with = "crate::crypto_serde::duration_ms")]
    pub cache_ttl: Duration,
    pub read_retry: RetryPolicy,
    pub write_retry: RetryPolicy,
    #[serde(with = "crate::crypto_serde::duration_ms")]
    pub receipt_timeout: Duration,
    #[serde(with = "crate::crypto_serde::duration_ms")]
    pub nonce_refresh_interval: Duration,
    pub signers: Vec<Address>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cache_ttl: crate::cache::DEFAULT_TTL,
            read_retry: RetryPolicy::reads(),
            write_retry: RetryPolicy::writes(),
            receipt_timeout: Duration::from_secs(60),
            nonce_refresh_interval: Duration::from_secs(30),
            signers: Vec::new(),
        }
    }
}

impl OrchestratorConfig {
    /// Reject settings that would stall or panic the runtime.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("cache_ttl", self.cache_ttl),
            ("receipt_timeout", self.receipt_timeout),
            ("nonce_refresh_interval", self.nonce_refresh_interval),
        ] {
            if value.is_zero() {
                bail!("{name} must be greater than zero");
            }
        }
        for (name, policy) in [("read_retry", &self.read_retry), ("write_retry", &self.write_retry)] {
            if policy.max_attempts == 0 {
                bail!("{name}.max_attempts must be at least 1");
            }
        }
        if self.signers.is_empty() {
            bail!("{ENV_SIGNERS} must contain at least one signer address");
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemeKind {
    ElGamal,
    Paillier,
}

impl FromStr for SchemeKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "elgamal" | "ec-elgamal" => Ok(SchemeKind::ElGamal),
            "paillier" => Ok(SchemeKind::Paillier),
            other => bail!("unknown scheme {other:?}; expected \"elgamal\" or \"paillier\""),
        }
    }
}

impl fmt::Display for SchemeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemeKind::ElGamal => f.write_str("elgamal"),
            SchemeKind::Paillier => f.write_str("paillier"),
        }
    }
}

#[derive(Clone, Debug)]
pub enum KeyConfig {
    ElGamal {
        public: ElGamalPublicKey,
        private: Option<ElGamalPrivateKey>,
    },
    Paillier {
        public: PaillierPublicKey,
        private: Option<PaillierPrivateKey>,
    },
}

impl KeyConfig {
    pub fn kind(&self) -> SchemeKind {
        match self {
            KeyConfig::ElGamal { .. } => SchemeKind::ElGamal,
            KeyConfig::Paillier { .. } => SchemeKind::Paillier,
        }
    }

    pub fn has_private_key(&self) -> bool {
        match self {
            KeyConfig::ElGamal { private, .. } => private.is_some(),
            KeyConfig::Paillier { private, .. } => private.is_some(),
        }
    }

    pub fn into_scheme(self) -> Result<Arc<dyn EncodedMoveScheme>, ResolutionError> {
        Ok(match self {
            KeyConfig::ElGamal { public, private } => Arc::new(ElGamalMoveScheme::new(public, private)?),
            KeyConfig::Paillier { public, private } => Arc::new(PaillierMoveScheme::new(public, private)),
        })
    }

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let kind = match lookup(ENV_SCHEME) {
            Some(raw) => raw.parse()?,
            None => SchemeKind::ElGamal,
        };
        match kind {
            SchemeKind::ElGamal => elgamal_keys(lookup),
            SchemeKind::Paillier => paillier_keys(lookup),
        }
    }
}

fn elgamal_keys(lookup: &impl Fn(&str) -> Option<String>) -> Result<KeyConfig> {
    let curve = bn254();
    let private = lookup(ENV_ELGAMAL_PRIVATE_KEY)
        .map(|raw| {
            let bytes = decode_hex(&raw).context("invalid hex encoding for ElGamal private key")?;
            ElGamalPrivateKey::from_bytes(&bytes, curve).context("invalid ElGamal private key")
        })
        .transpose()?;

    let public = match lookup(ENV_ELGAMAL_PUBLIC_KEY) {
        Some(raw) => {
            let bytes = decode_hex(&raw).context("invalid hex encoding for ElGamal public key")?;
            ElGamalPublicKey::from_bytes(&bytes, curve).context("invalid ElGamal public key")?
        }
        None => match &private {
            Some(private) => private.public_key(curve).context("failed to derive ElGamal public key")?,
            None => bail!("{ENV_ELGAMAL_PUBLIC_KEY} or {ENV_ELGAMAL_PRIVATE_KEY} must be set"),
        },
    };

    if let Some(private) = &private {
        if !public.matches(private).context("failed to check ElGamal key pair")? {
            bail!("{ENV_ELGAMAL_PRIVATE_KEY} does not match {ENV_ELGAMAL_PUBLIC_KEY}");
        }
    }
    Ok(KeyConfig::ElGamal { public, private })
}

fn paillier_keys(lookup: &impl Fn(&str) -> Option<String>) -> Result<KeyConfig> {
    let parse = |name: &str| -> Result<Option<BigUint>> {
        lookup(name)
            .map(|raw| biguint_from_hex(&raw).with_context(|| format!("invalid hex encoding for {name}")))
            .transpose()
    };

    let n = parse(ENV_PAILLIER_N)?.ok_or_else(|| anyhow!("{ENV_PAILLIER_N} must be set"))?;
    let public = match parse(ENV_PAILLIER_G)? {
        Some(g) => PaillierPublicKey::new(n, g),
        None => PaillierPublicKey::with_default_generator(n),
    }
    .context("invalid Paillier public key")?;

    let private = match (parse(ENV_PAILLIER_LAMBDA)?, parse(ENV_PAILLIER_MU)?) {
        (Some(lambda), Some(mu)) => {
            let derived =
                PaillierPrivateKey::derive(&public, lambda).context("failed to derive Paillier mu")?;
            if derived.mu() != &mu {
                bail!("{ENV_PAILLIER_MU} does not match {ENV_PAILLIER_LAMBDA} for {ENV_PAILLIER_N}");
            }
            Some(derived)
        }
        (Some(lambda), None) => Some(
            PaillierPrivateKey::derive(&public, lambda).context("failed to derive Paillier mu")?,
        ),
        (None, Some(_)) => bail!("{ENV_PAILLIER_MU} requires {ENV_PAILLIER_LAMBDA}"),
        (None, None) => None,
    };
    Ok(KeyConfig::Paillier { public, private })
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub keys: KeyConfig,
    pub orchestrator: OrchestratorConfig,
}

impl EngineConfig {
    /// Load `.env` if present, then read `RPS_*` variables.
    pub fn from_env() -> Result<Self> {
        if let Err(err) = dotenv::dotenv() {
            tracing::debug!(target: LOG_TARGET, error = %err, "no .env file loaded");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let keys = KeyConfig::from_lookup(&lookup)?;

        let mut orchestrator = match lookup(ENV_ORCHESTRATOR) {
            Some(raw) => serde_json::from_str::<OrchestratorConfig>(&raw)
                .with_context(|| format!("failed to parse {ENV_ORCHESTRATOR} JSON"))?,
            None => OrchestratorConfig::default(),
        };

        if let Some(raw) = lookup(ENV_SIGNERS) {
            orchestrator.signers = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse {ENV_SIGNERS} JSON array"))?;
        }
        orchestrator
            .validate()
            .context("invalid orchestrator configuration")?;

        tracing::info!(
            target: LOG_TARGET,
            scheme = %keys.kind(),
            private_key = keys.has_private_key(),
            signers = orchestrator.signers.len(),
            "loaded engine configuration"
        );
        Ok(Self { keys, orchestrator })
    }
}
