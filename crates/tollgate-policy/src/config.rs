//! Declarative policy description, loadable from node configuration.
//!
//! ```toml
//! [policy.max_tx_per_signer_per_block]
//! default = 100
//! spans = [{ start = 2, value = 5 }]
//!
//! [policy.authorized_miners]
//! spans = [{ start = 0, end = 4, modulo = 2, value = ["de96aa7702a7a1fd18ee0f84a5a0c7a2c28ec840"] }]
//! ```
//!
//! Each configured dimension replaces the corresponding timeline of the base
//! policy (usually a network preset); unconfigured dimensions are kept.

use serde::{Deserialize, Serialize};

use tollgate_core::address::Address;
use tollgate_core::commit::ValidatorSet;
use tollgate_core::crypto::PublicKey;
use tollgate_core::error::PolicyError;

use crate::policy::{ChainPolicy, MinerSet};
use crate::span::{IndexFilter, Span};
use crate::timeline::PolicyTimeline;

/// One span in a configured timeline.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SpanConfig<V> {
    pub start: u64,
    /// Inclusive upper bound; omitted means unbounded.
    #[serde(default)]
    pub end: Option<u64>,
    /// Restrict the span to indices with `i % modulo == remainder`.
    #[serde(default)]
    pub modulo: Option<u64>,
    #[serde(default)]
    pub remainder: u64,
    pub value: V,
}

/// A configured timeline. `default` falls back to the base policy's default.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TimelineConfig<V> {
    #[serde(default)]
    pub default: Option<V>,
    #[serde(default = "Vec::new")]
    pub spans: Vec<SpanConfig<V>>,
}

impl<V> Default for TimelineConfig<V> {
    fn default() -> Self {
        Self {
            default: None,
            spans: Vec::new(),
        }
    }
}

/// Policy overrides. Every field is optional.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PolicyConfig {
    pub minimum_difficulty: Option<u64>,
    pub max_block_bytes: Option<TimelineConfig<u64>>,
    pub min_tx_per_block: Option<TimelineConfig<usize>>,
    pub max_tx_per_block: Option<TimelineConfig<usize>>,
    pub max_tx_per_signer_per_block: Option<TimelineConfig<usize>>,
    /// Hex addresses.
    pub authorized_miners: Option<TimelineConfig<Vec<String>>>,
    /// Hex addresses.
    pub permissioned_miners: Option<TimelineConfig<Vec<String>>>,
    /// Hex Ed25519 public keys.
    pub validators: Option<TimelineConfig<Vec<String>>>,
}

impl PolicyConfig {
    /// Build a policy from this description alone.
    pub fn to_policy(&self) -> Result<ChainPolicy, PolicyError> {
        self.apply_to(&ChainPolicy::unrestricted(0))
    }

    /// Replace the configured dimensions of `base`.
    pub fn apply_to(&self, base: &ChainPolicy) -> Result<ChainPolicy, PolicyError> {
        let same = |v: &u64| Ok::<_, PolicyError>(*v);
        let same_usize = |v: &usize| Ok::<_, PolicyError>(*v);
        Ok(ChainPolicy::compose(
            self.minimum_difficulty.unwrap_or(base.minimum_difficulty()),
            Some(build(self.max_block_bytes.as_ref(), base.max_block_bytes(), same)?),
            Some(build(self.min_tx_per_block.as_ref(), base.min_tx_per_block(), same_usize)?),
            Some(build(self.max_tx_per_block.as_ref(), base.max_tx_per_block(), same_usize)?),
            Some(build(
                self.max_tx_per_signer_per_block.as_ref(),
                base.max_tx_per_signer_per_block(),
                same_usize,
            )?),
            Some(build(self.authorized_miners.as_ref(), base.authorized_miners(), parse_miners)?),
            Some(build(self.permissioned_miners.as_ref(), base.permissioned_miners(), parse_miners)?),
            Some(build(self.validators.as_ref(), base.validators(), parse_validators)?),
        ))
    }
}

fn build<C, V, F>(
    config: Option<&TimelineConfig<C>>,
    base: &PolicyTimeline<V>,
    convert: F,
) -> Result<PolicyTimeline<V>, PolicyError>
where
    V: Clone,
    F: Fn(&C) -> Result<V, PolicyError>,
{
    let Some(config) = config else {
        return Ok(base.clone());
    };
    let default = match &config.default {
        Some(value) => convert(value)?,
        None => base.default_value().clone(),
    };
    let mut timeline = PolicyTimeline::new(default);
    for span in &config.spans {
        let mut built = Span::new(span.start, span.end, convert(&span.value)?)?;
        if let Some(divisor) = span.modulo {
            built = built.with_filter(IndexFilter::Modulo {
                divisor,
                remainder: span.remainder,
            });
        }
        timeline = timeline.add(built);
    }
    Ok(timeline)
}

fn parse_miners(values: &Vec<String>) -> Result<MinerSet, PolicyError> {
    values
        .iter()
        .map(|s| Address::decode(s).map_err(|e| PolicyError::InvalidAddress(format!("{s}: {e}"))))
        .collect()
}

fn parse_validators(values: &Vec<String>) -> Result<ValidatorSet, PolicyError> {
    let keys = values
        .iter()
        .map(|s| PublicKey::from_hex(s).map_err(|e| PolicyError::InvalidValidatorKey(format!("{s}: {e}"))))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ValidatorSet::new(keys))
}
