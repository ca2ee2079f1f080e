use rand::Rng;
use std::str::FromStr;

use super::engine::EngineKind;

const SUFFIX_ALPHABET: &[u8] = b"qwertyuiopasdfghjklzxcvbnm1234567890";
const SUFFIX_LEN: usize = 5;

/// Source of the short random part of a container name.
///
/// Suffixes only make collisions unlikely; the controller still checks the
/// runtime for an existing container before creating one.
pub trait SuffixGenerator: Send + Sync {
    fn suffix(&self) -> String;
}

pub struct RandomSuffix;

impl SuffixGenerator for RandomSuffix {
    fn suffix(&self) -> String {
        let mut rng = rand::rng();
        (0..SUFFIX_LEN)
            .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
            .collect()
    }
}

/// How data volume names are derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeScope {
    /// `{kind}-{dbname}-data`: instances with the same kind and dbname share data
    Shared,
    /// `{container name}-data`: every instance gets its own volume
    Instance,
}

impl FromStr for VolumeScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shared" => Ok(Self::Shared),
            "instance" => Ok(Self::Instance),
            other => Err(format!("unknown volume scope: {}", other)),
        }
    }
}

pub fn container_name(kind: EngineKind, dbname: &str, suffix: &str) -> String {
    format!("{}-{}-{}", kind, dbname, suffix)
}

pub fn volume_name(scope: VolumeScope, kind: EngineKind, dbname: &str, container: &str) -> String {
    match scope {
        VolumeScope::Shared => format!("{}-{}-data", kind, dbname),
        VolumeScope::Instance => format!("{}-data", container),
    }
}
