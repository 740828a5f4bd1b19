//! Process-wide scheme registries.
//!
//! Each category (PSI, PJC) owns a construct-once map from scheme id to a
//! nullary constructor. Schemes that exist in the id space but have no
//! shipped implementation (the VOLE variants) are deliberately left
//! unregistered and surface as [`Error::NotRegistered`].

use crate::{
    pjc::CircuitPsi,
    psi::{EcdhPsi, KkrtPsi},
    Error,
};
use seclink::AbstractChannel;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Identifiers of the PSI schemes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PsiScheme {
    /// Diffie-Hellman double-mask PSI.
    Ecdh = 0,
    /// Batch-OPRF PSI.
    Kkrt = 1,
    /// Reserved; not shipped.
    Vole = 2,
}

/// Identifiers of the PJC schemes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PjcScheme {
    /// Batch-OPPRF circuit PSI with feature join.
    Circuit = 0,
    /// Reserved; not shipped.
    Vole = 1,
}

impl std::str::FromStr for PsiScheme {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Error> {
        match name {
            "ecdh" => Ok(PsiScheme::Ecdh),
            "kkrt" => Ok(PsiScheme::Kkrt),
            "vole" => Ok(PsiScheme::Vole),
            other => Err(Error::InvalidArgument(format!(
                "unknown psi scheme name {:?}",
                other
            ))),
        }
    }
}

impl std::str::FromStr for PjcScheme {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Error> {
        match name {
            "circuit" => Ok(PjcScheme::Circuit),
            "vole" => Ok(PjcScheme::Vole),
            other => Err(Error::InvalidArgument(format!(
                "unknown pjc scheme name {:?}",
                other
            ))),
        }
    }
}

/// A PSI scheme instance behind tagged-enum dispatch.
pub enum MemoryPsi {
    /// ECDH-PSI.
    Ecdh(EcdhPsi),
    /// KKRT-PSI.
    Kkrt(KkrtPsi),
}

impl MemoryPsi {
    /// Initialize the scheme with a peer channel and configuration.
    pub fn init<C: AbstractChannel>(&mut self, channel: &mut C, params: &Value) -> Result<(), Error> {
        match self {
            MemoryPsi::Ecdh(psi) => psi.init(channel, params),
            MemoryPsi::Kkrt(psi) => psi.init(channel, params),
        }
    }

    /// Preprocess the inputs (a no-op for the shipped schemes).
    pub fn preprocess_data<C: AbstractChannel>(
        &self,
        channel: &mut C,
        input_keys: &[String],
    ) -> Result<Vec<String>, Error> {
        match self {
            MemoryPsi::Ecdh(psi) => psi.preprocess_data(channel, input_keys),
            MemoryPsi::Kkrt(psi) => psi.preprocess_data(channel, input_keys),
        }
    }

    /// Run the intersection.
    pub fn process<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        input_keys: &[String],
    ) -> Result<Vec<String>, Error> {
        match self {
            MemoryPsi::Ecdh(psi) => psi.process(channel, input_keys),
            MemoryPsi::Kkrt(psi) => psi.process(channel, input_keys),
        }
    }

    /// Run the intersection, returning only its cardinality.
    pub fn process_cardinality_only<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        input_keys: &[String],
    ) -> Result<usize, Error> {
        match self {
            MemoryPsi::Ecdh(psi) => psi.process_cardinality_only(channel, input_keys),
            MemoryPsi::Kkrt(psi) => psi.process_cardinality_only(channel, input_keys),
        }
    }
}

/// A PJC scheme instance behind tagged-enum dispatch.
pub enum MemoryPjc {
    /// Circuit-PSI.
    Circuit(CircuitPsi),
}

impl MemoryPjc {
    /// Initialize the scheme with a peer channel and configuration.
    pub fn init<C: AbstractChannel>(&mut self, channel: &mut C, params: &Value) -> Result<(), Error> {
        match self {
            MemoryPjc::Circuit(pjc) => pjc.init(channel, params),
        }
    }

    /// Preprocess the inputs (a no-op for the shipped schemes).
    pub fn preprocess_data<C: AbstractChannel>(
        &self,
        channel: &mut C,
        input_keys: &[String],
        input_features: &[Vec<u64>],
    ) -> Result<(Vec<String>, Vec<Vec<u64>>), Error> {
        match self {
            MemoryPjc::Circuit(pjc) => pjc.preprocess_data(channel, input_keys, input_features),
        }
    }

    /// Run the join, producing the share matrix.
    pub fn process<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        input_keys: &[String],
        input_features: &[Vec<u64>],
    ) -> Result<Vec<Vec<u64>>, Error> {
        match self {
            MemoryPjc::Circuit(pjc) => pjc.process(channel, input_keys, input_features),
        }
    }
}

type PsiCreator = fn() -> MemoryPsi;
type PjcCreator = fn() -> MemoryPjc;

static PSI_REGISTRY: OnceLock<HashMap<PsiScheme, PsiCreator>> = OnceLock::new();
static PJC_REGISTRY: OnceLock<HashMap<PjcScheme, PjcCreator>> = OnceLock::new();

fn psi_registry() -> &'static HashMap<PsiScheme, PsiCreator> {
    PSI_REGISTRY.get_or_init(|| {
        let mut map: HashMap<PsiScheme, PsiCreator> = HashMap::new();
        map.insert(PsiScheme::Ecdh, || MemoryPsi::Ecdh(EcdhPsi::new()));
        map.insert(PsiScheme::Kkrt, || MemoryPsi::Kkrt(KkrtPsi::new()));
        map
    })
}

fn pjc_registry() -> &'static HashMap<PjcScheme, PjcCreator> {
    PJC_REGISTRY.get_or_init(|| {
        let mut map: HashMap<PjcScheme, PjcCreator> = HashMap::new();
        map.insert(PjcScheme::Circuit, || MemoryPjc::Circuit(CircuitPsi::new()));
        map
    })
}

/// Build a PSI scheme instance.
pub fn create_psi(scheme: PsiScheme) -> Result<MemoryPsi, Error> {
    match psi_registry().get(&scheme) {
        Some(creator) => Ok(creator()),
        None => Err(Error::NotRegistered(format!("{:?}", scheme))),
    }
}

/// Build a PJC scheme instance.
pub fn create_pjc(scheme: PjcScheme) -> Result<MemoryPjc, Error> {
    match pjc_registry().get(&scheme) {
        Some(creator) => Ok(creator()),
        None => Err(Error::NotRegistered(format!("{:?}", scheme))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_schemes_construct() {
        assert!(matches!(
            create_psi(PsiScheme::Ecdh),
            Ok(MemoryPsi::Ecdh(_))
        ));
        assert!(matches!(
            create_psi(PsiScheme::Kkrt),
            Ok(MemoryPsi::Kkrt(_))
        ));
        assert!(matches!(
            create_pjc(PjcScheme::Circuit),
            Ok(MemoryPjc::Circuit(_))
        ));
    }

    #[test]
    fn test_unregistered_scheme_fails() {
        match create_psi(PsiScheme::Vole) {
            Err(Error::NotRegistered(name)) => assert_eq!(name, "Vole"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
        assert!(matches!(
            create_pjc(PjcScheme::Vole),
            Err(Error::NotRegistered(_))
        ));
    }

    #[test]
    fn test_scheme_names_parse() {
        assert_eq!("ecdh".parse::<PsiScheme>().unwrap(), PsiScheme::Ecdh);
        assert_eq!("kkrt".parse::<PsiScheme>().unwrap(), PsiScheme::Kkrt);
        assert_eq!("circuit".parse::<PjcScheme>().unwrap(), PjcScheme::Circuit);
        assert!("dpca".parse::<PjcScheme>().is_err());
    }
}
