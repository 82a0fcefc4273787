use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::curve::{ec_mul_signed, EcPoint};

use super::{ElGamalError, ElGamalPublicKey};

/// Candidate plaintexts a decryption is allowed to recover.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionDomain {
    candidates: Vec<i64>,
}

impl DecryptionDomain {
    pub fn new(candidates: impl IntoIterator<Item = i64>) -> Self {
        let mut candidates: Vec<i64> = candidates.into_iter().collect();
        candidates.sort_unstable();
        candidates.dedup();
        Self { candidates }
    }

    /// Differences of two move codes: `{-2, -1, 0, 1, 2}`.
    pub fn game_differences() -> Self {
        Self::new(-2..=2)
    }

    /// Move codes themselves: `{0, 1, 2}`.
    pub fn moves() -> Self {
        Self::new(0..=2)
    }

    pub fn candidates(&self) -> &[i64] {
        &self.candidates
    }

    pub fn table(&self, public: &ElGamalPublicKey) -> Result<DecryptionTable, ElGamalError> {
        DecryptionTable::build(self, public)
    }
}

impl Default for DecryptionDomain {
    fn default() -> Self {
        Self::game_differences()
    }
}

/// Precomputed `candidate·G` for every candidate of a domain.
#[derive(Clone, Debug)]
pub struct DecryptionTable {
    entries: Vec<(i64, EcPoint)>,
}

impl DecryptionTable {
    pub fn build(domain: &DecryptionDomain, public: &ElGamalPublicKey) -> Result<Self, ElGamalError> {
        let entries = domain
            .candidates()
            .iter()
            .map(|candidate| {
                let point = ec_mul_signed(public.curve, &public.generator, &BigInt::from(*candidate))?;
                Ok((*candidate, point))
            })
            .collect::<Result<Vec<_>, ElGamalError>>()?;
        Ok(Self { entries })
    }

    pub fn lookup(&self, point: &EcPoint) -> Option<i64> {
        self.entries
            .iter()
            .find(|(_, candidate)| candidate == point)
            .map(|(value, _)| *value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::bn254;
    use crate::elgamal::generate_keypair_with_rng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn domain_is_sorted_and_deduplicated() {
        let domain = DecryptionDomain::new([2, -1, 2, 0]);
        assert_eq!(domain.candidates(), &[-1, 0, 2]);
        assert_eq!(DecryptionDomain::default().candidates(), &[-2, -1, 0, 1, 2]);
    }

    #[test]
    fn table_maps_points_back_to_candidates() {
        let mut rng = StdRng::seed_from_u64(3);
        let (public, _) = generate_keypair_with_rng(bn254(), &mut rng).unwrap();
        let table = DecryptionDomain::game_differences().table(&public).unwrap();
        assert_eq!(table.len(), 5);
        assert_eq!(table.lookup(&EcPoint::Infinity), Some(0));
        assert_eq!(table.lookup(&public.generator), Some(1));
        assert_eq!(table.lookup(&public.q), None);
    }
}
