use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use super::moves::{diff_mod3, outcome_from_residue};
use super::{GameOutcome, HomomorphicMoveScheme, ResolutionError};

const LOG_TARGET: &str = "rps::resolution";

/// Everything learned by resolving one game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resolution<C> {
    pub difference: C,
    pub diff: i64,
    pub diff_mod3: u8,
    pub outcome: GameOutcome,
}

/// Subtract the house move from the player move under encryption and decrypt
/// only the result.
pub fn resolve<S: HomomorphicMoveScheme>(
    scheme: &S,
    player: &S::Ciphertext,
    house: &S::Ciphertext,
) -> Result<Resolution<S::Ciphertext>, ResolutionError> {
    let difference = scheme.difference(player, house)?;
    let diff = scheme.decrypt_difference(&difference)?;
    let residue = diff_mod3(diff);
    let outcome = outcome_from_residue(residue);

    tracing::debug!(
        target: LOG_TARGET,
        scheme = scheme.name(),
        diff_mod3 = residue,
        %outcome,
        "resolved encrypted moves"
    );

    Ok(Resolution {
        difference,
        diff,
        diff_mod3: residue,
        outcome,
    })
}

/// Keccak-256 over an encoded ciphertext; what a party publishes before moves are revealed.
pub fn move_commitment(encoded: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(encoded);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolution::{ElGamalMoveScheme, EncodedMoveScheme, Move, PaillierMoveScheme};
    use crate::test_utils::fixtures::{elgamal_keypair, paillier_keypair};

    fn elgamal_scheme(seed: u64) -> ElGamalMoveScheme {
        let (public, private) = elgamal_keypair(seed);
        ElGamalMoveScheme::new(public, Some(private)).unwrap()
    }

    fn paillier_scheme() -> PaillierMoveScheme {
        let (public, private) = paillier_keypair();
        PaillierMoveScheme::new(public, Some(private))
    }

    fn play<S: HomomorphicMoveScheme>(scheme: &S, player: Move, house: Move) -> GameOutcome {
        let p = scheme.encrypt_move(player).unwrap();
        let h = scheme.encrypt_move(house).unwrap();
        resolve(scheme, &p, &h).unwrap().outcome
    }

    #[test]
    fn elgamal_resolves_canonical_games() {
        let scheme = elgamal_scheme(100);
        assert_eq!(play(&scheme, Move::Rock, Move::Scissors), GameOutcome::Win);
        assert_eq!(play(&scheme, Move::Paper, Move::Paper), GameOutcome::Draw);
        assert_eq!(play(&scheme, Move::Scissors, Move::Rock), GameOutcome::Lose);
    }

    #[test]
    fn paillier_resolves_every_pairing() {
        let scheme = paillier_scheme();
        for player in Move::ALL {
            for house in Move::ALL {
                let p = scheme.encrypt_move(player).unwrap();
                let h = scheme.encrypt_move(house).unwrap();
                let resolution = resolve(&scheme, &p, &h).unwrap();
                assert_eq!(resolution.diff, player.code() as i64 - house.code() as i64);
                assert_eq!(resolution.diff_mod3, diff_mod3(resolution.diff));
            }
        }
        assert_eq!(play(&scheme, Move::Rock, Move::Scissors), GameOutcome::Win);
        assert_eq!(play(&scheme, Move::Scissors, Move::Rock), GameOutcome::Lose);
    }

    #[test]
    fn missing_private_key_cannot_decrypt() {
        let (public, _) = elgamal_keypair(101);
        let scheme = ElGamalMoveScheme::public_only(public).unwrap();
        let p = scheme.encrypt_move(Move::Rock).unwrap();
        let h = scheme.encrypt_move(Move::Paper).unwrap();
        assert_eq!(resolve(&scheme, &p, &h), Err(ResolutionError::MissingPrivateKey));

        let (public, _) = paillier_keypair();
        let scheme = PaillierMoveScheme::new(public, None);
        let p = scheme.encrypt_move(Move::Rock).unwrap();
        let h = scheme.encrypt_move(Move::Paper).unwrap();
        assert_eq!(resolve(&scheme, &p, &h), Err(ResolutionError::MissingPrivateKey));
    }

    #[test]
    fn wrong_elgamal_key_finds_no_discrete_log() {
        let honest = elgamal_scheme(102);
        let (_, other_private) = elgamal_keypair(103);
        let impostor =
            ElGamalMoveScheme::new(honest.public_key().clone(), Some(other_private)).unwrap();

        let p = honest.encrypt_move(Move::Rock).unwrap();
        let h = honest.encrypt_move(Move::Scissors).unwrap();
        assert!(matches!(
            resolve(&impostor, &p, &h),
            Err(ResolutionError::ElGamal(crate::elgamal::ElGamalError::DiscreteLogNotFound))
        ));
    }

    #[test]
    fn wrong_paillier_key_does_not_recover_the_difference() {
        use crate::paillier::PaillierPrivateKey;
        use num_bigint::BigUint;

        let (public, private) = paillier_keypair();
        let wrong = PaillierPrivateKey::new(private.lambda().clone(), private.mu() + BigUint::from(1u32));
        let honest = PaillierMoveScheme::new(public.clone(), Some(private));
        let impostor = PaillierMoveScheme::new(public, Some(wrong));

        let p = honest.encrypt_move(Move::Rock).unwrap();
        let h = honest.encrypt_move(Move::Scissors).unwrap();
        let difference = honest.difference(&p, &h).unwrap();
        assert_eq!(honest.decrypt_difference(&difference).unwrap(), -2);
        assert!(impostor.decrypt_difference(&difference).is_err());
    }

    #[test]
    fn encoded_view_matches_typed_api() {
        let scheme = elgamal_scheme(104);
        let p = scheme.encrypt_move_encoded(Move::Paper).unwrap();
        let h = scheme.encrypt_move_encoded(Move::Rock).unwrap();
        assert_eq!(p.len(), 128);
        scheme.validate_encoded(&p).unwrap();

        let difference = scheme.difference_encoded(&p, &h).unwrap();
        assert_eq!(scheme.decrypt_difference_encoded(&difference).unwrap(), 1);
    }

    #[test]
    fn paillier_decode_rejects_wrong_width() {
        let scheme = paillier_scheme();
        let encoded = scheme.encrypt_move_encoded(Move::Rock).unwrap();
        assert_eq!(encoded.len(), scheme.public_key().ciphertext_bytes());
        assert!(scheme.validate_encoded(&encoded[1..]).is_err());
    }

    #[test]
    fn commitment_is_keccak_of_the_encoding() {
        let a = move_commitment(b"ciphertext-a");
        let b = move_commitment(b"ciphertext-b");
        assert_ne!(a, b);
        assert_eq!(a, move_commitment(b"ciphertext-a"));
        // Keccak-256 of the empty string
        assert_eq!(
            hex::encode(move_commitment(&[])),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }
}
