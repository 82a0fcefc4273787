use std::fmt::Debug;

use num_bigint::{BigInt, BigUint};
use num_traits::ToPrimitive;

use crate::elgamal::{
    self, DecryptionDomain, DecryptionTable, ElGamalCiphertext, ElGamalPrivateKey,
    ElGamalPublicKey,
};
use crate::paillier::{self, PaillierCiphertext, PaillierPrivateKey, PaillierPublicKey};

use super::{Move, ResolutionError};

const LOG_TARGET: &str = "rps::resolution";

/// A cryptosystem able to hide moves and subtract them under encryption.
pub trait HomomorphicMoveScheme: Send + Sync {
    type Ciphertext: Clone + Debug + PartialEq + Send + Sync;

    fn name(&self) -> &'static str;

    fn encrypt_move(&self, mv: Move) -> Result<Self::Ciphertext, ResolutionError>;

    /// Encryption of `player - house`.
    fn difference(
        &self,
        player: &Self::Ciphertext,
        house: &Self::Ciphertext,
    ) -> Result<Self::Ciphertext, ResolutionError>;

    /// Signed difference in `[-2, 2]`. Needs the private key.
    fn decrypt_difference(&self, difference: &Self::Ciphertext) -> Result<i64, ResolutionError>;

    fn encode(&self, ciphertext: &Self::Ciphertext) -> Result<Vec<u8>, ResolutionError>;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Ciphertext, ResolutionError>;
}

/// Object-safe view over wire bytes, used where the scheme is chosen at runtime.
pub trait EncodedMoveScheme: Send + Sync {
    fn scheme_name(&self) -> &'static str;

    fn encrypt_move_encoded(&self, mv: Move) -> Result<Vec<u8>, ResolutionError>;

    fn difference_encoded(&self, player: &[u8], house: &[u8]) -> Result<Vec<u8>, ResolutionError>;

    fn decrypt_difference_encoded(&self, difference: &[u8]) -> Result<i64, ResolutionError>;

    /// Reject bytes that do not parse as a ciphertext of this scheme.
    fn validate_encoded(&self, bytes: &[u8]) -> Result<(), ResolutionError>;
}

impl<S: HomomorphicMoveScheme> EncodedMoveScheme for S {
    fn scheme_name(&self) -> &'static str {
        self.name()
    }

    fn encrypt_move_encoded(&self, mv: Move) -> Result<Vec<u8>, ResolutionError> {
        self.encode(&self.encrypt_move(mv)?)
    }

    fn difference_encoded(&self, player: &[u8], house: &[u8]) -> Result<Vec<u8>, ResolutionError> {
        let player = self.decode(player)?;
        let house = self.decode(house)?;
        self.encode(&self.difference(&player, &house)?)
    }

    fn decrypt_difference_encoded(&self, difference: &[u8]) -> Result<i64, ResolutionError> {
        self.decrypt_difference(&self.decode(difference)?)
    }

    fn validate_encoded(&self, bytes: &[u8]) -> Result<(), ResolutionError> {
        self.decode(bytes).map(|_| ())
    }
}

fn check_difference_range(value: &BigInt) -> Result<i64, ResolutionError> {
    match value.to_i64() {
        Some(d) if (-2..=2).contains(&d) => Ok(d),
        _ => {
            tracing::warn!(target: LOG_TARGET, "decrypted difference outside [-2, 2]");
            Err(ResolutionError::DifferenceOutOfRange(value.to_string()))
        }
    }
}

pub struct ElGamalMoveScheme {
    public: ElGamalPublicKey,
    private: Option<ElGamalPrivateKey>,
    table: DecryptionTable,
}

impl ElGamalMoveScheme {
    pub fn new(
        public: ElGamalPublicKey,
        private: Option<ElGamalPrivateKey>,
    ) -> Result<Self, ResolutionError> {
        public.validate()?;
        let table = DecryptionDomain::game_differences().table(&public)?;
        Ok(Self {
            public,
            private,
            table,
        })
    }

    /// Encryption-only view, as handed to clients.
    pub fn public_only(public: ElGamalPublicKey) -> Result<Self, ResolutionError> {
        Self::new(public, None)
    }

    pub fn public_key(&self) -> &ElGamalPublicKey {
        &self.public
    }
}

impl HomomorphicMoveScheme for ElGamalMoveScheme {
    type Ciphertext = ElGamalCiphertext;

    fn name(&self) -> &'static str {
        "elgamal"
    }

    fn encrypt_move(&self, mv: Move) -> Result<ElGamalCiphertext, ResolutionError> {
        Ok(elgamal::encrypt(mv.code() as i64, &self.public)?)
    }

    fn difference(
        &self,
        player: &ElGamalCiphertext,
        house: &ElGamalCiphertext,
    ) -> Result<ElGamalCiphertext, ResolutionError> {
        Ok(elgamal::homomorphic_difference(player, house, &self.public)?)
    }

    fn decrypt_difference(&self, difference: &ElGamalCiphertext) -> Result<i64, ResolutionError> {
        let private = self.private.as_ref().ok_or(ResolutionError::MissingPrivateKey)?;
        Ok(elgamal::decrypt_in_domain(
            difference,
            private,
            &self.public,
            &self.table,
        )?)
    }

    fn encode(&self, ciphertext: &ElGamalCiphertext) -> Result<Vec<u8>, ResolutionError> {
        Ok(ciphertext.to_bytes(self.public.curve))
    }

    fn decode(&self, bytes: &[u8]) -> Result<ElGamalCiphertext, ResolutionError> {
        Ok(ElGamalCiphertext::from_bytes(bytes, self.public.curve)?)
    }
}

pub struct PaillierMoveScheme {
    public: PaillierPublicKey,
    private: Option<PaillierPrivateKey>,
}

impl PaillierMoveScheme {
    pub fn new(public: PaillierPublicKey, private: Option<PaillierPrivateKey>) -> Self {
        Self { public, private }
    }

    pub fn public_key(&self) -> &PaillierPublicKey {
        &self.public
    }
}

impl HomomorphicMoveScheme for PaillierMoveScheme {
    type Ciphertext = PaillierCiphertext;

    fn name(&self) -> &'static str {
        "paillier"
    }

    fn encrypt_move(&self, mv: Move) -> Result<PaillierCiphertext, ResolutionError> {
        Ok(paillier::encrypt(&BigUint::from(mv.code()), &self.public)?)
    }

    fn difference(
        &self,
        player: &PaillierCiphertext,
        house: &PaillierCiphertext,
    ) -> Result<PaillierCiphertext, ResolutionError> {
        Ok(paillier::subtract_encrypted(player, house, &self.public)?)
    }

    fn decrypt_difference(&self, difference: &PaillierCiphertext) -> Result<i64, ResolutionError> {
        let private = self.private.as_ref().ok_or(ResolutionError::MissingPrivateKey)?;
        let signed = paillier::decrypt_signed(difference, private, &self.public)?;
        check_difference_range(&signed)
    }

    fn encode(&self, ciphertext: &PaillierCiphertext) -> Result<Vec<u8>, ResolutionError> {
        Ok(ciphertext.to_bytes(&self.public)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<PaillierCiphertext, ResolutionError> {
        let expected = self.public.ciphertext_bytes();
        if bytes.len() != expected {
            return Err(paillier::PaillierError::Encoding(format!(
                "expected {expected} bytes, got {}",
                bytes.len()
            ))
            .into());
        }
        Ok(PaillierCiphertext::from_bytes(bytes, &self.public)?)
    }
}
