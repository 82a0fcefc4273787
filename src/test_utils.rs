//! Common test utilities shared by the unit test modules.

/// Helpers shared across test modules.
pub mod serde {
    use std::fmt::Debug;

    /// Assert that a value survives a serde_json round-trip using structural equality.
    pub fn assert_round_trip_eq<T>(value: &T)
    where
        T: ::serde::Serialize + ::serde::de::DeserializeOwned + PartialEq + Debug,
    {
        let json = serde_json::to_string(value)
            .expect("serialization should succeed during round-trip testing");
        let restored: T = serde_json::from_str(&json)
            .expect("deserialization should succeed during round-trip testing");
        assert_eq!(restored, *value, "serde_json round-trip altered the value");
    }
}

/// Deterministic key material.
pub mod fixtures {
    use num_bigint::BigUint;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::curve::bn254;
    use crate::elgamal::{generate_keypair_with_rng, ElGamalPrivateKey, ElGamalPublicKey};
    use crate::paillier::{PaillierPrivateKey, PaillierPublicKey};

    /// The Mersenne primes 2^61 - 1 and 2^89 - 1.
    pub fn small_paillier_primes() -> (BigUint, BigUint) {
        let one = BigUint::from(1u32);
        ((&one << 61usize) - &one, (&one << 89usize) - &one)
    }

    pub fn paillier_keypair() -> (PaillierPublicKey, PaillierPrivateKey) {
        let (p, q) = small_paillier_primes();
        PaillierPrivateKey::from_primes(&p, &q).expect("fixture primes are valid")
    }

    pub fn elgamal_keypair(seed: u64) -> (ElGamalPublicKey, ElGamalPrivateKey) {
        let mut rng = StdRng::seed_from_u64(seed);
        generate_keypair_with_rng(bn254(), &mut rng).expect("keygen on bn254")
    }
}

/// A wired orchestrator over the in-memory chain and cache.
pub mod harness {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use crate::cache::InMemoryGameStateCache;
    use crate::chain::{ChainClient, GameCall, GameId, InMemoryChain, TransactionRequest};
    use crate::config::OrchestratorConfig;
    use crate::nonce::SignerPool;
    use crate::orchestration::{FixedHouseStrategy, GameOrchestrator};
    use crate::resolution::{
        move_commitment, ElGamalMoveScheme, EncodedMoveScheme, Move, PaillierMoveScheme,
    };
    use crate::retry::RetryPolicy;

    use super::fixtures;

    pub const PLAYER: &str = "0xplayer";
    pub const SIGNERS: [&str; 2] = ["0xhouse-a", "0xhouse-b"];

    pub struct Harness {
        pub chain: InMemoryChain,
        pub cache: Arc<InMemoryGameStateCache>,
        pub scheme: Arc<dyn EncodedMoveScheme>,
        pub orchestrator: Arc<GameOrchestrator>,
        pub cancel: CancellationToken,
    }

    pub fn config() -> OrchestratorConfig {
        OrchestratorConfig {
            cache_ttl: Duration::from_secs(60),
            read_retry: RetryPolicy::new(3, Duration::from_millis(10)),
            write_retry: RetryPolicy::new(5, Duration::from_millis(10)),
            receipt_timeout: Duration::from_secs(2),
            nonce_refresh_interval: Duration::from_secs(30),
            signers: SIGNERS.iter().map(|s| s.to_string()).collect(),
        }
    }

    impl Harness {
        pub fn elgamal(house: Move) -> Self {
            let (public, private) = fixtures::elgamal_keypair(7);
            let scheme = ElGamalMoveScheme::new(public, Some(private)).expect("valid key");
            Self::with_scheme(Arc::new(scheme), house)
        }

        pub fn paillier(house: Move) -> Self {
            let (public, private) = fixtures::paillier_keypair();
            Self::with_scheme(Arc::new(PaillierMoveScheme::new(public, Some(private))), house)
        }

        pub fn with_scheme(scheme: Arc<dyn EncodedMoveScheme>, house: Move) -> Self {
            let chain = InMemoryChain::new();
            let cache = Arc::new(InMemoryGameStateCache::new());
            let cancel = CancellationToken::new();
            let config = config();
            let client: Arc<dyn ChainClient> = Arc::new(chain.clone());
            let signers = SignerPool::spawn(
                &config.signers,
                Arc::clone(&client),
                config.nonce_refresh_interval,
                cancel.clone(),
            )
            .expect("signers configured");
            let orchestrator = Arc::new(GameOrchestrator::new(
                Arc::clone(&scheme),
                client,
                cache.clone(),
                signers,
                Arc::new(FixedHouseStrategy(house)),
                config,
            ));
            Self {
                chain,
                cache,
                scheme,
                orchestrator,
                cancel,
            }
        }

        /// Create a game as the player; returns its id and the encoded move.
        pub async fn create_game(&self, player_move: Move) -> (GameId, Vec<u8>) {
            let ciphertext = self
                .scheme
                .encrypt_move_encoded(player_move)
                .expect("encrypt player move");
            let request = TransactionRequest {
                from: PLAYER.into(),
                nonce: self.chain.pending_nonce(&PLAYER.to_string()).await.unwrap(),
                call: GameCall::CreateGame {
                    bet: 100,
                    commitment: move_commitment(&ciphertext).to_vec(),
                },
            };
            let tx_hash = self.chain.submit(request).await.unwrap();
            let receipt = self
                .chain
                .wait_for_receipt(&tx_hash, Duration::from_secs(1))
                .await
                .unwrap();
            (receipt.game_id.expect("create_game returns an id"), ciphertext)
        }
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            self.cancel.cancel();
        }
    }
}
