//! Domain-separated typed hashing and signer recovery.
//!
//! Digests use the EIP-712 layout over Keccak-256:
//!
//! ```text
//! digest      = keccak256(0x19 0x01 ‖ domain_hash ‖ struct_hash)
//! struct_hash = keccak256(keccak256(TYPE) ‖ word(field_1) ‖ … ‖ word(field_n))
//! ```
//!
//! Every field is one 32-byte word: strings are hashed, integers are
//! big-endian, account ids are used as-is. Signers are secp256k1 keys; the
//! account of a signer is `blake2x256(compressed_public_key)`.

use ink::env::hash::{Blake2x256, Keccak256};
use ink::prelude::vec::Vec;
use ink::primitives::AccountId;

use crate::constants::{DELEGATION_TYPE, DOMAIN_TYPE};

pub type Digest = [u8; 32];

/// `r ‖ s ‖ v`, with `v` in `{0, 1, 27, 28}`.
pub type Signature = [u8; 65];

pub fn keccak256(input: &[u8]) -> Digest {
    let mut output = [0u8; 32];
    ink::env::hash_bytes::<Keccak256>(input, &mut output);
    output
}

/// Big-endian 32-byte word for an unsigned integer.
pub fn uint_word(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn account_word(account: &AccountId) -> &[u8; 32] {
    account.as_ref()
}

/// A value with a fixed type string.
pub trait TypedStruct {
    const TYPE: &'static str;

    /// Append one word per field, in type-string order.
    fn encode_fields(&self, words: &mut Vec<u8>);

    fn type_hash() -> Digest {
        keccak256(Self::TYPE.as_bytes())
    }

    fn struct_hash(&self) -> Digest {
        let mut encoded = Vec::with_capacity(32 * 4);
        encoded.extend_from_slice(&Self::type_hash());
        self.encode_fields(&mut encoded);
        keccak256(&encoded)
    }
}

/// Binds a signature to one token instance on one chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Domain<'a> {
    pub name: &'a str,
    pub chain_id: u64,
    pub verifying_contract: AccountId,
}

impl TypedStruct for Domain<'_> {
    const TYPE: &'static str = DOMAIN_TYPE;

    fn encode_fields(&self, words: &mut Vec<u8>) {
        words.extend_from_slice(&keccak256(self.name.as_bytes()));
        words.extend_from_slice(&uint_word(u128::from(self.chain_id)));
        words.extend_from_slice(account_word(&self.verifying_contract));
    }
}

/// Off-chain authorization to delegate the signer's votes to `delegatee`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delegation {
    pub delegatee: AccountId,
    pub nonce: u64,
    pub expiry: u64,
}

impl TypedStruct for Delegation {
    const TYPE: &'static str = DELEGATION_TYPE;

    fn encode_fields(&self, words: &mut Vec<u8>) {
        words.extend_from_slice(account_word(&self.delegatee));
        words.extend_from_slice(&uint_word(u128::from(self.nonce)));
        words.extend_from_slice(&uint_word(u128::from(self.expiry)));
    }
}

/// The digest a signer signs for `value` under `domain`.
pub fn hash_structured<T: TypedStruct>(domain: &Domain, value: &T) -> Digest {
    let mut preimage = [0u8; 66];
    preimage[..2].copy_from_slice(b"\x19\x01");
    preimage[2..34].copy_from_slice(&domain.struct_hash());
    preimage[34..].copy_from_slice(&value.struct_hash());
    keccak256(&preimage)
}

pub fn signature_from_parts(v: u8, r: &[u8; 32], s: &[u8; 32]) -> Signature {
    let mut signature = [0u8; 65];
    signature[..32].copy_from_slice(r);
    signature[32..64].copy_from_slice(s);
    signature[64] = v;
    signature
}

/// Account whose key produced `signature` over `digest`, if any.
pub fn recover_signer(digest: &Digest, signature: &Signature) -> Option<AccountId> {
    if !matches!(signature[64], 0 | 1 | 27 | 28) {
        return None;
    }
    let mut public_key = [0u8; 33];
    ink::env::ecdsa_recover(signature, digest, &mut public_key).ok()?;
    Some(account_of_public_key(&public_key))
}

pub fn account_of_public_key(public_key: &[u8; 33]) -> AccountId {
    let mut account = [0u8; 32];
    ink::env::hash_bytes::<Blake2x256>(public_key, &mut account);
    AccountId::from(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

    fn domain(chain_id: u64) -> Domain<'static> {
        Domain {
            name: "Nano Byte Token",
            chain_id,
            verifying_contract: AccountId::from([0x42; 32]),
        }
    }

    fn delegation(nonce: u64) -> Delegation {
        Delegation {
            delegatee: AccountId::from([0x07; 32]),
            nonce,
            expiry: 1_000,
        }
    }

    #[test]
    fn uint_word_is_big_endian() {
        let word = uint_word(0x0102);
        assert_eq!(word[..30], [0u8; 30]);
        assert_eq!(word[30..], [0x01, 0x02]);
    }

    #[ink::test]
    fn type_hashes_differ_per_type() {
        assert_ne!(Domain::type_hash(), Delegation::type_hash());
        assert_eq!(Delegation::type_hash(), keccak256(DELEGATION_TYPE.as_bytes()));
    }

    #[ink::test]
    fn digest_is_bound_to_chain_and_contract() {
        let base = hash_structured(&domain(56), &delegation(0));
        assert_eq!(base, hash_structured(&domain(56), &delegation(0)));
        assert_ne!(base, hash_structured(&domain(97), &delegation(0)));

        let mut other_contract = domain(56);
        other_contract.verifying_contract = AccountId::from([0x43; 32]);
        assert_ne!(base, hash_structured(&other_contract, &delegation(0)));
    }

    #[ink::test]
    fn digest_is_bound_to_every_field() {
        let base = hash_structured(&domain(56), &delegation(0));
        assert_ne!(base, hash_structured(&domain(56), &delegation(1)));

        let mut later = delegation(0);
        later.expiry += 1;
        assert_ne!(base, hash_structured(&domain(56), &later));

        let mut elsewhere = delegation(0);
        elsewhere.delegatee = AccountId::from([0x08; 32]);
        assert_ne!(base, hash_structured(&domain(56), &elsewhere));
    }

    #[ink::test]
    fn recovers_signing_account() {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[0x2a; 32]).expect("valid secret key");
        let public = PublicKey::from_secret_key(&secp, &secret);

        let digest = hash_structured(&domain(56), &delegation(0));
        let message = Message::from_digest_slice(&digest).expect("32-byte digest");
        let (recovery_id, compact) = secp
            .sign_ecdsa_recoverable(&message, &secret)
            .serialize_compact();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&compact[..32]);
        s.copy_from_slice(&compact[32..]);
        let v = recovery_id.to_i32() as u8 + 27;

        let signer = recover_signer(&digest, &signature_from_parts(v, &r, &s));
        assert_eq!(signer, Some(account_of_public_key(&public.serialize())));
    }

    #[ink::test]
    fn rejects_unknown_recovery_byte() {
        let digest = hash_structured(&domain(56), &delegation(0));
        let signature = signature_from_parts(5, &[1; 32], &[1; 32]);
        assert_eq!(recover_signer(&digest, &signature), None);
    }
}
