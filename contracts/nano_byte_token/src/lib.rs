#![cfg_attr(not(feature = "std"), no_std, no_main)]

pub mod checkpoints;
pub mod typed_data;

pub type Balance = <ink::env::DefaultEnvironment as ink::env::Environment>::Balance;
pub type BlockNumber = <ink::env::DefaultEnvironment as ink::env::Environment>::BlockNumber;

pub mod constants {
    use crate::Balance;

    pub const TOKEN_NAME: &str = "Nano Byte Token";
    pub const TOKEN_SYMBOL: &str = "NBT";
    pub const DECIMALS: u8 = 18;

    pub const SCALING_FACTOR: Balance = 1_000_000_000_000_000_000;
    /// Hard supply cap: 10 000 000 000 NBT.
    pub const CAP: Balance = 10_000_000_000 * SCALING_FACTOR;

    pub const DOMAIN_TYPE: &str =
        "EIP712Domain(string name,uint256 chainId,bytes32 verifyingContract)";
    pub const DELEGATION_TYPE: &str =
        "Delegation(bytes32 delegatee,uint256 nonce,uint256 expiry)";
}

/// # Nano Byte Token (NBT)
///
/// Capped BEP20 ledger with delegated voting power.
///
/// ```text
///   mint / transfer / burn ──► ledger ──────────┐
///   approve / *_from ──────► allowances ──► ledger
///   delegate ──────────────► delegation ────────┼──► checkpoints
///   delegate_by_sig ───────► typed_data ──► delegation
/// ```
///
/// Voting power lives with delegates, not holders. An account only counts
/// towards someone's votes after it delegates (possibly to itself); every
/// balance movement then re-snapshots the delegates on both sides.
/// Snapshots are keyed by block number and writes inside one block collapse
/// onto a single checkpoint.
///
/// Messages validate everything up front and only then touch storage, so a
/// failed call leaves no partial state behind.
#[ink::contract]
mod nano_byte_token {
    use crate::checkpoints::{self, Checkpoint, Placement, PlacementError};
    use crate::constants::*;
    use crate::typed_data::{self, Delegation, Domain, TypedStruct};
    use ink::prelude::string::String;
    use ink::storage::Mapping;

    // =========================================================================
    // STORAGE
    // =========================================================================

    #[ink(storage)]
    pub struct NanoByteToken {
        // ── Ledger ────────────────────────────────────────────────────────
        total_supply: Balance,
        cap: Balance,
        balances: Mapping<AccountId, Balance>,
        allowances: Mapping<(AccountId, AccountId), Balance>,

        // ── Access control ────────────────────────────────────────────────
        /// `None` once ownership has been renounced.
        owner: Option<AccountId>,

        // ── Delegation ────────────────────────────────────────────────────
        delegates: Mapping<AccountId, AccountId>,
        checkpoints: Mapping<(AccountId, u32), Checkpoint>,
        num_checkpoints: Mapping<AccountId, u32>,

        // ── Signature authorization ───────────────────────────────────────
        nonces: Mapping<AccountId, u64>,
        chain_id: u64,
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    #[ink(event)]
    pub struct Transfer {
        #[ink(topic)]
        from: Option<AccountId>,
        #[ink(topic)]
        to: Option<AccountId>,
        value: Balance,
    }

    #[ink(event)]
    pub struct Approval {
        #[ink(topic)]
        owner: AccountId,
        #[ink(topic)]
        spender: AccountId,
        value: Balance,
    }

    #[ink(event)]
    pub struct DelegateChanged {
        #[ink(topic)]
        delegator: AccountId,
        #[ink(topic)]
        from_delegate: Option<AccountId>,
        #[ink(topic)]
        to_delegate: AccountId,
    }

    #[ink(event)]
    pub struct DelegateVotesChanged {
        #[ink(topic)]
        delegate: AccountId,
        previous_votes: Balance,
        new_votes: Balance,
    }

    #[ink(event)]
    pub struct OwnershipTransferred {
        #[ink(topic)]
        previous_owner: Option<AccountId>,
        #[ink(topic)]
        new_owner: Option<AccountId>,
    }

    // =========================================================================
    // ERRORS
    // =========================================================================

    #[derive(Debug, PartialEq, Eq, scale::Encode, scale::Decode)]
    #[cfg_attr(feature = "std", derive(scale_info::TypeInfo))]
    pub enum Error {
        /// Caller is not the owner (or ownership was renounced).
        Unauthorized { caller: AccountId },
        /// Minting `requested` would push supply past the cap.
        CapExceeded {
            cap: Balance,
            total_supply: Balance,
            requested: Balance,
        },
        InsufficientBalance { balance: Balance, requested: Balance },
        /// Spend exceeds what the owner approved for the caller.
        AllowanceExceeded { allowance: Balance, requested: Balance },
        /// `decrease_allowance` below zero.
        AllowanceUnderflow { allowance: Balance, requested: Balance },
        InvalidNonce { expected: u64, provided: u64 },
        SignatureExpired { expiry: Timestamp, now: Timestamp },
        /// Signature does not recover, or recovers to an unexpected signer.
        InvalidSignature,
        /// A checkpoint write went back in time. Indicates a sequencing bug in
        /// the host, never a user mistake.
        OutOfOrderCheckpoint {
            latest: BlockNumber,
            attempted: BlockNumber,
        },
        /// An arithmetic operation overflowed.
        Overflow,
    }

    pub type Result<T> = core::result::Result<T, Error>;

    // =========================================================================
    // VOTE PLANS
    // =========================================================================

    /// A checkpoint write validated ahead of any state change.
    #[derive(Debug, Clone, Copy)]
    struct VoteWrite {
        delegate: AccountId,
        placement: Placement,
        previous_votes: Balance,
        checkpoint: Checkpoint,
    }

    /// The (at most two) checkpoint writes caused by moving votes from one
    /// delegate to another.
    #[derive(Debug, Default)]
    struct VoteMove {
        debit: Option<VoteWrite>,
        credit: Option<VoteWrite>,
    }

    // =========================================================================
    // IMPLEMENTATION
    // =========================================================================

    impl NanoByteToken {
        /// Deploy with zero supply; the deployer becomes owner.
        ///
        /// `chain_id` identifies the network in delegation signatures.
        #[ink(constructor)]
        pub fn new(chain_id: u64) -> Self {
            let caller = Self::env().caller();

            Self::env().emit_event(OwnershipTransferred {
                previous_owner: None,
                new_owner: Some(caller),
            });

            Self {
                total_supply: 0,
                cap: CAP,
                balances: Mapping::default(),
                allowances: Mapping::default(),
                owner: Some(caller),
                delegates: Mapping::default(),
                checkpoints: Mapping::default(),
                num_checkpoints: Mapping::default(),
                nonces: Mapping::default(),
                chain_id,
            }
        }

        // =====================================================================
        // METADATA & VIEWS
        // =====================================================================

        #[ink(message)]
        pub fn token_name(&self) -> String {
            String::from(TOKEN_NAME)
        }

        #[ink(message)]
        pub fn token_symbol(&self) -> String {
            String::from(TOKEN_SYMBOL)
        }

        #[ink(message)]
        pub fn token_decimals(&self) -> u8 {
            DECIMALS
        }

        #[ink(message)]
        pub fn cap(&self) -> Balance {
            self.cap
        }

        #[ink(message)]
        pub fn total_supply(&self) -> Balance {
            self.total_supply
        }

        #[ink(message)]
        pub fn balance_of(&self, account: AccountId) -> Balance {
            self.balances.get(account).unwrap_or(0)
        }

        #[ink(message)]
        pub fn allowance(&self, owner: AccountId, spender: AccountId) -> Balance {
            self.allowances.get((owner, spender)).unwrap_or(0)
        }

        #[ink(message)]
        pub fn get_owner(&self) -> Option<AccountId> {
            self.owner
        }

        // =====================================================================
        // LEDGER
        // =====================================================================

        /// Mint `value` to `to`. Owner only; never exceeds the cap.
        #[ink(message)]
        pub fn mint(&mut self, to: AccountId, value: Balance) -> Result<()> {
            let caller = self.env().caller();
            self.only_owner(caller)?;

            let new_supply = self
                .total_supply
                .checked_add(value)
                .filter(|supply| *supply <= self.cap)
                .ok_or(Error::CapExceeded {
                    cap: self.cap,
                    total_supply: self.total_supply,
                    requested: value,
                })?;
            let votes = self.prepare_vote_move(None, self.delegates.get(to), value)?;

            self.total_supply = new_supply;
            self.credit_balance(to, value);
            self.commit_vote_move(votes);

            self.env().emit_event(Transfer {
                from: None,
                to: Some(to),
                value,
            });
            Ok(())
        }

        #[ink(message)]
        pub fn transfer(&mut self, to: AccountId, value: Balance) -> Result<()> {
            let from = self.env().caller();
            self.transfer_impl(from, to, value)
        }

        /// Destroy `value` of the caller's tokens.
        #[ink(message)]
        pub fn burn(&mut self, value: Balance) -> Result<()> {
            let holder = self.env().caller();
            self.burn_impl(holder, value)
        }

        // =====================================================================
        // ALLOWANCES
        // =====================================================================

        #[ink(message)]
        pub fn approve(&mut self, spender: AccountId, value: Balance) -> Result<()> {
            let owner = self.env().caller();
            self.set_allowance(owner, spender, value);
            Ok(())
        }

        #[ink(message)]
        pub fn increase_allowance(&mut self, spender: AccountId, delta: Balance) -> Result<()> {
            let owner = self.env().caller();
            let value = self
                .allowance(owner, spender)
                .checked_add(delta)
                .ok_or(Error::Overflow)?;
            self.set_allowance(owner, spender, value);
            Ok(())
        }

        #[ink(message)]
        pub fn decrease_allowance(&mut self, spender: AccountId, delta: Balance) -> Result<()> {
            let owner = self.env().caller();
            let allowance = self.allowance(owner, spender);
            let value = allowance
                .checked_sub(delta)
                .ok_or(Error::AllowanceUnderflow {
                    allowance,
                    requested: delta,
                })?;
            self.set_allowance(owner, spender, value);
            Ok(())
        }

        /// Move `value` from `from` to `to` out of the caller's allowance.
        #[ink(message)]
        pub fn transfer_from(
            &mut self,
            from: AccountId,
            to: AccountId,
            value: Balance,
        ) -> Result<()> {
            let spender = self.env().caller();
            let remaining = self.remaining_allowance(from, spender, value)?;
            // All-or-nothing: fails before mutating anything.
            self.transfer_impl(from, to, value)?;
            self.set_allowance(from, spender, remaining);
            Ok(())
        }

        /// Burn `value` of `account`'s tokens out of the caller's allowance.
        #[ink(message)]
        pub fn burn_from(&mut self, account: AccountId, value: Balance) -> Result<()> {
            let spender = self.env().caller();
            let remaining = self.remaining_allowance(account, spender, value)?;
            self.burn_impl(account, value)?;
            self.set_allowance(account, spender, remaining);
            Ok(())
        }

        // =====================================================================
        // OWNERSHIP
        // =====================================================================

        #[ink(message)]
        pub fn transfer_ownership(&mut self, new_owner: AccountId) -> Result<()> {
            self.only_owner(self.env().caller())?;
            let previous_owner = self.owner.replace(new_owner);
            self.env().emit_event(OwnershipTransferred {
                previous_owner,
                new_owner: Some(new_owner),
            });
            Ok(())
        }

        /// Give up ownership for good: no further mints or ownership changes.
        #[ink(message)]
        pub fn renounce_ownership(&mut self) -> Result<()> {
            self.only_owner(self.env().caller())?;
            let previous_owner = self.owner.take();
            self.env().emit_event(OwnershipTransferred {
                previous_owner,
                new_owner: None,
            });
            Ok(())
        }

        // =====================================================================
        // DELEGATION
        // =====================================================================

        #[ink(message)]
        pub fn delegates(&self, account: AccountId) -> Option<AccountId> {
            self.delegates.get(account)
        }

        /// Point the caller's voting power at `delegatee`.
        #[ink(message)]
        pub fn delegate(&mut self, delegatee: AccountId) -> Result<()> {
            let delegator = self.env().caller();
            let votes = self.prepare_delegation(delegator, delegatee)?;
            self.commit_delegation(delegator, delegatee, votes);
            Ok(())
        }

        /// Delegate on behalf of whoever signed
        /// `Delegation { delegatee, nonce, expiry }` and return that signer.
        ///
        /// The recovered signer is authoritative. `expected_signer` only lets
        /// the caller insist on a particular one.
        ///
        /// # Errors
        /// - [`Error::InvalidSignature`] if nothing recovers, or the signer is
        ///   not `expected_signer`.
        /// - [`Error::InvalidNonce`] if `nonce` is not the signer's next nonce.
        /// - [`Error::SignatureExpired`] once the block timestamp passes `expiry`.
        #[ink(message)]
        #[allow(clippy::too_many_arguments)]
        pub fn delegate_by_sig(
            &mut self,
            expected_signer: Option<AccountId>,
            delegatee: AccountId,
            nonce: u64,
            expiry: Timestamp,
            v: u8,
            r: [u8; 32],
            s: [u8; 32],
        ) -> Result<AccountId> {
            let digest = self.delegation_digest(delegatee, nonce, expiry);
            let signature = typed_data::signature_from_parts(v, &r, &s);
            let signer =
                typed_data::recover_signer(&digest, &signature).ok_or(Error::InvalidSignature)?;
            if matches!(expected_signer, Some(expected) if expected != signer) {
                return Err(Error::InvalidSignature);
            }

            let expected_nonce = self.nonces(signer);
            if nonce != expected_nonce {
                return Err(Error::InvalidNonce {
                    expected: expected_nonce,
                    provided: nonce,
                });
            }

            let now = self.env().block_timestamp();
            if now > expiry {
                return Err(Error::SignatureExpired { expiry, now });
            }

            let next_nonce = expected_nonce.checked_add(1).ok_or(Error::Overflow)?;
            let votes = self.prepare_delegation(signer, delegatee)?;

            self.nonces.insert(signer, &next_nonce);
            self.commit_delegation(signer, delegatee, votes);
            Ok(signer)
        }

        // =====================================================================
        // VOTES
        // =====================================================================

        #[ink(message)]
        pub fn get_current_votes(&self, account: AccountId) -> Balance {
            self.latest_checkpoint(account)
                .map(|checkpoint| checkpoint.votes)
                .unwrap_or(0)
        }

        /// Votes `account` held as of `block`.
        #[ink(message)]
        pub fn get_prior_votes(&self, account: AccountId, block: BlockNumber) -> Balance {
            checkpoints::upper_lookup(self.num_checkpoints(account), block, |index| {
                self.checkpoints.get((account, index)).unwrap_or_default()
            })
        }

        #[ink(message)]
        pub fn num_checkpoints(&self, account: AccountId) -> u32 {
            self.num_checkpoints.get(account).unwrap_or(0)
        }

        #[ink(message)]
        pub fn checkpoints(&self, account: AccountId, index: u32) -> Option<Checkpoint> {
            self.checkpoints.get((account, index))
        }

        // =====================================================================
        // SIGNATURE HELPERS
        // =====================================================================

        #[ink(message)]
        pub fn nonces(&self, account: AccountId) -> u64 {
            self.nonces.get(account).unwrap_or(0)
        }

        #[ink(message)]
        pub fn domain_separator(&self) -> [u8; 32] {
            self.domain().struct_hash()
        }

        /// The digest a holder signs to authorize `delegate_by_sig`.
        #[ink(message)]
        pub fn delegation_digest(
            &self,
            delegatee: AccountId,
            nonce: u64,
            expiry: Timestamp,
        ) -> [u8; 32] {
            let delegation = Delegation {
                delegatee,
                nonce,
                expiry,
            };
            typed_data::hash_structured(&self.domain(), &delegation)
        }

        // =====================================================================
        // INTERNAL
        // =====================================================================

        fn domain(&self) -> Domain<'static> {
            Domain {
                name: TOKEN_NAME,
                chain_id: self.chain_id,
                verifying_contract: self.env().account_id(),
            }
        }

        fn only_owner(&self, caller: AccountId) -> Result<()> {
            if self.owner != Some(caller) {
                return Err(Error::Unauthorized { caller });
            }
            Ok(())
        }

        fn transfer_impl(&mut self, from: AccountId, to: AccountId, value: Balance) -> Result<()> {
            self.ensure_balance(from, value)?;
            let votes =
                self.prepare_vote_move(self.delegates.get(from), self.delegates.get(to), value)?;

            self.debit_balance(from, value);
            self.credit_balance(to, value);
            self.commit_vote_move(votes);

            self.env().emit_event(Transfer {
                from: Some(from),
                to: Some(to),
                value,
            });
            Ok(())
        }

        fn burn_impl(&mut self, holder: AccountId, value: Balance) -> Result<()> {
            self.ensure_balance(holder, value)?;
            let votes = self.prepare_vote_move(self.delegates.get(holder), None, value)?;

            self.debit_balance(holder, value);
            // `value` fits in the holder's balance, hence in the supply.
            self.total_supply = self.total_supply.saturating_sub(value);
            self.commit_vote_move(votes);

            self.env().emit_event(Transfer {
                from: Some(holder),
                to: None,
                value,
            });
            Ok(())
        }

        fn ensure_balance(&self, account: AccountId, requested: Balance) -> Result<()> {
            let balance = self.balance_of(account);
            if balance < requested {
                return Err(Error::InsufficientBalance { balance, requested });
            }
            Ok(())
        }

        /// Callers must have run `ensure_balance` first.
        fn debit_balance(&mut self, account: AccountId, amount: Balance) {
            let balance = self.balance_of(account);
            self.balances.insert(account, &balance.saturating_sub(amount));
        }

        /// Balances sum to `total_supply <= cap`, so this never saturates.
        fn credit_balance(&mut self, account: AccountId, amount: Balance) {
            let balance = self.balance_of(account);
            self.balances.insert(account, &balance.saturating_add(amount));
        }

        fn remaining_allowance(
            &self,
            owner: AccountId,
            spender: AccountId,
            requested: Balance,
        ) -> Result<Balance> {
            let allowance = self.allowance(owner, spender);
            allowance
                .checked_sub(requested)
                .ok_or(Error::AllowanceExceeded {
                    allowance,
                    requested,
                })
        }

        /// A zero allowance is stored as absence.
        fn set_allowance(&mut self, owner: AccountId, spender: AccountId, value: Balance) {
            if value == 0 {
                self.allowances.remove((owner, spender));
            } else {
                self.allowances.insert((owner, spender), &value);
            }
            self.env().emit_event(Approval {
                owner,
                spender,
                value,
            });
        }

        // ── Delegation manager ────────────────────────────────────────────

        fn prepare_delegation(&self, delegator: AccountId, delegatee: AccountId) -> Result<VoteMove> {
            self.prepare_vote_move(
                self.delegates.get(delegator),
                Some(delegatee),
                self.balance_of(delegator),
            )
        }

        fn commit_delegation(&mut self, delegator: AccountId, delegatee: AccountId, votes: VoteMove) {
            let from_delegate = self.delegates.get(delegator);
            self.delegates.insert(delegator, &delegatee);

            self.env().emit_event(DelegateChanged {
                delegator,
                from_delegate,
                to_delegate: delegatee,
            });
            self.commit_vote_move(votes);
        }

        /// Plan moving `amount` votes from `src` to `dst`.
        ///
        /// Equal delegates net to zero and write nothing, as does a zero
        /// amount. `None` on either side is the mint/burn or no-delegate
        /// case.
        fn prepare_vote_move(
            &self,
            src: Option<AccountId>,
            dst: Option<AccountId>,
            amount: Balance,
        ) -> Result<VoteMove> {
            let mut plan = VoteMove::default();
            if src == dst || amount == 0 {
                return Ok(plan);
            }

            if let Some(delegate) = src {
                let previous_votes = self.get_current_votes(delegate);
                let votes = previous_votes.checked_sub(amount).ok_or(Error::Overflow)?;
                plan.debit = Some(self.prepare_checkpoint(delegate, previous_votes, votes)?);
            }
            if let Some(delegate) = dst {
                let previous_votes = self.get_current_votes(delegate);
                let votes = previous_votes.checked_add(amount).ok_or(Error::Overflow)?;
                plan.credit = Some(self.prepare_checkpoint(delegate, previous_votes, votes)?);
            }
            Ok(plan)
        }

        fn commit_vote_move(&mut self, plan: VoteMove) {
            for write in [plan.debit, plan.credit].into_iter().flatten() {
                self.write_checkpoint(write);
            }
        }

        // ── Checkpoint store ──────────────────────────────────────────────

        fn latest_checkpoint(&self, account: AccountId) -> Option<Checkpoint> {
            let count = self.num_checkpoints(account);
            let last = count.checked_sub(1)?;
            self.checkpoints.get((account, last))
        }

        fn prepare_checkpoint(
            &self,
            delegate: AccountId,
            previous_votes: Balance,
            votes: Balance,
        ) -> Result<VoteWrite> {
            let block = self.env().block_number();
            let placement = checkpoints::placement(
                self.num_checkpoints(delegate),
                self.latest_checkpoint(delegate),
                block,
            )
            .map_err(|error| match error {
                PlacementError::OutOfOrder { latest } => Error::OutOfOrderCheckpoint {
                    latest,
                    attempted: block,
                },
                PlacementError::Full => Error::Overflow,
            })?;

            Ok(VoteWrite {
                delegate,
                placement,
                previous_votes,
                checkpoint: Checkpoint {
                    from_block: block,
                    votes,
                },
            })
        }

        fn write_checkpoint(&mut self, write: VoteWrite) {
            let index = write.placement.index();
            self.checkpoints
                .insert((write.delegate, index), &write.checkpoint);
            if write.placement.is_append() {
                // `placement` refuses to append at `u32::MAX`.
                self.num_checkpoints.insert(write.delegate, &(index + 1));
            }

            self.env().emit_event(DelegateVotesChanged {
                delegate: write.delegate,
                previous_votes: write.previous_votes,
                new_votes: write.checkpoint.votes,
            });
        }
    }

    // =========================================================================
    // UNIT TESTS
    // =========================================================================

}
