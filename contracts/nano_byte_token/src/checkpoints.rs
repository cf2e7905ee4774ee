//! Checkpoint Store primitives.
//!
//! A delegate's voting history is a flat, append-only sequence of
//! [`Checkpoint`]s with strictly increasing `from_block`. The contract keeps
//! each sequence in storage as `(account, index) -> Checkpoint` plus a length
//! per account, so the routines here take an index accessor instead of a
//! slice.

use crate::{Balance, BlockNumber};

/// Voting power of a delegate from `from_block` onwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, scale::Encode, scale::Decode)]
#[cfg_attr(
    feature = "std",
    derive(scale_info::TypeInfo, ink::storage::traits::StorageLayout)
)]
pub struct Checkpoint {
    pub from_block: BlockNumber,
    pub votes: Balance,
}

/// Where the next checkpoint of a sequence lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Same block as the latest entry: overwrite it in place.
    Overwrite(u32),
    /// Later block (or empty sequence): push a new entry.
    Append(u32),
}

impl Placement {
    pub fn index(self) -> u32 {
        match self {
            Placement::Overwrite(index) | Placement::Append(index) => index,
        }
    }

    pub fn is_append(self) -> bool {
        matches!(self, Placement::Append(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementError {
    /// The write targets a block before the latest checkpoint.
    OutOfOrder { latest: BlockNumber },
    /// The sequence already holds `u32::MAX` entries.
    Full,
}

/// Decide where a checkpoint for `block` goes in a sequence of `count`
/// entries whose last entry is `latest`.
pub fn placement(
    count: u32,
    latest: Option<Checkpoint>,
    block: BlockNumber,
) -> Result<Placement, PlacementError> {
    match latest {
        Some(last) if block < last.from_block => Err(PlacementError::OutOfOrder {
            latest: last.from_block,
        }),
        Some(last) if block == last.from_block => {
            Ok(Placement::Overwrite(count.saturating_sub(1)))
        }
        _ if count == u32::MAX => Err(PlacementError::Full),
        _ => Ok(Placement::Append(count)),
    }
}

/// Votes in effect at `block`: the latest checkpoint with
/// `from_block <= block`, or zero when `block` predates the sequence.
///
/// `at(i)` must return entry `i` for every `i < count`.
pub fn upper_lookup<F>(count: u32, block: BlockNumber, at: F) -> Balance
where
    F: Fn(u32) -> Checkpoint,
{
    if count == 0 {
        return 0;
    }

    // Most lookups ask about the present.
    let last = at(count - 1);
    if last.from_block <= block {
        return last.votes;
    }
    if at(0).from_block > block {
        return 0;
    }

    let mut lower = 0u32;
    let mut upper = count - 1;
    while upper > lower {
        // Round up so `lower = center` always makes progress.
        let center = upper - (upper - lower) / 2;
        let checkpoint = at(center);
        if checkpoint.from_block == block {
            return checkpoint.votes;
        } else if checkpoint.from_block < block {
            lower = center;
        } else {
            upper = center - 1;
        }
    }
    at(lower).votes
}
