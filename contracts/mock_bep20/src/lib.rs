#![cfg_attr(not(feature = "std"), no_std, no_main)]

/// # MockBEP20
///
/// Plain fixed-metadata BEP20 token for tests and local deployments.
/// The deployer receives the initial supply, owns the contract and may mint
/// more to itself. No cap, no voting.
#[ink::contract]
mod mock_bep20 {
    use ink::prelude::string::String;
    use ink::storage::Mapping;

    pub const DECIMALS: u8 = 18;

    #[ink(storage)]
    pub struct MockBep20 {
        name: String,
        symbol: String,
        total_supply: Balance,
        balances: Mapping<AccountId, Balance>,
        allowances: Mapping<(AccountId, AccountId), Balance>,
        owner: AccountId,
    }

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

    #[derive(Debug, PartialEq, Eq, scale::Encode, scale::Decode)]
    #[cfg_attr(feature = "std", derive(scale_info::TypeInfo))]
    pub enum Error {
        Unauthorized,
        InsufficientBalance,
        InsufficientAllowance,
        AllowanceUnderflow,
        Overflow,
    }

    pub type Result<T> = core::result::Result<T, Error>;

    impl MockBep20 {
        #[ink(constructor)]
        pub fn new(name: String, symbol: String, supply: Balance) -> Self {
            let caller = Self::env().caller();
            let mut balances = Mapping::default();
            balances.insert(caller, &supply);

            Self::env().emit_event(Transfer {
                from: None,
                to: Some(caller),
                value: supply,
            });

            Self {
                name,
                symbol,
                total_supply: supply,
                balances,
                allowances: Mapping::default(),
                owner: caller,
            }
        }

        // ── Views ─────────────────────────────────────────────────────────

        #[ink(message)]
        pub fn token_name(&self) -> String {
            self.name.clone()
        }

        #[ink(message)]
        pub fn token_symbol(&self) -> String {
            self.symbol.clone()
        }

        #[ink(message)]
        pub fn token_decimals(&self) -> u8 {
            DECIMALS
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
        pub fn get_owner(&self) -> AccountId {
            self.owner
        }

        // ── Transfers ─────────────────────────────────────────────────────

        #[ink(message)]
        pub fn transfer(&mut self, to: AccountId, value: Balance) -> Result<()> {
            let from = self.env().caller();
            self.transfer_impl(from, to, value)
        }

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
            let value = self
                .allowance(owner, spender)
                .checked_sub(delta)
                .ok_or(Error::AllowanceUnderflow)?;
            self.set_allowance(owner, spender, value);
            Ok(())
        }

        #[ink(message)]
        pub fn transfer_from(
            &mut self,
            from: AccountId,
            to: AccountId,
            value: Balance,
        ) -> Result<()> {
            let spender = self.env().caller();
            let remaining = self
                .allowance(from, spender)
                .checked_sub(value)
                .ok_or(Error::InsufficientAllowance)?;
            self.transfer_impl(from, to, value)?;
            self.set_allowance(from, spender, remaining);
            Ok(())
        }

        /// Owner only. Credits the owner.
        #[ink(message)]
        pub fn mint(&mut self, value: Balance) -> Result<()> {
            let caller = self.env().caller();
            if caller != self.owner {
                return Err(Error::Unauthorized);
            }
            let total_supply = self.total_supply.checked_add(value).ok_or(Error::Overflow)?;

            self.total_supply = total_supply;
            // Every balance is bounded by `total_supply`.
            let balance = self.balance_of(caller);
            self.balances.insert(caller, &balance.saturating_add(value));

            self.env().emit_event(Transfer {
                from: None,
                to: Some(caller),
                value,
            });
            Ok(())
        }

        // ── Internal ──────────────────────────────────────────────────────

        fn transfer_impl(&mut self, from: AccountId, to: AccountId, value: Balance) -> Result<()> {
            let from_balance = self.balance_of(from);
            if from_balance < value {
                return Err(Error::InsufficientBalance);
            }
            self.balances.insert(from, &(from_balance - value));
            let to_balance = self.balance_of(to);
            self.balances.insert(to, &to_balance.saturating_add(value));

            self.env().emit_event(Transfer {
                from: Some(from),
                to: Some(to),
                value,
            });
            Ok(())
        }

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
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use ink::env::{test, DefaultEnvironment};

        type Env = DefaultEnvironment;

        const SUPPLY: Balance = 1_000 * 1_000_000_000_000_000_000;

        fn accounts() -> test::DefaultAccounts<Env> {
            test::default_accounts::<Env>()
        }

        fn set_caller(addr: AccountId) {
            test::set_caller::<Env>(addr);
        }

        fn deploy() -> MockBep20 {
            set_caller(accounts().alice);
            MockBep20::new(String::from("Mock Bep 20"), String::from("MBT"), SUPPLY)
        }

        #[ink::test]
        fn constructor_sets_metadata_and_owner() {
            let token = deploy();
            let accs = accounts();
            assert_eq!(token.total_supply(), SUPPLY);
            assert_eq!(token.token_name(), "Mock Bep 20");
            assert_eq!(token.token_symbol(), "MBT");
            assert_eq!(token.token_decimals(), 18);
            assert_eq!(token.get_owner(), accs.alice);
            assert_eq!(token.balance_of(accs.alice), SUPPLY);
            assert_eq!(test::recorded_events().count(), 1);
        }

        #[ink::test]
        fn transfer_moves_balance() {
            let mut token = deploy();
            let accs = accounts();
            token.transfer(accs.bob, 10).unwrap();
            assert_eq!(token.balance_of(accs.bob), 10);
            assert_eq!(token.balance_of(accs.alice), SUPPLY - 10);

            set_caller(accs.bob);
            assert_eq!(token.transfer(accs.alice, 11), Err(Error::InsufficientBalance));
        }

        #[ink::test]
        fn transfer_from_spends_allowance() {
            let mut token = deploy();
            let accs = accounts();
            token.approve(accs.bob, 30).unwrap();
            token.increase_allowance(accs.bob, 20).unwrap();
            token.decrease_allowance(accs.bob, 10).unwrap();
            assert_eq!(token.allowance(accs.alice, accs.bob), 40);

            set_caller(accs.bob);
            assert_eq!(
                token.transfer_from(accs.alice, accs.charlie, 41),
                Err(Error::InsufficientAllowance)
            );
            token.transfer_from(accs.alice, accs.charlie, 40).unwrap();
            assert_eq!(token.balance_of(accs.charlie), 40);
            assert_eq!(token.allowance(accs.alice, accs.bob), 0);
        }

        #[ink::test]
        fn decrease_below_zero_fails() {
            let mut token = deploy();
            let accs = accounts();
            token.approve(accs.bob, 5).unwrap();
            assert_eq!(
                token.decrease_allowance(accs.bob, 6),
                Err(Error::AllowanceUnderflow)
            );
            assert_eq!(token.allowance(accs.alice, accs.bob), 5);
        }

        #[ink::test]
        fn only_owner_mints() {
            let mut token = deploy();
            let accs = accounts();
            token.mint(100).unwrap();
            assert_eq!(token.total_supply(), SUPPLY + 100);
            assert_eq!(token.balance_of(accs.alice), SUPPLY + 100);

            set_caller(accs.bob);
            assert_eq!(token.mint(1), Err(Error::Unauthorized));
            assert_eq!(token.total_supply(), SUPPLY + 100);
        }
    }
}
