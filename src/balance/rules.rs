use crate::balance::BalanceError;
use crate::models::Account;
use crate::types::{AccountNumber, Monetary};

/// Whether zero-amount operations are accepted.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum AmountPolicy {
    #[default]
    AllowZero,
    RejectZero
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MovementKind {
    Deposit,
    Withdrawal,
    TransferOut,
    TransferIn
}

impl MovementKind {
    pub fn is_debit(&self) -> bool {
        matches!(self, MovementKind::Withdrawal | MovementKind::TransferOut)
    }
}

/// Describes one balance change on one account. Never touches storage.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Movement {
    pub account_number: AccountNumber,
    pub kind: MovementKind,
    pub amount: Monetary,
    pub balance_before: Monetary,
    pub balance_after: Monetary
}

impl Movement {
    pub fn new_balance(&self) -> Monetary {
        self.balance_after
    }
}

pub fn validate_amount(amount: Monetary) -> Result<(), BalanceError> {
    if amount.is_negative() {
        return Err(BalanceError::NegativeAmount { amount });
    }

    Ok(())
}

pub fn check_amount_policy(amount: Monetary, policy: AmountPolicy) -> Result<(), BalanceError> {
    if policy == AmountPolicy::RejectZero && amount.is_zero() {
        return Err(BalanceError::ZeroAmount);
    }

    Ok(())
}

pub fn validate_sufficient(balance: Monetary, amount: Monetary) -> Result<(), BalanceError> {
    if balance < amount {
        return Err(BalanceError::InsufficientBalance { balance, amount });
    }

    Ok(())
}

pub fn apply_deposit(account: &Account, amount: Monetary) -> Result<Movement, BalanceError> {
    credit(account, amount, MovementKind::Deposit)
}

pub fn apply_withdrawal(account: &Account, amount: Monetary) -> Result<Movement, BalanceError> {
    debit(account, amount, MovementKind::Withdrawal)
}

pub fn apply_transfer_out(account: &Account, amount: Monetary) -> Result<Movement, BalanceError> {
    debit(account, amount, MovementKind::TransferOut)
}

pub fn apply_transfer_in(account: &Account, amount: Monetary) -> Result<Movement, BalanceError> {
    credit(account, amount, MovementKind::TransferIn)
}

fn credit(account: &Account, amount: Monetary, kind: MovementKind) -> Result<Movement, BalanceError> {
    validate_amount(amount)?;

    let balance_after = account.balance.checked_add(amount)
        .ok_or_else(|| BalanceError::Overflow { account_number: account.account_number.clone() })?;

    Ok(movement(account, amount, kind, balance_after))
}

fn debit(account: &Account, amount: Monetary, kind: MovementKind) -> Result<Movement, BalanceError> {
    validate_amount(amount)?;
    validate_sufficient(account.balance, amount)?;

    let balance_after = account.balance.checked_sub(amount)
        .ok_or_else(|| BalanceError::Overflow { account_number: account.account_number.clone() })?;

    Ok(movement(account, amount, kind, balance_after))
}

fn movement(account: &Account, amount: Monetary, kind: MovementKind, balance_after: Monetary) -> Movement {
    Movement {
        account_number: account.account_number.clone(),
        kind,
        amount,
        balance_before: account.balance,
        balance_after
    }
}
