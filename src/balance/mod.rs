mod errors;
mod rules;

pub use errors::BalanceError;
pub use rules::{
    apply_deposit, apply_transfer_in, apply_transfer_out, apply_withdrawal, check_amount_policy, validate_amount,
    validate_sufficient, AmountPolicy, Movement
};
