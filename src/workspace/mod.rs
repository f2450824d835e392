//! Local checkouts of component test repositories.

mod checkout;
mod git;

pub use checkout::TestCheckout;
