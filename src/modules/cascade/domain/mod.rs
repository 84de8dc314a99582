pub mod decisions;

pub use decisions::{CascadeStep, DeletionOutcome, MerchantDeletion};
