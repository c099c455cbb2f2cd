//! Ownership decision policy: who is a valid owner, and what to do with
//! each record.

pub mod classifier;
pub mod oracle;

pub use classifier::{Classification, Retention, classify, owner_matches};
pub use oracle::MembershipOracle;
