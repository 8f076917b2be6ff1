//! Building blocks shared by every liquidity type: errors, fixed-point math and
//! deterministic identities.

pub mod errors;
pub mod fixed_point;
pub mod identifiers;
