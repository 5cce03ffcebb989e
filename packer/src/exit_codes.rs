//! Stable exit codes for the packer CLI.

/// Every unit was deployed or unchanged.
pub const OK: i32 = 0;
/// The run could not start or finish (bad config, unit list, or change log).
pub const INVALID: i32 = 1;
/// At least one unit failed; units that succeeded were still recorded.
pub const UNIT_FAILED: i32 = 2;
