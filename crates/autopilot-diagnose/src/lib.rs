pub mod diagnose;
pub mod fix;
pub mod issues;
pub mod resolve;

pub use diagnose::{diagnose_issue, DEFAULT_RADIUS, MAX_RADIUS};
pub use fix::{mock_apply, propose_fix, ApplyError, ApplyRequest, ApplyStrategy, FixProposal};
pub use issues::IssueRow;
pub use resolve::{resolve_file, Resolution};
