mod util;

pub mod locals;
pub mod members;
pub mod ownership;
pub mod protocol;

use crate::lint::{LintDescriptor, LintRule};

// Locals
pub use locals::{DisposeCreatedLint, DisposePreviousLint, DontIgnoreCreatedLint};

// Members
pub use members::DisposeMemberLint;

// Ownership
pub use ownership::DontDisposeInjectedLint;

// Dispose pattern
pub use protocol::{CallBaseDisposeLint, SuppressFinalizeThisLint};

/// Every built-in rule, in id order.
pub fn all_rules() -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(DisposeCreatedLint),
        Box::new(DisposeMemberLint),
        Box::new(DisposePreviousLint),
        Box::new(DontIgnoreCreatedLint),
        Box::new(DontDisposeInjectedLint),
        Box::new(CallBaseDisposeLint),
        Box::new(SuppressFinalizeThisLint),
    ]
}

static ALL_DESCRIPTORS: &[&LintDescriptor] = &[
    &locals::DISPOSE_CREATED,
    &members::DISPOSE_MEMBER,
    &locals::DISPOSE_PREVIOUS,
    &locals::DONT_IGNORE_CREATED,
    &ownership::DONT_DISPOSE_INJECTED,
    &protocol::CALL_BASE_DISPOSE,
    &protocol::SUPPRESS_FINALIZE_THIS,
];

pub fn all_descriptors() -> &'static [&'static LintDescriptor] {
    ALL_DESCRIPTORS
}
