//! Branch resolution: which sibling is shown at a branch point.
//!
//! The selection lives on the *parent* (`metadata.activeBranchIndex`), not on
//! the children, so switching branches is a single metadata write upstream.
//! An absent, negative, or out-of-range index selects the first-created
//! child.

use threadline_types::{BranchDescriptor, Message};

/// The sibling chosen at a branch point.
#[derive(Debug, Clone, Copy)]
pub struct ActiveBranch<'a> {
    pub message: &'a Message,
    pub descriptor: BranchDescriptor,
}

/// Resolve the branch descriptor for `sibling_count` children of `parent`.
///
/// Returns `None` when there is no branch (`sibling_count <= 1`).
pub fn resolve_active_branch(parent: Option<&Message>, sibling_count: usize) -> Option<BranchDescriptor> {
    if sibling_count <= 1 {
        return None;
    }

    let requested = parent.and_then(|p| p.metadata.active_branch_index);
    let index = match requested {
        Some(i) if i >= 0 && (i as u64) < sibling_count as u64 => i as usize,
        Some(i) => {
            tracing::debug!(
                parent = %parent.map(|p| p.id.as_str()).unwrap_or("<root>"),
                requested = i,
                count = sibling_count,
                "activeBranchIndex out of range, using first branch"
            );
            0
        }
        None => 0,
    };

    Some(BranchDescriptor::new(sibling_count, index))
}

/// Resolve and pick the active sibling out of `siblings`.
pub fn select_active_branch<'a>(parent: Option<&Message>, siblings: &[&'a Message]) -> Option<ActiveBranch<'a>> {
    let descriptor = resolve_active_branch(parent, siblings.len())?;
    Some(ActiveBranch {
        message: siblings[descriptor.active_branch_index],
        descriptor,
    })
}
