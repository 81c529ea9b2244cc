//! Bounded walk over validated acknowledgment edges.
//!
//! Edges point from an asking group to the groups that validated it. The
//! relation may contain cycles, so the walk is breadth-first with a
//! visited set keyed by group id and a depth cap.

use std::collections::{HashSet, VecDeque};

use guild_types::GroupId;

/// Result of a walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reach {
    pub found: bool,
    /// Distinct groups examined.
    pub visited: usize,
    /// Some frontier groups sat at the depth cap and were not expanded.
    pub truncated: bool,
}

/// Walk from `start` towards its validators, looking for a group for which
/// `is_target` holds. `start` itself is at depth 0 and is checked first.
pub fn reaches<E>(
    start: GroupId,
    max_depth: usize,
    mut validators_of: impl FnMut(GroupId) -> Result<Vec<GroupId>, E>,
    is_target: impl Fn(GroupId) -> bool,
) -> Result<Reach, E> {
    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([(start, 0usize)]);
    let mut truncated = false;

    while let Some((group, depth)) = queue.pop_front() {
        if is_target(group) {
            return Ok(Reach {
                found: true,
                visited: visited.len(),
                truncated,
            });
        }
        if depth >= max_depth {
            truncated = true;
            continue;
        }
        for validator in validators_of(group)? {
            if visited.insert(validator) {
                queue.push_back((validator, depth + 1));
            }
        }
    }

    Ok(Reach {
        found: false,
        visited: visited.len(),
        truncated,
    })
}
