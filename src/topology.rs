//! Skeleton topology: which joint hangs off which.

use crate::types::{Index, ParentIndex, ROOT_PARENT};
use std::sync::Arc;

/// Parent table of the 22-joint skeleton recorded in the X05..X09 capture sessions.
pub const MOCAP_22_PARENTS: [ParentIndex; 22] = [
    -1, 0, 1, 2, 3, 4, 4, 6, 7, 8, //
    4, 10, 11, 12, 0, 14, 15, 16, 0, 18, 19, 20,
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("Skeleton topology has no joints")]
    Empty,

    #[error("Joint {joint} has parent {parent}, expected -1 or an index below {len}")]
    ParentOutOfRange {
        joint: Index,
        parent: ParentIndex,
        len: usize,
    },

    #[error("Joint {joint} is part of a parent cycle")]
    Cycle { joint: Index },
}

/// Immutable parent-index table, one entry per joint, `-1` for roots.
///
/// Construction guarantees the table describes a forest: every parent index
/// points inside the table and following parents always ends at a root.
/// Cloning is cheap, so a single topology can be shared by every render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    parents: Arc<[ParentIndex]>,
}

impl Topology {
    pub fn new(parents: Vec<ParentIndex>) -> Result<Self, TopologyError> {
        let len = parents.len();
        if len == 0 {
            return Err(TopologyError::Empty);
        }

        for (joint, &parent) in parents.iter().enumerate() {
            if parent != ROOT_PARENT && (parent < 0 || parent as usize >= len) {
                return Err(TopologyError::ParentOutOfRange { joint, parent, len });
            }
        }

        // any walk longer than the joint count has revisited a joint
        for joint in 0..len {
            let mut current = parents[joint];
            let mut steps = 0;
            while current != ROOT_PARENT {
                steps += 1;
                if steps > len {
                    return Err(TopologyError::Cycle { joint });
                }
                current = parents[current as usize];
            }
        }

        Ok(Topology {
            parents: parents.into(),
        })
    }

    /// The 22-joint table used by the capture sessions this tool was written for.
    pub fn mocap22() -> Self {
        Topology {
            parents: Arc::from(&MOCAP_22_PARENTS[..]),
        }
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn parents(&self) -> &[ParentIndex] {
        &self.parents
    }

    pub fn parent(&self, joint: Index) -> Option<Index> {
        match self.parents.get(joint) {
            Some(&parent) if parent != ROOT_PARENT => Some(parent as Index),
            _ => None,
        }
    }

    /// `(child, parent)` pairs, one per non-root joint, in joint order.
    pub fn edges(&self) -> impl Iterator<Item = (Index, Index)> + '_ {
        (0..self.len()).filter_map(move |joint| self.parent(joint).map(|parent| (joint, parent)))
    }

    pub fn edge_count(&self) -> usize {
        self.parents.iter().filter(|&&parent| parent != ROOT_PARENT).count()
    }

    pub fn roots(&self) -> impl Iterator<Item = Index> + '_ {
        self.parents
            .iter()
            .enumerate()
            .filter(|(_, parent)| **parent == ROOT_PARENT)
            .map(|(joint, _)| joint)
    }
}

impl Default for Topology {
    fn default() -> Self {
        Topology::mocap22()
    }
}

impl TryFrom<Vec<ParentIndex>> for Topology {
    type Error = TopologyError;

    fn try_from(parents: Vec<ParentIndex>) -> Result<Self, Self::Error> {
        Topology::new(parents)
    }
}
