use cgmath::{Quaternion as CgQuaternion, Vector3};

/////////////////////////////////////////////////////////////////////////////////////////////////

pub type Index = usize;
pub type ParentIndex = isize; // can be -1 if joint has no parent
pub type Quaternion = CgQuaternion<f64>;
pub type Position = Vector3<f64>;
pub type Depth = usize;

/// Global positions of every joint at one time step, indexed like the skeleton topology.
pub type Frame = Vec<Position>;

/// Sentinel stored in place of a parent index for root joints.
pub const ROOT_PARENT: ParentIndex = -1;

/////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: String,
    pub index: Index,
    pub parent_index: ParentIndex,
    pub depth: Depth,
    pub children: Vec<Index>,
    pub is_leaf: bool,
    pub endsite: Option<Endsite>,
}

impl Joint {
    pub fn is_root(&self) -> bool {
        self.parent_index == ROOT_PARENT
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Endsite {
    pub offset: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BvhMetadata {
    pub joints: Vec<Joint>,
    pub num_frames: usize,
    pub frame_time: f64,
    pub fps: u32,
}

impl BvhMetadata {
    pub fn find_joint_by_index(&self, index: Index) -> Option<&Joint> {
        self.joints.get(index)
    }

    pub fn find_joint_by_name(&self, name: &str) -> Option<&Joint> {
        self.joints.iter().find(|joint| joint.name == name)
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// One animated degree of freedom of a joint, as declared on a `CHANNELS` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Xposition,
    Yposition,
    Zposition,
    Xrotation,
    Yrotation,
    Zrotation,
}

impl Channel {
    pub fn from_name(name: &str) -> Option<Channel> {
        match name {
            "Xposition" => Some(Channel::Xposition),
            "Yposition" => Some(Channel::Yposition),
            "Zposition" => Some(Channel::Zposition),
            "Xrotation" => Some(Channel::Xrotation),
            "Yrotation" => Some(Channel::Yrotation),
            "Zrotation" => Some(Channel::Zrotation),
            _ => None,
        }
    }

    pub fn is_rotation(self) -> bool {
        matches!(
            self,
            Channel::Xrotation | Channel::Yrotation | Channel::Zrotation
        )
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// One recorded performance: the frames of a single sequence file, in time order.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionSample {
    pub name: String,
    pub frame_time: f64,
    pub frames: Vec<Frame>,
}

impl MotionSample {
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Number of joints per frame (0 for an empty sample).
    pub fn num_joints(&self) -> usize {
        self.frames.first().map_or(0, |frame| frame.len())
    }

    /// Multiply every coordinate by `factor` (e.g. 0.001 for millimetres to metres).
    pub fn scaled(mut self, factor: f64) -> MotionSample {
        for frame in self.frames.iter_mut() {
            for position in frame.iter_mut() {
                *position *= factor;
            }
        }
        self
    }
}
