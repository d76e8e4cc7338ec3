use crate::types::*;
use crate::utils;
use cgmath::{Rotation, Zero};
use regex::Regex;
use std::iter::Enumerate;
use std::path::{Path, PathBuf};
use std::str::Lines;
use std::sync::OnceLock;

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, thiserror::Error)]
pub enum BvhError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected end of file while looking for {expected}")]
    UnexpectedEof { expected: &'static str },

    #[error("Line {line}: malformed `{content}`")]
    Malformed { line: usize, content: String },

    #[error("Line {line}: `{token}` is not a number")]
    InvalidNumber { line: usize, token: String },

    #[error("Line {line}: unknown channel `{name}`")]
    UnknownChannel { line: usize, name: String },

    #[error("Line {line}: CHANNELS declares {declared} channels but lists {found}")]
    ChannelCount {
        line: usize,
        declared: usize,
        found: usize,
    },

    #[error("Line {line}: motion row has {found} values, expected {expected}")]
    MotionWidth {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Header declares {declared} frames but {found} were found")]
    FrameCount { declared: usize, found: usize },

    #[error("Hierarchy contains no joints")]
    NoJoints,

    #[error("Line {line}: unbalanced braces")]
    UnbalancedBraces { line: usize },
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// A parsed .bvh file: the joint hierarchy plus the raw motion rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Bvh {
    pub metadata: BvhMetadata,
    /// OFFSET of each joint relative to its parent (rest pose).
    pub offsets: Vec<Position>,
    /// Channels of each joint, in declaration order.
    pub channels: Vec<Vec<Channel>>,
    /// Column of the first channel of each joint inside a motion row.
    pub channel_start: Vec<Index>,
    /// One row of channel values per frame.
    pub motion: Vec<Vec<f64>>,
}

impl Bvh {
    pub fn num_joints(&self) -> usize {
        self.metadata.joints.len()
    }

    pub fn num_channels(&self) -> usize {
        self.channels.iter().map(Vec::len).sum()
    }

    /// Global joint positions at `frame`. Basically forward kinematics.
    /// Returns `None` if the frame is out of range.
    pub fn global_positions_at(&self, frame: usize) -> Option<Frame> {
        let row = self.motion.get(frame)?;
        let num_joints = self.num_joints();
        let mut positions: Vec<Position> = Vec::with_capacity(num_joints);
        let mut rotations: Vec<Quaternion> = Vec::with_capacity(num_joints);

        for joint in self.metadata.joints.iter() {
            let channels = &self.channels[joint.index];
            let start = self.channel_start[joint.index];
            let values = &row[start..start + channels.len()];

            //// local transform: offset moved by positional channels, rotated by rotational channels
            let translation =
                self.offsets[joint.index] + utils::channels_to_translation(channels, values);
            let rotation = utils::channels_to_quat(channels, values);

            //// joints are stored parents-first, so the parent's global transform is already known
            let (position, rotation) = if joint.is_root() {
                (translation, rotation)
            } else {
                let parent = joint.parent_index as Index;
                (
                    positions[parent] + rotations[parent].rotate_vector(translation),
                    rotations[parent] * rotation,
                )
            };
            positions.push(position);
            rotations.push(rotation);
        }
        Some(positions)
    }

    /// Global joint positions of every frame, in time order.
    pub fn global_positions(&self) -> Vec<Frame> {
        (0..self.motion.len())
            .filter_map(|frame| self.global_positions_at(frame))
            .collect()
    }

    pub fn to_motion_sample(&self, name: impl Into<String>) -> MotionSample {
        MotionSample {
            name: name.into(),
            frame_time: self.metadata.frame_time,
            frames: self.global_positions(),
        }
    }
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn re_joint() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(ROOT|JOINT)\s+(\S+)").expect("joint regex is valid"))
}

fn re_offset() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^OFFSET\s+(.+)$").expect("offset regex is valid"))
}

fn re_channels() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^CHANNELS\s+(\d+)\s*(.*)$").expect("channels regex is valid"))
}

/// Trimmed, non-empty lines together with their 1-based line number.
struct LineReader<'a> {
    lines: Enumerate<Lines<'a>>,
}

impl<'a> LineReader<'a> {
    fn new(text: &'a str) -> Self {
        LineReader {
            lines: text.lines().enumerate(),
        }
    }

    fn next_line(&mut self) -> Option<(usize, &'a str)> {
        for (i, line) in self.lines.by_ref() {
            let line = line.trim();
            if !line.is_empty() {
                return Some((i + 1, line));
            }
        }
        None
    }

    fn expect_line(&mut self, expected: &'static str) -> Result<(usize, &'a str), BvhError> {
        self.next_line()
            .ok_or(BvhError::UnexpectedEof { expected })
    }
}

fn malformed(line: usize, content: &str) -> BvhError {
    BvhError::Malformed {
        line,
        content: content.to_string(),
    }
}

fn parse_numbers(line: usize, text: &str) -> Result<Vec<f64>, BvhError> {
    text.split_whitespace()
        .map(|token| {
            token.parse::<f64>().map_err(|_| BvhError::InvalidNumber {
                line,
                token: token.to_string(),
            })
        })
        .collect()
}

fn parse_offset(line_no: usize, line: &str) -> Result<Position, BvhError> {
    let captures = re_offset()
        .captures(line)
        .ok_or_else(|| malformed(line_no, line))?;
    let offset = parse_numbers(line_no, &captures[1])?;
    if offset.len() != 3 {
        return Err(malformed(line_no, line));
    }
    Ok(Position::new(offset[0], offset[1], offset[2]))
}

fn parse_channels(line_no: usize, line: &str) -> Result<Vec<Channel>, BvhError> {
    let captures = re_channels()
        .captures(line)
        .ok_or_else(|| malformed(line_no, line))?;
    let declared = captures[1]
        .parse::<usize>()
        .map_err(|_| malformed(line_no, line))?;
    let channels = captures[2]
        .split_whitespace()
        .map(|name| {
            Channel::from_name(name).ok_or_else(|| BvhError::UnknownChannel {
                line: line_no,
                name: name.to_string(),
            })
        })
        .collect::<Result<Vec<Channel>, BvhError>>()?;
    if channels.len() != declared {
        return Err(BvhError::ChannelCount {
            line: line_no,
            declared,
            found: channels.len(),
        });
    }
    Ok(channels)
}

/// Value after the `:` of a `Frames:` / `Frame Time:` header line.
fn header_value<'a>(line_no: usize, line: &'a str, key: &str) -> Result<&'a str, BvhError> {
    line.strip_prefix(key)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| malformed(line_no, line))
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn parse_bvh(text: &str) -> Result<Bvh, BvhError> {
    let mut reader = LineReader::new(text);

    let mut joints: Vec<Joint> = Vec::new();
    let mut offsets: Vec<Position> = Vec::new();
    let mut channels: Vec<Vec<Channel>> = Vec::new();
    let mut channel_start: Vec<Index> = Vec::new();
    let mut num_channels = 0;

    // open `{ }` blocks: Some(joint) for joints, None for end sites
    let mut stack: Vec<Option<Index>> = Vec::new();
    // block declared on the previous line, waiting for its `{`
    let mut pending: Option<Option<Index>> = None;

    //// PARSING HIERARCHY
    loop {
        let (line_no, line) = reader.expect_line("MOTION")?;

        if line.starts_with("HIERARCHY") {
            continue;
        } else if line.starts_with("ROOT") || line.starts_with("JOINT") {
            //// Create joint
            let captures = re_joint()
                .captures(line)
                .ok_or_else(|| malformed(line_no, line))?;
            let index = joints.len();
            let parent_index = stack
                .iter()
                .rev()
                .find_map(|block| *block)
                .map_or(ROOT_PARENT, |parent| parent as ParentIndex);

            //// If joint has a parent, add this joint to its parent's children
            if parent_index != ROOT_PARENT {
                joints[parent_index as Index].children.push(index);
            }
            joints.push(Joint {
                name: captures[2].to_string(),
                index,
                parent_index,
                children: Vec::new(),
                is_leaf: false,
                endsite: None,
                depth: stack.len(),
            });
            offsets.push(Position::zero());
            channels.push(Vec::new());
            channel_start.push(num_channels);
            pending = Some(Some(index));
        } else if line.to_lowercase().starts_with("end") {
            //// Create endsite
            if joints.is_empty() {
                return Err(malformed(line_no, line));
            }
            pending = Some(None);
        } else if line == "{" {
            let block = pending
                .take()
                .ok_or(BvhError::UnbalancedBraces { line: line_no })?;
            stack.push(block);
        } else if line == "}" {
            stack
                .pop()
                .ok_or(BvhError::UnbalancedBraces { line: line_no })?;
        } else if line.starts_with("OFFSET") {
            //// Parse offset
            let offset = parse_offset(line_no, line)?;
            match stack.last() {
                Some(Some(joint)) => offsets[*joint] = offset,
                Some(None) => {
                    let owner = stack
                        .iter()
                        .rev()
                        .find_map(|block| *block)
                        .ok_or_else(|| malformed(line_no, line))?;
                    joints[owner].endsite = Some(Endsite { offset });
                    joints[owner].is_leaf = true;
                }
                None => return Err(malformed(line_no, line)),
            }
        } else if line.starts_with("CHANNELS") {
            //// Parse channels
            let joint = match stack.last() {
                Some(Some(joint)) => *joint,
                _ => return Err(malformed(line_no, line)),
            };
            let joint_channels = parse_channels(line_no, line)?;
            channel_start[joint] = num_channels;
            num_channels += joint_channels.len();
            channels[joint] = joint_channels;
        } else if line.starts_with("MOTION") {
            if !stack.is_empty() || pending.is_some() {
                return Err(BvhError::UnbalancedBraces { line: line_no });
            }
            break; // jump to parsing Motion
        } else {
            return Err(malformed(line_no, line));
        }
    }

    if joints.is_empty() {
        return Err(BvhError::NoJoints);
    }

    //// Parse number of frames
    let (line_no, line) = reader.expect_line("Frames:")?;
    let num_frames = header_value(line_no, line, "Frames:")?
        .parse::<usize>()
        .map_err(|_| malformed(line_no, line))?;

    //// Parse frame time
    let (line_no, line) = reader.expect_line("Frame Time:")?;
    let frame_time = header_value(line_no, line, "Frame Time:")?
        .parse::<f64>()
        .ok()
        .filter(|t| t.is_finite() && *t > 0.0 && (1.0 / *t) <= u32::MAX as f64)
        .ok_or_else(|| malformed(line_no, line))?;
    let fps = (1.0 / frame_time).round() as u32;

    /////////////////////////////////// PARSING MOTION ///////////////////////////////////
    let mut motion: Vec<Vec<f64>> = Vec::with_capacity(num_frames);
    while let Some((line_no, line)) = reader.next_line() {
        let row = parse_numbers(line_no, line)?;
        if row.len() != num_channels {
            return Err(BvhError::MotionWidth {
                line: line_no,
                expected: num_channels,
                found: row.len(),
            });
        }
        motion.push(row);
    }
    if motion.len() != num_frames {
        return Err(BvhError::FrameCount {
            declared: num_frames,
            found: motion.len(),
        });
    }

    Ok(Bvh {
        metadata: BvhMetadata {
            joints,
            num_frames,
            frame_time,
            fps,
        },
        offsets,
        channels,
        channel_start,
        motion,
    })
}

//////////////////////////////////////////////////////////////// PUBLIC ///////////////////////////////////////////////////////////////////////////////

/// load a bvh file from a file path
pub fn load_bvh_from_file(file_path: impl AsRef<Path>) -> Result<Bvh, BvhError> {
    let file_path = file_path.as_ref();
    let contents = std::fs::read_to_string(file_path).map_err(|source| BvhError::Io {
        path: file_path.to_path_buf(),
        source,
    })?;
    parse_bvh(&contents)
}

/// load a bvh file from a string
pub fn load_bvh_from_string(bvh_string: &str) -> Result<Bvh, BvhError> {
    parse_bvh(bvh_string)
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use cgmath::InnerSpace;

    pub(crate) const SMALL_BVH: &str = "HIERARCHY
ROOT Hips
{
  OFFSET 0.00 0.00 0.00
  CHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
  JOINT Spine
  {
    OFFSET 0.00 10.00 0.00
    CHANNELS 3 Zrotation Xrotation Yrotation
    End Site
    {
      OFFSET 0.00 5.00 0.00
    }
  }
  JOINT LeftUpLeg
  {
    OFFSET 3.00 0.00 0.00
    CHANNELS 3 Zrotation Xrotation Yrotation
    End Site
    {
      OFFSET 0.00 -8.00 0.00
    }
  }
}
MOTION
Frames: 2
Frame Time: 0.0083333
1.0 2.0 3.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0
0.0 0.0 0.0 90.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0
";

    fn assert_close(a: Position, b: Position) {
        assert!((a - b).magnitude() < 1e-9, "{:?} != {:?}", a, b);
    }

    #[test]
    fn parses_hierarchy() {
        let bvh = load_bvh_from_string(SMALL_BVH).unwrap();
        let metadata = &bvh.metadata;

        assert_eq!(metadata.joints.len(), 3);
        assert_eq!(metadata.num_frames, 2);
        assert_eq!(metadata.fps, 120);

        let hips = metadata.find_joint_by_name("Hips").unwrap();
        assert!(hips.is_root());
        assert_eq!(hips.depth, 0);
        assert_eq!(hips.children, vec![1, 2]);
        assert!(!hips.is_leaf);

        let leg = metadata.find_joint_by_index(2).unwrap();
        assert_eq!(leg.name, "LeftUpLeg");
        assert_eq!(leg.parent_index, 0);
        assert_eq!(leg.depth, 1);
        assert!(leg.is_leaf);
        assert_close(leg.endsite.unwrap().offset, Position::new(0.0, -8.0, 0.0));

        assert_eq!(bvh.num_channels(), 12);
        assert_eq!(bvh.channel_start, vec![0, 6, 9]);
        assert_close(bvh.offsets[1], Position::new(0.0, 10.0, 0.0));
    }

    #[test]
    fn forward_kinematics() {
        let bvh = load_bvh_from_string(SMALL_BVH).unwrap();
        let frames = bvh.global_positions();
        assert_eq!(frames.len(), 2);

        // frame 0: pure translation of the root
        assert_close(frames[0][0], Position::new(1.0, 2.0, 3.0));
        assert_close(frames[0][1], Position::new(1.0, 12.0, 3.0));
        assert_close(frames[0][2], Position::new(4.0, 2.0, 3.0));

        // frame 1: root turned 90 degrees about z carries its children
        assert_close(frames[1][0], Position::new(0.0, 0.0, 0.0));
        assert_close(frames[1][1], Position::new(-10.0, 0.0, 0.0));
        assert_close(frames[1][2], Position::new(0.0, 3.0, 0.0));

        assert!(bvh.global_positions_at(2).is_none());
    }

    #[test]
    fn motion_sample_keeps_frame_order() {
        let sample = load_bvh_from_string(SMALL_BVH)
            .unwrap()
            .to_motion_sample("walk")
            .scaled(0.5);
        assert_eq!(sample.name, "walk");
        assert_eq!(sample.num_frames(), 2);
        assert_eq!(sample.num_joints(), 3);
        assert_close(sample.frames[0][1], Position::new(0.5, 6.0, 1.5));
    }

    #[test]
    fn rejects_short_motion_rows() {
        let text = SMALL_BVH.replace("1.0 2.0 3.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0", "1.0 2.0");
        match load_bvh_from_string(&text) {
            Err(BvhError::MotionWidth {
                expected, found, ..
            }) => {
                assert_eq!(expected, 12);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn rejects_frame_count_mismatch() {
        let text = SMALL_BVH.replace("Frames: 2", "Frames: 3");
        assert!(matches!(
            load_bvh_from_string(&text),
            Err(BvhError::FrameCount {
                declared: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn rejects_unknown_channels_and_bad_numbers() {
        let text = SMALL_BVH.replace("CHANNELS 3 Zrotation Xrotation Yrotation", "CHANNELS 3 Zrotation Xrotation Wrotation");
        assert!(matches!(
            load_bvh_from_string(&text),
            Err(BvhError::UnknownChannel { line: 9, .. })
        ));

        let text = SMALL_BVH.replace("OFFSET 3.00 0.00 0.00", "OFFSET 3.00 abc 0.00");
        assert!(matches!(
            load_bvh_from_string(&text),
            Err(BvhError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn rejects_truncated_files() {
        let truncated = &SMALL_BVH[..SMALL_BVH.find("MOTION").unwrap()];
        assert!(matches!(
            load_bvh_from_string(truncated),
            Err(BvhError::UnexpectedEof { expected: "MOTION" })
        ));
        assert!(matches!(
            load_bvh_from_string("HIERARCHY\nMOTION\nFrames: 0\nFrame Time: 0.1\n"),
            Err(BvhError::NoJoints)
        ));
        assert!(matches!(
            load_bvh_from_string("HIERARCHY\n}\n"),
            Err(BvhError::UnbalancedBraces { line: 2 })
        ));
    }

    #[test]
    fn rejects_unusable_frame_times() {
        for bad in ["0", "-0.01", "inf", "NaN", "1e-12"] {
            let text = SMALL_BVH.replace("Frame Time: 0.0083333", &format!("Frame Time: {}", bad));
            match load_bvh_from_string(&text) {
                Err(BvhError::Malformed { line, content }) => {
                    assert_eq!(line, 27);
                    assert!(content.contains(bad));
                }
                other => panic!("`{}` gave {:?}", bad, other),
            }
        }

        let text = SMALL_BVH.replace("Frame Time: 0.0083333", "Frame Time: 2.0");
        assert_eq!(load_bvh_from_string(&text).unwrap().metadata.fps, 1);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            load_bvh_from_file("/definitely/not/here.bvh"),
            Err(BvhError::Io { .. })
        ));
    }
}
