use bvh_motion_viz::animate::{animate, AnimateError};
use bvh_motion_viz::config::ViewConfig;
use bvh_motion_viz::loader::MotionLoader;
use bvh_motion_viz::render::{FrameRenderer, RenderError};
use bvh_motion_viz::topology::{Topology, TopologyError, MOCAP_22_PARENTS};
use bvh_motion_viz::types::{Frame, Position};
use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const TRIPOD_BVH: &str = "HIERARCHY
ROOT Hips
{
  OFFSET 0.0 0.0 0.0
  CHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
  JOINT Spine
  {
    OFFSET 0.0 0.0 400.0
    CHANNELS 3 Zrotation Xrotation Yrotation
    End Site
    {
      OFFSET 0.0 0.0 100.0
    }
  }
  JOINT Leg
  {
    OFFSET 150.0 0.0 -500.0
    CHANNELS 3 Zrotation Xrotation Yrotation
    End Site
    {
      OFFSET 0.0 0.0 -100.0
    }
  }
}
MOTION
Frames: 4
Frame Time: 0.02
0.0 0.0 900.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0
10.0 0.0 900.0 15.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0
20.0 0.0 900.0 30.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0
30.0 0.0 900.0 45.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0
";

/// Deterministic coordinates in [0, 1].
fn unit_frames(num_frames: usize, num_joints: usize) -> Vec<Frame> {
    (0..num_frames)
        .map(|f| {
            (0..num_joints)
                .map(|j| {
                    let t = ((f * 31 + j * 17) % 101) as f64 / 100.0;
                    Position::new(t, 1.0 - t, ((j * 13 + f) % 11) as f64 / 10.0)
                })
                .collect()
        })
        .collect()
}

fn decode_gif(path: &Path) -> Vec<image::Frame> {
    let reader = BufReader::new(File::open(path).unwrap());
    GifDecoder::new(reader)
        .unwrap()
        .into_frames()
        .collect_frames()
        .unwrap()
}

fn delay_ms(frame: &image::Frame) -> f64 {
    let (numer, denom) = frame.delay().numer_denom_ms();
    numer as f64 / denom as f64
}

#[test]
fn ten_frame_mocap_sample_becomes_a_ten_frame_gif() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("visual_results").join("X05_sample0.gif");
    let topology = Topology::new(MOCAP_22_PARENTS.to_vec()).unwrap();
    let renderer = FrameRenderer::new(ViewConfig {
        image_size: 200,
        ..ViewConfig::default()
    });

    let artifact = animate(&renderer, &unit_frames(10, 22), &topology, &path, 50, "X05").unwrap();

    assert_eq!(artifact.frames, 10);
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
    let frames = decode_gif(&path);
    assert_eq!(frames.len(), 10);
    for frame in &frames {
        assert_eq!(frame.buffer().dimensions(), (200, 200));
        assert!((delay_ms(frame) - 20.0).abs() < 1e-9);
    }
}

/// Pixels whose colour differs by more than a little quantization noise.
fn differing_pixels(a: &image::RgbaImage, b: &image::RgbaImage) -> usize {
    a.pixels()
        .zip(b.pixels())
        .filter(|(p, q)| p.0.iter().zip(q.0.iter()).any(|(x, y)| x.abs_diff(*y) > 8))
        .count()
}

#[test]
fn gif_frames_keep_the_sample_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("swing.gif");
    let topology = Topology::new(vec![-1, 0, 1, 0]).unwrap();
    let renderer = FrameRenderer::new(ViewConfig {
        image_size: 160,
        ..ViewConfig::default()
    });

    // an arm swinging round the top of the spine while rising
    let frames: Vec<Frame> = (0..5)
        .map(|f| {
            let angle = (f as f64 * 70.0).to_radians();
            vec![
                Position::new(0.0, 0.0, 0.0),
                Position::new(0.0, 0.0, 1.0),
                Position::new(0.8 * angle.cos(), 0.8 * angle.sin(), 1.0 + 0.1 * f as f64),
                Position::new(0.5, 0.0, -0.5),
            ]
        })
        .collect();
    let expected: Vec<image::RgbaImage> = frames
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            renderer
                .render(frame, &topology, &format!("X05 - frame {}", i))
                .unwrap()
                .image
        })
        .collect();

    animate(&renderer, &frames, &topology, &path, 50, "X05").unwrap();
    let decoded = decode_gif(&path);
    assert_eq!(decoded.len(), frames.len());

    for (i, frame) in decoded.iter().enumerate() {
        let own = differing_pixels(frame.buffer(), &expected[i]);
        assert!(own <= 25, "frame {} differs from its render in {} pixels", i, own);
        for (j, other) in expected.iter().enumerate().filter(|(j, _)| *j != i) {
            let diff = differing_pixels(frame.buffer(), other);
            assert!(
                diff > own + 20,
                "frame {} is as close to render {} ({}) as to its own ({})",
                i,
                j,
                diff,
                own
            );
        }
    }
}

#[test]
fn high_frame_rates_are_refused_instead_of_truncated() {
    let dir = tempfile::tempdir().unwrap();
    let topology = Topology::mocap22();
    let renderer = FrameRenderer::new(ViewConfig {
        image_size: 96,
        ..ViewConfig::default()
    });
    let frames = unit_frames(3, 22);

    let fastest = dir.path().join("fastest.gif");
    let artifact = animate(&renderer, &frames, &topology, &fastest, 100, "X05").unwrap();
    assert_eq!(artifact.frame_delay_ms, 10);
    for frame in decode_gif(&fastest) {
        assert!((delay_ms(&frame) - 10.0).abs() < 1e-9);
    }

    let thirty = dir.path().join("thirty.gif");
    let artifact = animate(&renderer, &frames, &topology, &thirty, 30, "X05").unwrap();
    assert_eq!(artifact.frame_delay_ms, 30);
    assert!((delay_ms(&decode_gif(&thirty)[0]) - 30.0).abs() < 1e-9);

    for fps in [120, 200, 1000] {
        let path = dir.path().join(format!("fps{}.gif", fps));
        assert!(matches!(
            animate(&renderer, &frames, &topology, &path, fps, "X05"),
            Err(AnimateError::InvalidFrameRate(rate)) if rate == fps
        ));
        assert!(!path.exists());
    }
}

#[test]
fn loaded_sequence_animates_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let subject_dir = dir.path().join("data").join("X07");
    std::fs::create_dir_all(&subject_dir).unwrap();
    std::fs::write(subject_dir.join("take_01.bvh"), TRIPOD_BVH).unwrap();

    let loader = MotionLoader::new(dir.path().join("data"), 0.001);
    let subjects = loader.load_subjects(&["X07".to_string()]).unwrap();
    assert_eq!(subjects.len(), 1);
    let sample = &subjects[0].samples[0];
    assert_eq!(sample.num_frames(), 4);
    assert_eq!(sample.num_joints(), 3);
    // millimetres were scaled to metres
    assert!((sample.frames[0][1].z - 1.3).abs() < 1e-9);

    let topology = Topology::new(vec![-1, 0, 0]).unwrap();
    let renderer = FrameRenderer::new(ViewConfig {
        image_size: 128,
        ..ViewConfig::default()
    });
    let path = dir.path().join("out").join("X07_sample0.gif");
    animate(&renderer, &sample.frames, &topology, &path, 25, "X07").unwrap();

    let frames = decode_gif(&path);
    assert_eq!(frames.len(), 4);
    assert!((delay_ms(&frames[0]) - 40.0).abs() < 1e-9);
}

#[test]
fn still_is_rendered_from_one_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("elev-18-azim--10.png");
    let renderer = FrameRenderer::new(ViewConfig {
        elevation: 18.0,
        azimuth: -10.0,
        image_size: 160,
        show_box: true,
    });
    let frame = &unit_frames(1, 22)[0];
    let rendered = renderer
        .save_still(frame, &Topology::mocap22(), "X05 - frame 0", &path)
        .unwrap();
    assert_eq!(rendered.markers, 22);
    assert_eq!(rendered.edges, 21);
    assert_eq!(image::open(&path).unwrap().width(), 160);
}

#[test]
fn out_of_range_parent_is_rejected_before_rendering() {
    let mut parents = MOCAP_22_PARENTS.to_vec();
    parents[5] = 22;
    assert_eq!(
        Topology::new(parents),
        Err(TopologyError::ParentOutOfRange {
            joint: 5,
            parent: 22,
            len: 22
        })
    );
}

#[test]
fn failures_leave_no_file_behind() {
    let dir = tempfile::tempdir().unwrap();
    let topology = Topology::mocap22();
    let renderer = FrameRenderer::new(ViewConfig {
        image_size: 96,
        ..ViewConfig::default()
    });

    let empty = dir.path().join("empty.gif");
    assert!(matches!(
        animate(&renderer, &[], &topology, &empty, 50, "X05"),
        Err(AnimateError::EmptySample)
    ));
    assert!(!empty.exists());

    let mut frames = unit_frames(6, 22);
    frames[4].truncate(20);
    let short = dir.path().join("short.gif");
    match animate(&renderer, &frames, &topology, &short, 50, "X05") {
        Err(AnimateError::Render {
            frame: 4,
            source: RenderError::ShapeMismatch {
                joints: 20,
                topology: 22,
            },
        }) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(!short.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
