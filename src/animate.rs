//! Turns a whole motion sample into one looping GIF.

use crate::render::{FrameRenderer, RenderError};
use crate::topology::Topology;
use crate::types::Frame;
use image::codecs::gif::{GifEncoder, Repeat};
use image::Delay;
use std::path::{Path, PathBuf};

/// NeuQuant sampling factor used for every frame (1 is slowest/best, 30 fastest).
const GIF_QUANTIZER_SPEED: i32 = 10;

/// GIF frame delays are whole centiseconds, so nothing faster than one frame per 10 ms plays back.
pub const MAX_FRAME_RATE: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum AnimateError {
    #[error("Motion sample has no frames")]
    EmptySample,

    #[error("Frame rate must be between 1 and 100 fps, got {0}")]
    InvalidFrameRate(u32),

    #[error("Failed to render frame {frame}: {source}")]
    Render {
        frame: usize,
        #[source]
        source: RenderError,
    },

    #[error("Failed to encode GIF: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The animation written by [`animate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub frames: usize,
    /// Requested playback rate.
    pub fps: u32,
    /// Delay stored with every frame, `1000 / fps` rounded to whole centiseconds.
    pub frame_delay_ms: u32,
    pub bytes: u64,
}

/// Per-frame delay in milliseconds for `fps`, as GIF can store it.
pub fn frame_delay_ms(fps: u32) -> u32 {
    let centiseconds = (100.0 / fps.max(1) as f64).round().max(1.0) as u32;
    centiseconds * 10
}

/// Render every frame of a sample in order and write them to `output_path` as a GIF
/// playing at `fps` and looping forever.
///
/// Either the whole animation is written or nothing is: frames are encoded in memory
/// and the file only appears once the last frame has been rendered. An existing file
/// at `output_path` is replaced.
pub fn animate(
    renderer: &FrameRenderer,
    frames: &[Frame],
    topology: &Topology,
    output_path: &Path,
    fps: u32,
    label: &str,
) -> Result<Artifact, AnimateError> {
    if !(1..=MAX_FRAME_RATE).contains(&fps) {
        return Err(AnimateError::InvalidFrameRate(fps));
    }
    if frames.is_empty() {
        return Err(AnimateError::EmptySample);
    }

    let bytes = encode_gif(renderer, frames, topology, fps, label)?;
    write_replacing(output_path, &bytes)?;
    log::info!("GIF saved to: {}", output_path.display());

    Ok(Artifact {
        path: output_path.to_path_buf(),
        frames: frames.len(),
        fps,
        frame_delay_ms: frame_delay_ms(fps),
        bytes: bytes.len() as u64,
    })
}

fn frame_title(label: &str, index: usize) -> String {
    if label.is_empty() {
        format!("frame {index}")
    } else {
        format!("{label} - frame {index}")
    }
}

fn encode_gif(
    renderer: &FrameRenderer,
    frames: &[Frame],
    topology: &Topology,
    fps: u32,
    label: &str,
) -> Result<Vec<u8>, AnimateError> {
    let mut bytes = Vec::new();
    {
        // the encoder writes the GIF trailer when it is dropped at the end of this block
        let mut encoder = GifEncoder::new_with_speed(&mut bytes, GIF_QUANTIZER_SPEED);
        encoder.set_repeat(Repeat::Infinite)?;
        let delay = Delay::from_numer_denom_ms(frame_delay_ms(fps), 1);

        for (index, frame) in frames.iter().enumerate() {
            let rendered = renderer
                .render(frame, topology, &frame_title(label, index))
                .map_err(|source| AnimateError::Render {
                    frame: index,
                    source,
                })?;
            encoder.encode_frame(image::Frame::from_parts(rendered.image, 0, 0, delay))?;
            log::debug!("Rendered frame {}/{}", index + 1, frames.len());
        }
    }
    Ok(bytes)
}

/// `<file name>.partial` next to `path`.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

/// Write `bytes` to a temporary sibling of `path`, then move it over `path`.
fn write_replacing(path: &Path, bytes: &[u8]) -> Result<(), AnimateError> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| AnimateError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let partial = partial_path(path);
    let written = std::fs::write(&partial, bytes).and_then(|_| std::fs::rename(&partial, path));
    if let Err(source) = written {
        let _ = std::fs::remove_file(&partial);
        return Err(AnimateError::Io {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}
