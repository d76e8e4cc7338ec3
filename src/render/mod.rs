//! Rasterizes one frame of a skeleton: joint markers, bones, joint indices and a title.

mod camera;
mod canvas;
mod font;

pub use camera::{Camera, Projected, ViewBox};

use crate::config::{ViewConfig, MIN_IMAGE_SIZE};
use crate::topology::Topology;
use crate::types::{Index, Position};
use camera::Viewport;
use canvas::Canvas;
use image::RgbaImage;
use std::path::{Path, PathBuf};

const BACKGROUND: [u8; 4] = [255, 255, 255, 255];
const MARKER_COLOR: [u8; 4] = [31, 61, 214, 255];
const EDGE_COLOR: [u8; 4] = [214, 39, 40, 255];
const LABEL_COLOR: [u8; 4] = [0, 0, 0, 255];
const BOX_COLOR: [u8; 4] = [190, 190, 190, 255];

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Frame has {joints} joints but the skeleton topology has {topology}")]
    ShapeMismatch { joints: usize, topology: usize },

    #[error("Joint {joint} has a non-finite coordinate")]
    NonFiniteCoordinate { joint: Index },

    #[error("Image size must be at least {min} pixels, got {size}")]
    ImageTooSmall { size: u32, min: u32 },

    #[error("Failed to create {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// A rendered frame together with what was drawn into it.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub image: RgbaImage,
    /// The cube the frame was fitted into.
    pub view: ViewBox,
    pub markers: usize,
    pub edges: usize,
    pub labels: usize,
}

/// Draws frames with a fixed camera and image size.
#[derive(Debug, Clone)]
pub struct FrameRenderer {
    config: ViewConfig,
    camera: Camera,
}

impl FrameRenderer {
    pub fn new(config: ViewConfig) -> Self {
        FrameRenderer {
            camera: Camera::new(config.elevation, config.azimuth),
            config,
        }
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// Scale of the index labels; the title is drawn twice as large.
    fn label_scale(&self) -> u32 {
        (self.config.image_size / 250).max(1)
    }

    fn marker_radius(&self) -> f64 {
        (self.config.image_size as f64 / 160.0).max(2.0)
    }

    fn edge_width(&self) -> f64 {
        (self.config.image_size as f64 / 250.0).max(1.0)
    }

    /// Height of the band reserved for the title above the plot area.
    fn title_band(&self) -> u32 {
        (font::GLYPH_HEIGHT + 4) * self.label_scale() * 2
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(self.config.image_size, self.title_band())
    }

    /// Pixel position of `p` once the frame has been fitted into `view`.
    fn pixel_of(&self, view: &ViewBox, p: Position) -> (f64, f64) {
        self.viewport().to_pixel(self.camera.project(view.normalize(p)))
    }

    fn check_input(&self, frame: &[Position], topology: &Topology) -> Result<(), RenderError> {
        if frame.len() != topology.len() {
            return Err(RenderError::ShapeMismatch {
                joints: frame.len(),
                topology: topology.len(),
            });
        }
        if let Some(joint) = frame
            .iter()
            .position(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
        {
            return Err(RenderError::NonFiniteCoordinate { joint });
        }
        if self.config.image_size < MIN_IMAGE_SIZE {
            return Err(RenderError::ImageTooSmall {
                size: self.config.image_size,
                min: MIN_IMAGE_SIZE,
            });
        }
        Ok(())
    }

    /// Render `frame` (one position per joint of `topology`) with `label` as the title.
    pub fn render(
        &self,
        frame: &[Position],
        topology: &Topology,
        label: &str,
    ) -> Result<RenderedImage, RenderError> {
        self.check_input(frame, topology)?;
        let view = ViewBox::from_frame(frame);

        let size = self.config.image_size;
        let label_scale = self.label_scale();
        let title_scale = label_scale * 2;
        let title_band = self.title_band();
        let viewport = self.viewport();

        let to_pixel = |p: Position| viewport.to_pixel(self.camera.project(p));
        let projected: Vec<Projected> = frame
            .iter()
            .map(|&p| self.camera.project(view.normalize(p)))
            .collect();
        let pixels: Vec<(f64, f64)> = projected.iter().map(|&p| viewport.to_pixel(p)).collect();

        let mut canvas = Canvas::new(size, size, BACKGROUND);

        //// view box wireframe with axis letters
        if self.config.show_box {
            let corners = ViewBox::unit_corners();
            for (a, b) in ViewBox::unit_edges() {
                canvas.line(to_pixel(corners[a]), to_pixel(corners[b]), 1.0, BOX_COLOR);
            }
            for (letter, corner) in [("X", 1), ("Y", 2), ("Z", 4)] {
                let (x, y) = to_pixel((corners[0] + corners[corner]) / 2.0);
                canvas.text_above(x, y - 2.0, letter, label_scale, LABEL_COLOR);
            }
        }

        //// bones: one segment from every joint to its parent
        let mut edges = 0;
        for (child, parent) in topology.edges() {
            canvas.line(pixels[child], pixels[parent], self.edge_width(), EDGE_COLOR);
            edges += 1;
        }

        //// joints, far ones first so near ones stay on top
        let mut order: Vec<Index> = (0..frame.len()).collect();
        order.sort_by(|&a, &b| projected[a].depth.total_cmp(&projected[b].depth));
        let radius = self.marker_radius();
        for &joint in order.iter() {
            let (x, y) = pixels[joint];
            canvas.fill_disk(x, y, radius, MARKER_COLOR);
        }

        //// joint indices just above their markers
        let mut labels = 0;
        for &joint in order.iter() {
            let (x, y) = pixels[joint];
            canvas.text_above(x, y - radius - 1.0, &joint.to_string(), label_scale, LABEL_COLOR);
            labels += 1;
        }

        canvas.text_above(
            size as f64 / 2.0,
            title_band as f64 - 2.0 * title_scale as f64,
            label,
            title_scale,
            LABEL_COLOR,
        );

        Ok(RenderedImage {
            image: canvas.into_image(),
            view,
            markers: order.len(),
            edges,
            labels,
        })
    }

    /// Render `frame` and write it as a PNG to `path`, creating parent directories.
    pub fn save_still(
        &self,
        frame: &[Position],
        topology: &Topology,
        label: &str,
        path: &Path,
    ) -> Result<RenderedImage, RenderError> {
        let rendered = self.render(frame, topology, label)?;
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| RenderError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        rendered
            .image
            .save_with_format(path, image::ImageFormat::Png)?;
        log::info!("Still saved to: {}", path.display());
        Ok(rendered)
    }
}

impl Default for FrameRenderer {
    fn default() -> Self {
        FrameRenderer::new(ViewConfig::default())
    }
}
