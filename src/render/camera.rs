use crate::types::Position;
use cgmath::InnerSpace;

/// Cubic viewing volume around one frame.
///
/// The cube is centred on the centroid of the joints and its half extent is half of the
/// largest per-axis span, so all three axes share one scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub center: Position,
    pub half_extent: f64,
}

impl ViewBox {
    /// An empty frame gets the unit box around the origin.
    pub fn from_frame(frame: &[Position]) -> ViewBox {
        let Some(&first) = frame.first() else {
            return ViewBox {
                center: Position::new(0.0, 0.0, 0.0),
                half_extent: 1.0,
            };
        };
        let (mut min, mut max, mut sum) = (first, first, Position::new(0.0, 0.0, 0.0));
        for p in frame {
            min = Position::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
            max = Position::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
            sum += *p;
        }
        let span = max - min;
        let half_extent = span.x.max(span.y).max(span.z) / 2.0;

        ViewBox {
            center: sum / frame.len() as f64,
            // every joint in one spot: keep a unit box instead of dividing by zero
            half_extent: if half_extent > 0.0 { half_extent } else { 1.0 },
        }
    }

    /// Map a point into box space, where the cube spans [-1, 1] on every axis.
    pub fn normalize(&self, p: Position) -> Position {
        (p - self.center) / self.half_extent
    }

    /// Corners of the unit cube in box space. Bit 0 selects +x, bit 1 +y, bit 2 +z.
    pub fn unit_corners() -> [Position; 8] {
        let mut corners = [Position::new(0.0, 0.0, 0.0); 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            let pick = |bit: usize| if i & bit != 0 { 1.0 } else { -1.0 };
            *corner = Position::new(pick(1), pick(2), pick(4));
        }
        corners
    }

    /// The 12 cube edges as pairs of indices into [`ViewBox::unit_corners`].
    pub fn unit_edges() -> impl Iterator<Item = (usize, usize)> {
        (0..8usize).flat_map(|i| {
            [1usize, 2, 4]
                .into_iter()
                .filter(move |bit| i & bit == 0)
                .map(move |bit| (i, i | bit))
        })
    }
}

/// Fixed orthographic camera looking at the origin of box space.
///
/// Same convention as common 3D plotting tools: z is up, the azimuth turns the camera about
/// the z axis starting from +x, the elevation lifts it above the xy plane. Angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    right: Position,
    up: Position,
    toward_viewer: Position,
}

/// Projected point: screen coordinates (x right, y up) and depth (larger is nearer).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected {
    pub x: f64,
    pub y: f64,
    pub depth: f64,
}

impl Camera {
    pub fn new(elevation: f64, azimuth: f64) -> Self {
        let (el, az) = (elevation.to_radians(), azimuth.to_radians());
        Camera {
            right: Position::new(-az.sin(), az.cos(), 0.0),
            up: Position::new(-el.sin() * az.cos(), -el.sin() * az.sin(), el.cos()),
            toward_viewer: Position::new(el.cos() * az.cos(), el.cos() * az.sin(), el.sin()),
        }
    }

    pub fn project(&self, p: Position) -> Projected {
        Projected {
            x: p.dot(self.right),
            y: p.dot(self.up),
            depth: p.dot(self.toward_viewer),
        }
    }
}

/// Square plot area inside the image, sized so the whole box-space cube always fits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Viewport {
    center_x: f64,
    center_y: f64,
    scale: f64,
}

impl Viewport {
    /// `top_margin` pixels are reserved above the plot area (for the title).
    pub fn new(image_size: u32, top_margin: u32) -> Self {
        let size = image_size as f64;
        let margin = top_margin.min(image_size / 2) as f64;
        let radius = (size - margin) / 2.0 * 0.92;
        Viewport {
            center_x: size / 2.0,
            center_y: margin + (size - margin) / 2.0,
            // the cube's projection never reaches further than its half diagonal
            scale: radius / 3f64.sqrt(),
        }
    }

    pub fn to_pixel(&self, p: Projected) -> (f64, f64) {
        (self.center_x + p.x * self.scale, self.center_y - p.y * self.scale)
    }
}
