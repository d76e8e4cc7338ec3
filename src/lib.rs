//! Load .bvh motion capture recordings and render their skeletons to PNG stills and
//! looping GIF animations.
//!
//! ```no_run
//! use bvh_motion_viz::{animate::animate, render::FrameRenderer, topology::Topology};
//! use bvh_motion_viz::loader::MotionLoader;
//!
//! let loader = MotionLoader::new("single-person/data/raw_data/indiv_data", 0.001);
//! let samples = loader.load_subject("X05").unwrap();
//! let renderer = FrameRenderer::default();
//! animate(
//!     &renderer,
//!     &samples[0].frames,
//!     &Topology::mocap22(),
//!     "visual_results/X05_sample0.gif".as_ref(),
//!     50,
//!     "X05",
//! )
//! .unwrap();
//! ```

pub mod animate;
pub mod config;
pub mod loader;
pub mod parse;
pub mod render;
pub mod topology;
pub mod types;
mod utils;
