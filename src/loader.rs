//! Finds and loads the recorded sequences of each subject.
//!
//! Expected layout: `<root>/<subject>/<sequence>.bvh`.

use crate::config::Config;
use crate::parse::{load_bvh_from_file, BvhError};
use crate::types::MotionSample;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Subject directory {} does not exist", .path.display())]
    MissingSubject { path: PathBuf },

    #[error("Failed to list {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to load {}: {source}", .path.display())]
    Bvh {
        path: PathBuf,
        #[source]
        source: BvhError,
    },

    #[error("{} contains no frames", .path.display())]
    EmptySequence { path: PathBuf },

    #[error("No .bvh sequences found for subject {subject} in {}", .path.display())]
    NoSequences { subject: String, path: PathBuf },
}

/// All samples of one subject, in file name order.
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub id: String,
    pub samples: Vec<MotionSample>,
}

#[derive(Debug, Clone)]
pub struct MotionLoader {
    root: PathBuf,
    unit_scale: f64,
}

impl MotionLoader {
    /// `unit_scale` multiplies every loaded position (0.001 turns millimetres into metres).
    pub fn new(root: impl Into<PathBuf>, unit_scale: f64) -> Self {
        MotionLoader {
            root: root.into(),
            unit_scale,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        MotionLoader::new(config.data_root.clone(), config.unit_scale)
    }

    pub fn subject_dir(&self, subject: &str) -> PathBuf {
        self.root.join(subject)
    }

    /// The .bvh files of `subject`, sorted by file name so sample indices are stable.
    pub fn sequence_paths(&self, subject: &str) -> Result<Vec<PathBuf>, LoadError> {
        let dir = self.subject_dir(subject);
        if !dir.is_dir() {
            return Err(LoadError::MissingSubject { path: dir });
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|source| LoadError::Walk {
                path: dir.clone(),
                source,
            })?;
            let is_bvh = entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("bvh"));
            if entry.file_type().is_file() && is_bvh {
                paths.push(entry.into_path());
            } else {
                log::debug!("Skipping {}", entry.path().display());
            }
        }
        Ok(paths)
    }

    /// Parse one sequence file into scaled global joint positions.
    pub fn load_sequence(&self, path: &Path) -> Result<MotionSample, LoadError> {
        let bvh = load_bvh_from_file(path).map_err(|source| LoadError::Bvh {
            path: path.to_path_buf(),
            source,
        })?;
        if bvh.metadata.num_frames == 0 {
            return Err(LoadError::EmptySequence {
                path: path.to_path_buf(),
            });
        }

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::debug!(
            "Loaded {} ({} joints, {} frames at {} fps)",
            path.display(),
            bvh.num_joints(),
            bvh.metadata.num_frames,
            bvh.metadata.fps
        );
        Ok(bvh.to_motion_sample(name).scaled(self.unit_scale))
    }

    /// Every sequence of `subject`. A subject without sequences is an error.
    pub fn load_subject(&self, subject: &str) -> Result<Vec<MotionSample>, LoadError> {
        let dir = self.subject_dir(subject);
        log::info!("Loading... {}", dir.display());

        let paths = self.sequence_paths(subject)?;
        if paths.is_empty() {
            return Err(LoadError::NoSequences {
                subject: subject.to_string(),
                path: dir,
            });
        }
        paths.iter().map(|path| self.load_sequence(path)).collect()
    }

    /// Load several subjects in the given order. Subjects without any sequence are
    /// reported and skipped; every other failure aborts the whole load.
    pub fn load_subjects(&self, subjects: &[String]) -> Result<Vec<Subject>, LoadError> {
        let mut loaded = Vec::with_capacity(subjects.len());
        for id in subjects {
            match self.load_subject(id) {
                Ok(samples) => loaded.push(Subject {
                    id: id.clone(),
                    samples,
                }),
                Err(err @ LoadError::NoSequences { .. }) => log::warn!("{}", err),
                Err(err) => return Err(err),
            }
        }
        Ok(loaded)
    }
}
