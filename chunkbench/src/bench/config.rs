//! Benchmark configuration.

use std::path::{Path, PathBuf};

use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::container::ArrayShape;

/// The maximum image width and height.
pub const MAX_IMAGE_DIM: u64 = 8000;

/// The suffix of the raw output file.
pub const RAW_SUFFIX: &str = ".raw";

/// The suffix of the container output file.
pub const CONTAINER_SUFFIX: &str = ".h5";

/// The name of the dataset written to the container.
pub const DATASET_NAME: &str = "data";

/// How chunks are written to the container.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteStrategy {
    /// Write whole chunks with [`Container::write_chunk_direct`](crate::container::Container::write_chunk_direct).
    #[default]
    #[display("direct")]
    Direct,
    /// Select each chunk region and write it with [`Container::store_array_subset`](crate::container::Container::store_array_subset).
    #[display("traditional")]
    Traditional,
}

/// A configuration error.
///
/// Every configuration error is detected before any file is touched.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An image dimension or the image count is zero.
    #[error("nx, ny and nimages must be positive and non-zero, got nx={nx}, ny={ny}, nimages={n_images}")]
    ZeroDimension {
        /// The image width.
        nx: u64,
        /// The image height.
        ny: u64,
        /// The image count.
        n_images: u64,
    },
    /// The chunk size is zero.
    #[error("chunk_size must be positive and non-zero")]
    ZeroChunkSize,
    /// An image dimension exceeds [`MAX_IMAGE_DIM`].
    #[error("nx and ny must not be larger than {MAX_IMAGE_DIM}, got nx={nx}, ny={ny}")]
    DimensionTooLarge {
        /// The image width.
        nx: u64,
        /// The image height.
        ny: u64,
    },
    /// The image count is not a multiple of the chunk size.
    #[error("image number {n_images} is not a multiple of chunk size {chunk_size}")]
    NotMultipleOfChunkSize {
        /// The image count.
        n_images: u64,
        /// The chunk size.
        chunk_size: u64,
    },
    /// The chunk does not fit in the address space.
    #[error("a chunk of {nx}x{ny}x{chunk_size} bytes cannot be addressed on this platform")]
    ChunkTooLarge {
        /// The image width.
        nx: u64,
        /// The image height.
        ny: u64,
        /// The chunk size.
        chunk_size: u64,
    },
    /// The total size of the workload does not fit in 64 bits.
    #[error("{n_images} images of {nx}x{ny} bytes exceed the addressable size")]
    TotalTooLarge {
        /// The image width.
        nx: u64,
        /// The image height.
        ny: u64,
        /// The image count.
        n_images: u64,
    },
    /// The output base name is empty.
    #[error("the output base name must not be empty")]
    EmptyBasename,
}

/// A validated benchmark configuration.
///
/// Created with [`BenchmarkConfig::builder`].
/// The container array has shape `(n_images, ny, nx)` and chunk shape `(chunk_size, ny, nx)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BenchmarkConfig {
    nx: u64,
    ny: u64,
    n_images: u64,
    chunk_size: u64,
    basename: PathBuf,
    strategy: WriteStrategy,
    json: Option<PathBuf>,
    sentinel: u8,
    cpu_time: bool,
    node_info: bool,
}

impl BenchmarkConfig {
    /// Create a [`BenchmarkConfigBuilder`].
    #[must_use]
    pub fn builder() -> BenchmarkConfigBuilder {
        BenchmarkConfigBuilder::default()
    }

    /// The image width.
    #[must_use]
    pub fn nx(&self) -> u64 {
        self.nx
    }

    /// The image height.
    #[must_use]
    pub fn ny(&self) -> u64 {
        self.ny
    }

    /// The image count.
    #[must_use]
    pub fn n_images(&self) -> u64 {
        self.n_images
    }

    /// The number of images per chunk.
    #[must_use]
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// The output base name.
    #[must_use]
    pub fn basename(&self) -> &Path {
        &self.basename
    }

    /// The container write strategy.
    #[must_use]
    pub fn strategy(&self) -> WriteStrategy {
        self.strategy
    }

    /// The path that JSON records are appended to, if any.
    #[must_use]
    pub fn json(&self) -> Option<&Path> {
        self.json.as_deref()
    }

    /// The byte value of the workload.
    #[must_use]
    pub fn sentinel(&self) -> u8 {
        self.sentinel
    }

    /// Whether CPU time is measured and reported.
    #[must_use]
    pub fn cpu_time(&self) -> bool {
        self.cpu_time
    }

    /// Whether host identification is reported.
    #[must_use]
    pub fn node_info(&self) -> bool {
        self.node_info
    }

    /// The number of chunk writes, `n_images / chunk_size`.
    #[must_use]
    pub fn ncalls(&self) -> u64 {
        self.n_images / self.chunk_size
    }

    /// The size of one chunk in bytes.
    #[must_use]
    pub fn chunk_bytes(&self) -> usize {
        // validated by the builder
        usize::try_from(self.nx * self.ny * self.chunk_size).unwrap_or(usize::MAX)
    }

    /// The total number of bytes written per phase, `n_images * ny * nx`.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        // validated by the builder
        self.n_images.saturating_mul(self.nx * self.ny)
    }

    /// The raw output path, `<basename>.raw`.
    #[must_use]
    pub fn raw_path(&self) -> PathBuf {
        with_suffix(&self.basename, RAW_SUFFIX)
    }

    /// The container output path, `<basename>.h5`.
    #[must_use]
    pub fn container_path(&self) -> PathBuf {
        with_suffix(&self.basename, CONTAINER_SUFFIX)
    }

    /// The container array shape, `(n_images, ny, nx)`.
    #[must_use]
    pub fn array_shape(&self) -> ArrayShape {
        vec![self.n_images, self.ny, self.nx]
    }

    /// The container chunk shape, `(chunk_size, ny, nx)`.
    #[must_use]
    pub fn chunk_shape(&self) -> ArrayShape {
        vec![self.chunk_size, self.ny, self.nx]
    }
}

fn with_suffix(basename: &Path, suffix: &str) -> PathBuf {
    let mut path = basename.as_os_str().to_owned();
    path.push(suffix);
    PathBuf::from(path)
}

/// A [`BenchmarkConfig`] builder.
///
/// The defaults are
///  - 64x32 images, 100 of them, 10 per chunk,
///  - the base name `chunkbench` in the working directory,
///  - the [`Direct`](WriteStrategy::Direct) strategy,
///  - no JSON output,
///  - the sentinel `42`, and
///  - CPU time and host identification enabled.
#[derive(Clone, Debug)]
pub struct BenchmarkConfigBuilder {
    nx: u64,
    ny: u64,
    n_images: u64,
    chunk_size: u64,
    basename: PathBuf,
    strategy: WriteStrategy,
    json: Option<PathBuf>,
    sentinel: u8,
    cpu_time: bool,
    node_info: bool,
}

impl Default for BenchmarkConfigBuilder {
    fn default() -> Self {
        Self {
            nx: 64,
            ny: 32,
            n_images: 100,
            chunk_size: 10,
            basename: PathBuf::from("chunkbench"),
            strategy: WriteStrategy::default(),
            json: None,
            sentinel: 42,
            cpu_time: true,
            node_info: true,
        }
    }
}

impl BenchmarkConfigBuilder {
    /// Set the image width.
    pub fn nx(&mut self, nx: u64) -> &mut Self {
        self.nx = nx;
        self
    }

    /// Set the image height.
    pub fn ny(&mut self, ny: u64) -> &mut Self {
        self.ny = ny;
        self
    }

    /// Set the image count.
    pub fn n_images(&mut self, n_images: u64) -> &mut Self {
        self.n_images = n_images;
        self
    }

    /// Set the number of images per chunk.
    pub fn chunk_size(&mut self, chunk_size: u64) -> &mut Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the output base name.
    pub fn basename(&mut self, basename: impl Into<PathBuf>) -> &mut Self {
        self.basename = basename.into();
        self
    }

    /// Set the container write strategy.
    pub fn strategy(&mut self, strategy: WriteStrategy) -> &mut Self {
        self.strategy = strategy;
        self
    }

    /// Set the path that JSON records are appended to.
    pub fn json(&mut self, json: Option<PathBuf>) -> &mut Self {
        self.json = json;
        self
    }

    /// Set the byte value of the workload.
    pub fn sentinel(&mut self, sentinel: u8) -> &mut Self {
        self.sentinel = sentinel;
        self
    }

    /// Enable or disable CPU time measurement.
    pub fn cpu_time(&mut self, cpu_time: bool) -> &mut Self {
        self.cpu_time = cpu_time;
        self
    }

    /// Enable or disable host identification.
    pub fn node_info(&mut self, node_info: bool) -> &mut Self {
        self.node_info = node_info;
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if a dimension is zero or larger than [`MAX_IMAGE_DIM`],
    /// the image count is not a multiple of the chunk size, the chunk or the whole workload is too large to address,
    /// or the base name is empty.
    pub fn build(&self) -> Result<BenchmarkConfig, ConfigError> {
        let Self { nx, ny, n_images, chunk_size, .. } = *self;
        if nx == 0 || ny == 0 || n_images == 0 {
            return Err(ConfigError::ZeroDimension { nx, ny, n_images });
        }
        if chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if nx > MAX_IMAGE_DIM || ny > MAX_IMAGE_DIM {
            return Err(ConfigError::DimensionTooLarge { nx, ny });
        }
        if n_images % chunk_size != 0 {
            return Err(ConfigError::NotMultipleOfChunkSize { n_images, chunk_size });
        }
        let chunk_bytes = (nx * ny)
            .checked_mul(chunk_size)
            .and_then(|bytes| usize::try_from(bytes).ok());
        if chunk_bytes.is_none() {
            return Err(ConfigError::ChunkTooLarge { nx, ny, chunk_size });
        }
        if n_images.checked_mul(nx * ny).is_none() {
            return Err(ConfigError::TotalTooLarge { nx, ny, n_images });
        }
        if self.basename.as_os_str().is_empty() {
            return Err(ConfigError::EmptyBasename);
        }
        Ok(BenchmarkConfig {
            nx,
            ny,
            n_images,
            chunk_size,
            basename: self.basename.clone(),
            strategy: self.strategy,
            json: self.json.clone(),
            sentinel: self.sentinel,
            cpu_time: self.cpu_time,
            node_info: self.node_info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_scenario_a() {
        let config = BenchmarkConfig::builder()
            .nx(64)
            .ny(32)
            .n_images(100)
            .chunk_size(10)
            .basename("/tmp/scenario_a")
            .build()
            .unwrap();
        assert_eq!(config.ncalls(), 10);
        assert_eq!(config.chunk_bytes(), 64 * 32 * 10);
        assert_eq!(config.total_bytes(), 204_800);
        assert_eq!(config.array_shape(), vec![100, 32, 64]);
        assert_eq!(config.chunk_shape(), vec![10, 32, 64]);
        assert_eq!(config.raw_path(), PathBuf::from("/tmp/scenario_a.raw"));
        assert_eq!(config.container_path(), PathBuf::from("/tmp/scenario_a.h5"));
        assert_eq!(config.strategy(), WriteStrategy::Direct);
        assert_eq!(config.sentinel(), 42);
    }

    #[test]
    fn config_not_multiple() {
        assert_eq!(
            BenchmarkConfig::builder().n_images(100).chunk_size(7).build(),
            Err(ConfigError::NotMultipleOfChunkSize {
                n_images: 100,
                chunk_size: 7
            })
        );
    }

    #[test]
    fn config_dimension_bound() {
        assert_eq!(
            BenchmarkConfig::builder().nx(9000).build(),
            Err(ConfigError::DimensionTooLarge { nx: 9000, ny: 32 })
        );
        assert!(BenchmarkConfig::builder()
            .nx(MAX_IMAGE_DIM)
            .ny(MAX_IMAGE_DIM)
            .n_images(1)
            .chunk_size(1)
            .build()
            .is_ok());
    }

    #[test]
    fn config_total_too_large() {
        assert_eq!(
            BenchmarkConfig::builder()
                .nx(MAX_IMAGE_DIM)
                .ny(MAX_IMAGE_DIM)
                .n_images(1_000_000_000_000)
                .chunk_size(1)
                .build(),
            Err(ConfigError::TotalTooLarge {
                nx: MAX_IMAGE_DIM,
                ny: MAX_IMAGE_DIM,
                n_images: 1_000_000_000_000
            })
        );
        let config = BenchmarkConfig::builder()
            .nx(MAX_IMAGE_DIM)
            .ny(MAX_IMAGE_DIM)
            .n_images(1_000_000)
            .chunk_size(1)
            .build()
            .unwrap();
        assert_eq!(config.total_bytes(), 64_000_000_000_000);
    }

    #[test]
    fn config_zero() {
        assert!(matches!(
            BenchmarkConfig::builder().ny(0).build(),
            Err(ConfigError::ZeroDimension { ny: 0, .. })
        ));
        assert_eq!(
            BenchmarkConfig::builder().chunk_size(0).build(),
            Err(ConfigError::ZeroChunkSize)
        );
        assert_eq!(
            BenchmarkConfig::builder().basename("").build(),
            Err(ConfigError::EmptyBasename)
        );
    }

    #[test]
    fn config_basename_with_dots() {
        let config = BenchmarkConfig::builder()
            .basename("run.v2")
            .build()
            .unwrap();
        assert_eq!(config.raw_path(), PathBuf::from("run.v2.raw"));
        assert_eq!(config.container_path(), PathBuf::from("run.v2.h5"));
    }

    #[test]
    fn write_strategy_display() {
        assert_eq!(WriteStrategy::Direct.to_string(), "direct");
        assert_eq!(WriteStrategy::Traditional.to_string(), "traditional");
        assert_eq!(
            serde_json::to_string(&WriteStrategy::Traditional).unwrap(),
            r#""traditional""#
        );
    }
}
