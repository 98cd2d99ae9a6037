//! Transform configuration records.
//!
//! A configuration is a plain data record handed to a planner exactly once;
//! the resulting application is immutable. Sizes and layout here follow the
//! conventions of the external transform library: complex data is
//! interleaved f32 pairs, and R2C transforms pad each x-row of real input
//! to `x + 2` floats so the spectrum fits in place.

/// Errors produced by configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Transform dimension must be 1-3, got {0}")]
    InvalidDimension(u32),
    #[error("Extent of axis {0} must be nonzero")]
    ZeroExtent(usize),
    #[error("Vector dimension must be nonzero")]
    ZeroVectorDimension,
    #[error("R2C transforms require an even x-extent, got {0}")]
    OddR2cExtent(u32),
}

/// Declarative description of one planned transform.
#[derive(Debug, Clone)]
pub struct FftConfig {
    /// Transform dimensionality, 1-3. Unused trailing extents stay 1.
    pub dim: u32,
    /// Per-dimension extents. Order dimensions in descending size.
    pub size: [u32; 3],
    /// Direction: false = forward, true = inverse.
    pub inverse: bool,
    /// Real-to-complex variant. Halves memory, requires padded input rows.
    pub r2c: bool,
    /// Number of independent interleaved data channels. Each channel is
    /// stored as a separate contiguous system, padded on its own.
    pub vector_dimension: u32,
    /// Pointwise-multiply against a precomputed kernel during the pass.
    pub convolution: bool,
    /// The convolution kernel stores only its upper triangle.
    pub symmetric_kernel: bool,
}

impl Default for FftConfig {
    fn default() -> Self {
        Self {
            dim: 1,
            size: [1, 1, 1],
            inverse: false,
            r2c: false,
            vector_dimension: 1,
            convolution: false,
            symmetric_kernel: false,
        }
    }
}

impl FftConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=3).contains(&self.dim) {
            return Err(ConfigError::InvalidDimension(self.dim));
        }
        for (axis, &extent) in self.size.iter().enumerate() {
            if extent == 0 {
                return Err(ConfigError::ZeroExtent(axis));
            }
        }
        if self.vector_dimension == 0 {
            return Err(ConfigError::ZeroVectorDimension);
        }
        // The padded row layout stores x real values in x + 2 floats, which
        // only lines up with the 2 * (x/2 + 1) complex bins when x is even.
        if self.r2c && self.size[0] % 2 != 0 {
            return Err(ConfigError::OddR2cExtent(self.size[0]));
        }
        Ok(())
    }

    /// Device buffer size in bytes for this configuration.
    ///
    /// R2C: `vd * sizeof(f32) * 2 * (x/2 + 1) * y * z`; the complex
    /// spectrum of a real x-row has `x/2 + 1` bins. C2C stores a full
    /// complex value per element.
    pub fn buffer_size(&self) -> u64 {
        let [x, y, z] = self.size.map(u64::from);
        let vd = u64::from(self.vector_dimension);
        let f32_size = std::mem::size_of::<f32>() as u64;
        let x_complex = if self.r2c { x / 2 + 1 } else { x };
        vd * f32_size * 2 * x_complex * y * z
    }

    /// Buffer length in f32 elements.
    pub fn buffer_len(&self) -> usize {
        (self.buffer_size() / std::mem::size_of::<f32>() as u64) as usize
    }

    /// Stride in floats between consecutive x-rows of host-side data.
    pub fn row_stride(&self) -> usize {
        let x = self.size[0] as usize;
        if self.r2c {
            x + 2
        } else {
            2 * x
        }
    }

    /// A copy of this configuration with the direction flipped to inverse.
    pub fn inverted(&self) -> Self {
        Self {
            inverse: true,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_r2c_buffer_size_256_cubed() {
        let config = FftConfig {
            dim: 3,
            size: [256, 256, 256],
            r2c: true,
            ..Default::default()
        };
        // 1 channel * 4 bytes * 2 * (256/2 + 1) * 256 * 256
        assert_eq!(config.buffer_size(), 4 * 2 * 129 * 256 * 256);
    }

    #[test]
    fn test_c2c_buffer_size() {
        let config = FftConfig {
            dim: 2,
            size: [64, 32, 1],
            ..Default::default()
        };
        assert_eq!(config.buffer_size(), 4 * 2 * 64 * 32);
    }

    #[test]
    fn test_vector_dimension_scales_size() {
        let base = FftConfig {
            dim: 2,
            size: [128, 128, 1],
            r2c: true,
            ..Default::default()
        };
        let wide = FftConfig {
            vector_dimension: 9,
            ..base.clone()
        };
        assert_eq!(wide.buffer_size(), 9 * base.buffer_size());
    }

    #[test]
    fn test_row_stride() {
        let r2c = FftConfig {
            size: [256, 1, 1],
            r2c: true,
            ..Default::default()
        };
        assert_eq!(r2c.row_stride(), 258);

        let c2c = FftConfig {
            size: [256, 1, 1],
            ..Default::default()
        };
        assert_eq!(c2c.row_stride(), 512);
    }

    #[test]
    fn test_validation() {
        assert!(FftConfig::default().validate().is_ok());

        let bad_dim = FftConfig {
            dim: 4,
            ..Default::default()
        };
        assert!(matches!(
            bad_dim.validate(),
            Err(ConfigError::InvalidDimension(4))
        ));

        let zero_extent = FftConfig {
            dim: 2,
            size: [64, 0, 1],
            ..Default::default()
        };
        assert!(matches!(
            zero_extent.validate(),
            Err(ConfigError::ZeroExtent(1))
        ));

        let zero_vd = FftConfig {
            vector_dimension: 0,
            ..Default::default()
        };
        assert!(matches!(
            zero_vd.validate(),
            Err(ConfigError::ZeroVectorDimension)
        ));
    }

    #[test]
    fn test_r2c_rejects_odd_x_extent() {
        // An odd x would leave the x + 2 padded row one float wider than
        // the 2 * (x/2 + 1) complex bins actually allocated per row.
        let odd = FftConfig {
            dim: 2,
            size: [5, 4, 1],
            r2c: true,
            ..Default::default()
        };
        assert!(matches!(odd.validate(), Err(ConfigError::OddR2cExtent(5))));

        let even = FftConfig {
            size: [6, 4, 1],
            ..odd
        };
        assert!(even.validate().is_ok());

        // C2C has no padded rows; odd extents stay valid.
        let c2c = FftConfig {
            dim: 2,
            size: [5, 4, 1],
            ..Default::default()
        };
        assert!(c2c.validate().is_ok());
    }

    #[test]
    fn test_inverted_flips_direction_only() {
        let forward = FftConfig {
            dim: 3,
            size: [256, 128, 64],
            r2c: true,
            ..Default::default()
        };
        let inverse = forward.inverted();
        assert!(inverse.inverse);
        assert_eq!(inverse.size, forward.size);
        assert_eq!(inverse.buffer_size(), forward.buffer_size());
    }
}
