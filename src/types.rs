use nalgebra::{Point3, Vector3};

/// Scalar used for every coordinate and distance.
pub type Value = f32;

/// A 3D point with [`Value`] components.
pub type Point = Point3<Value>;

/// A 3D vector with [`Value`] components.
pub type Vector = Vector3<Value>;

/// Smallest fixed-mode probe count the editor allows per axis.
pub const MIN_FIXED_DENSITY: Value = 1.0;
/// Largest fixed-mode probe count per axis. The sampler never divides an axis further.
pub const MAX_FIXED_DENSITY: Value = 100.0;
/// Smallest float-mode spacing per axis. Also the floor the sampler falls back to.
pub const MIN_FLOAT_DENSITY: Value = 0.1;
/// Largest float-mode spacing per axis.
pub const MAX_FLOAT_DENSITY: Value = 50.0;
/// Most samples one volume lattice may hold before sampling is refused.
pub const MAX_LATTICE_SAMPLES: usize = 1 << 24;

/// Opaque collider-layer filter handed through to the [`SceneQuery`](crate::query::SceneQuery).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const ALL: Self = Self(u32::MAX);
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// How a volume's [`Density`] is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DensityMode {
    /// Each component is the number of divisions along that axis.
    #[default]
    Fixed,
    /// Each component is the spacing between neighbouring probes along that axis.
    Float,
}

/// Per-axis density: a division count in [`DensityMode::Fixed`], a spacing in [`DensityMode::Float`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Density(pub Vector);

impl Density {
    pub fn new(x: Value, y: Value, z: Value) -> Self {
        Self(Vector::new(x, y, z))
    }

    pub fn splat(v: Value) -> Self {
        Self(Vector::repeat(v))
    }

    /// Length of the density vector; sizes the wiggle and raycast of the geometry probe.
    pub fn magnitude(&self) -> Value {
        self.0.norm()
    }

    /// Clamps every component into the editor range for `mode`.
    pub fn clamped(self, mode: DensityMode) -> Self {
        let (min, max) = match mode {
            DensityMode::Fixed => (MIN_FIXED_DENSITY, MAX_FIXED_DENSITY),
            DensityMode::Float => (MIN_FLOAT_DENSITY, MAX_FLOAT_DENSITY),
        };
        Self(self.0.map(|v| v.clamp(min, max)))
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl Default for Density {
    fn default() -> Self {
        Self::splat(1.0)
    }
}

impl From<Vector> for Density {
    fn from(v: Vector) -> Self {
        Self(v)
    }
}
