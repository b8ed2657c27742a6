use tracing::{debug, warn};

use crate::{
    error::{ProbePlacementError, Result},
    probe::{Resolution, resolve},
    query::{QueryScope, SceneQuery},
    transform::ProbeTransform,
    types::{
        Density, DensityMode, LayerMask, MAX_FIXED_DENSITY, MAX_LATTICE_SAMPLES,
        MIN_FLOAT_DENSITY, Point, Value, Vector,
    },
};

/// An oriented box that is filled with a lattice of probe samples.
///
/// `origin` and `size` are in the volume's local space; `transform` maps local
/// space into the world. The lattice is centered on `origin`:
///
/// ```text
///        +-----------------+  origin + size/2
///        |  •     •     •  |
///        |  •     o     •  |   o = origin
///        |  •     •     •  |
///        +-----------------+
/// origin - size/2
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeVolume {
    /// Center of the box in local space.
    pub origin: Vector,
    /// Extent of the box along each local axis. A zero axis yields a single plane of samples.
    pub size: Vector,
    /// Division count or spacing, depending on [`mode`](ProbeVolume::mode).
    pub density: Density,
    pub mode: DensityMode,
    /// Colliders that may block or relocate samples.
    pub layers: LayerMask,
    pub transform: ProbeTransform,
}

impl Default for ProbeVolume {
    fn default() -> Self {
        Self {
            origin: Vector::zeros(),
            size: Vector::repeat(1.),
            density: Density::default(),
            mode: DensityMode::default(),
            layers: LayerMask::default(),
            transform: ProbeTransform::default(),
        }
    }
}

/// Sampling plan along one axis: `count` samples at `start + i * step`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisPlan {
    start: Value,
    step: Value,
    count: usize,
}

impl AxisPlan {
    fn fixed(origin: Value, size: Value, density: Value) -> Self {
        if density > MAX_FIXED_DENSITY {
            warn!("probe count {density} above {MAX_FIXED_DENSITY}, using {MAX_FIXED_DENSITY}");
        }
        let mut divisions = density.floor().clamp(0., MAX_FIXED_DENSITY) as usize;
        if size == 0. {
            divisions = 0;
        }
        // A count below one would divide by zero; sample a single row instead.
        let step = size / divisions.max(1) as Value;
        Self {
            start: origin - size * 0.5,
            step,
            count: divisions + 1,
        }
    }

    fn float(origin: Value, size: Value, spacing: Value) -> Self {
        let spacing = if spacing >= MIN_FLOAT_DENSITY {
            spacing
        } else {
            warn!("probe spacing {spacing} below {MIN_FLOAT_DENSITY}, using {MIN_FLOAT_DENSITY}");
            MIN_FLOAT_DENSITY
        };
        // Saturates for huge sizes; `lattice` refuses such plans before allocating.
        let steps = (size / spacing).floor().max(0.) as usize;
        let leftover = size - steps as Value * spacing;
        Self {
            start: origin - size * 0.5 + leftover * 0.5,
            step: spacing,
            count: steps.saturating_add(1),
        }
    }

    #[inline]
    fn at(&self, index: usize) -> Value {
        self.start + index as Value * self.step
    }
}

impl ProbeVolume {
    /// Creates a volume of the given size centered on the local origin.
    pub fn new(size: Vector) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    pub fn with_origin(mut self, origin: Vector) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_density(mut self, mode: DensityMode, density: Density) -> Self {
        self.mode = mode;
        self.density = density;
        self
    }

    pub fn with_layers(mut self, layers: LayerMask) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_transform(mut self, transform: ProbeTransform) -> Self {
        self.transform = transform;
        self
    }

    fn validate(&self) -> Result<()> {
        if !self.origin.iter().all(|v| v.is_finite()) {
            return Err(ProbePlacementError::NonFiniteInput {
                what: "volume origin",
            });
        }
        if !self.size.iter().all(|v| v.is_finite()) {
            return Err(ProbePlacementError::NonFiniteInput { what: "volume size" });
        }
        if !self.density.is_finite() {
            return Err(ProbePlacementError::NonFiniteInput {
                what: "volume density",
            });
        }
        self.transform.validate()
    }

    fn axis_plans(&self) -> [AxisPlan; 3] {
        std::array::from_fn(|axis| {
            let origin = self.origin[axis];
            let size = self.size[axis].abs();
            let density = self.density.0[axis];
            match self.mode {
                DensityMode::Fixed => AxisPlan::fixed(origin, size, density),
                DensityMode::Float => AxisPlan::float(origin, size, density),
            }
        })
    }

    /// Returns the unfiltered sample lattice in local space.
    ///
    /// Samples are ordered X outermost, then Y, then Z. Fixed counts above
    /// [`MAX_FIXED_DENSITY`] and spacings below [`MIN_FLOAT_DENSITY`] are pulled
    /// back into range; a lattice over [`MAX_LATTICE_SAMPLES`] is refused.
    pub fn lattice(&self) -> Result<Vec<Point>> {
        self.validate()?;
        let [px, py, pz] = self.axis_plans();

        let samples = px.count.saturating_mul(py.count).saturating_mul(pz.count);
        if samples > MAX_LATTICE_SAMPLES {
            return Err(ProbePlacementError::LatticeTooLarge {
                samples,
                limit: MAX_LATTICE_SAMPLES,
            });
        }

        let mut points = Vec::with_capacity(samples);
        for x in 0..px.count {
            for y in 0..py.count {
                for z in 0..pz.count {
                    points.push(Point::new(px.at(x), py.at(y), pz.at(z)));
                }
            }
        }
        Ok(points)
    }

    /// Samples the volume against `query` and returns the surviving probes in world space.
    ///
    /// Each lattice point is mapped into the world first and then resolved with
    /// [`resolve`], so rotated or non-uniformly scaled volumes are tested where the
    /// probe will actually end up. Blocked samples are dropped. Back-face hits are
    /// enabled for the duration of the call.
    pub fn sample<Q: SceneQuery + ?Sized>(&self, query: &mut Q) -> Result<Vec<Point>> {
        let lattice = self.lattice()?;
        let scope = QueryScope::backfaces(query);

        let mut relocated = 0_usize;
        let mut points = Vec::with_capacity(lattice.len());
        for local in &lattice {
            let world = self.transform.transform_point(local);
            match resolve(&*scope, world, &self.density, self.layers) {
                Resolution::Free(p) => points.push(p),
                Resolution::Relocated(p) => {
                    relocated += 1;
                    points.push(p);
                }
                Resolution::Blocked(_) => {}
            }
        }

        debug!(
            "volume sampled: {} candidates, {} kept, {} relocated, {} dropped",
            lattice.len(),
            points.len(),
            relocated,
            lattice.len() - points.len()
        );
        Ok(points)
    }
}
