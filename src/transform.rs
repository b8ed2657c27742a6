use nalgebra::UnitQuaternion;

use crate::{
    error::{ProbePlacementError, Result},
    types::{Point, Value, Vector},
};

/// Local-to-world mapping of a volume, light or probe group.
///
/// Applied as scale, then rotation, then translation:
///
/// ```text
/// world = translation + rotation * (scale ⊙ local)
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeTransform {
    pub translation: Vector,
    pub rotation: UnitQuaternion<Value>,
    pub scale: Vector,
}

impl Default for ProbeTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ProbeTransform {
    pub fn identity() -> Self {
        Self {
            translation: Vector::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector::repeat(1.),
        }
    }

    pub fn from_translation(translation: Vector) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    pub fn with_rotation(mut self, rotation: UnitQuaternion<Value>) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vector) -> Self {
        self.scale = scale;
        self
    }

    /// Returns [`ProbePlacementError::NonFiniteTransform`] if any component is NaN or infinite.
    pub fn validate(&self) -> Result<()> {
        let finite = self.translation.iter().all(|v| v.is_finite())
            && self.scale.iter().all(|v| v.is_finite())
            && self.rotation.coords.iter().all(|v| v.is_finite());
        if finite {
            Ok(())
        } else {
            Err(ProbePlacementError::NonFiniteTransform)
        }
    }

    /// Maps a local-space point into world space.
    #[inline]
    pub fn transform_point(&self, local: &Point) -> Point {
        Point::from(self.translation + self.rotation * self.scale.component_mul(&local.coords))
    }

    /// Maps a world-space point back into local space.
    ///
    /// Axes with zero scale collapse to `0` instead of producing infinities.
    pub fn inverse_transform_point(&self, world: &Point) -> Point {
        let unrotated = self.rotation.inverse() * (world.coords - self.translation);
        Point::from(unrotated.zip_map(&self.scale, |v, s| if s == 0. { 0. } else { v / s }))
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn applies_scale_then_rotation_then_translation() {
        let t = ProbeTransform::from_translation(Vector::new(10., 0., 0.))
            .with_rotation(UnitQuaternion::from_axis_angle(&Vector::y_axis(), FRAC_PI_2))
            .with_scale(Vector::new(2., 1., 1.));

        // (1,0,0) -> scale (2,0,0) -> rotate about +Y by 90° -> (0,0,-2) -> translate
        let world = t.transform_point(&Point::new(1., 0., 0.));
        assert_relative_eq!(world, Point::new(10., 0., -2.), epsilon = 1e-5);
    }

    #[test]
    fn inverse_round_trips_non_uniform_scale() {
        let t = ProbeTransform::from_translation(Vector::new(1., -2., 3.))
            .with_rotation(UnitQuaternion::from_euler_angles(0.3, 1.1, -0.4))
            .with_scale(Vector::new(0.5, 3., 2.));
        let local = Point::new(0.25, -1.5, 4.);

        let back = t.inverse_transform_point(&t.transform_point(&local));
        assert_relative_eq!(back, local, epsilon = 1e-4);
    }

    #[test]
    fn rejects_non_finite_components() {
        assert!(ProbeTransform::identity().validate().is_ok());

        let nan = ProbeTransform::from_translation(Vector::new(f32::NAN, 0., 0.));
        assert_eq!(nan.validate(), Err(ProbePlacementError::NonFiniteTransform));

        let inf = ProbeTransform::identity().with_scale(Vector::new(1., f32::INFINITY, 1.));
        assert_eq!(inf.validate(), Err(ProbePlacementError::NonFiniteTransform));
    }
}
