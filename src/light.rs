use crate::{
    error::{ProbePlacementError, Result},
    transform::ProbeTransform,
    types::{Point, Value},
};

/// Unit-cube corners placed around a point light, top face first:
///
/// ```text
///     0----3          Y
///    /|   /|          |
///   1----2 |          *-- X
///   | 4--|-7         /
///   |/   |/         Z
///   5----6
/// ```
pub const LIGHT_CORNERS: [[Value; 3]; 8] = [
    [-0.5, 0.5, -0.5],
    [-0.5, 0.5, 0.5],
    [0.5, 0.5, 0.5],
    [0.5, 0.5, -0.5],
    [-0.5, -0.5, -0.5],
    [-0.5, -0.5, 0.5],
    [0.5, -0.5, 0.5],
    [0.5, -0.5, -0.5],
];

/// Returns the 8 probes around a point light, each corner scaled by `range`
/// and mapped through the light's transform.
pub fn sample_around_light(light: &ProbeTransform, range: Value) -> Result<[Point; 8]> {
    light.validate()?;
    if !range.is_finite() {
        return Err(ProbePlacementError::NonFiniteInput {
            what: "point light range",
        });
    }
    Ok(LIGHT_CORNERS.map(|[x, y, z]| {
        light.transform_point(&Point::new(x * range, y * range, z * range))
    }))
}

/// Concatenates [`sample_around_light`] over every light, in order.
pub fn sample_point_lights<'a>(
    lights: impl IntoIterator<Item = &'a ProbeTransform>,
    range: Value,
) -> Result<Vec<Point>> {
    let mut points = Vec::new();
    for light in lights {
        points.extend(sample_around_light(light, range)?);
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    use super::*;
    use crate::types::Vector;

    #[test]
    fn unit_range_at_origin_yields_the_corners_in_order() {
        let points = sample_around_light(&ProbeTransform::identity(), 1.).unwrap();
        let expected = LIGHT_CORNERS.map(|[x, y, z]| Point::new(x, y, z));
        assert_eq!(points, expected);
    }

    #[test]
    fn corners_follow_range_and_position() {
        let light = ProbeTransform::from_translation(Vector::new(0., 5., 0.));
        let points = sample_around_light(&light, 4.).unwrap();

        assert_eq!(points[0], Point::new(-2., 7., -2.));
        assert_eq!(points[6], Point::new(2., 3., 2.));
    }

    #[test]
    fn corners_rotate_with_the_light() {
        let light = ProbeTransform::identity().with_rotation(UnitQuaternion::from_axis_angle(
            &Vector::y_axis(),
            std::f32::consts::FRAC_PI_2,
        ));
        let points = sample_around_light(&light, 2.).unwrap();

        // (-1, 1, -1) turns a quarter about +Y to (-1, 1, 1).
        assert_relative_eq!(points[0], Point::new(-1., 1., 1.), epsilon = 1e-5);
    }

    #[test]
    fn lights_are_concatenated_in_order() {
        let lights = [
            ProbeTransform::from_translation(Vector::new(-10., 0., 0.)),
            ProbeTransform::from_translation(Vector::new(10., 0., 0.)),
        ];
        let points = sample_point_lights(&lights, 1.).unwrap();

        assert_eq!(points.len(), 16);
        assert!(points[..8].iter().all(|p| p.x < 0.));
        assert!(points[8..].iter().all(|p| p.x > 0.));
    }

    #[test]
    fn non_finite_light_is_rejected() {
        let light = ProbeTransform::from_translation(Vector::new(0., Value::NAN, 0.));
        assert_eq!(
            sample_around_light(&light, 1.),
            Err(ProbePlacementError::NonFiniteTransform)
        );
    }
}
