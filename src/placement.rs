use tracing::info;

use crate::{
    error::Result,
    light::sample_point_lights,
    merge::{MergeConfig, merge_points},
    query::SceneQuery,
    transform::ProbeTransform,
    types::{Point, Value},
    volume::ProbeVolume,
};

/// Knobs shared by one probe group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementSettings {
    /// Probes closer than this are merged. Default: `0.5`.
    pub merge_distance: Value,
    /// Whether point lights contribute 8 probes each. Default: `true`.
    pub use_point_lights: bool,
    /// Edge length of the cube of probes placed around each point light. Default: `1.0`.
    pub point_light_range: Value,
    pub merge: MergeConfig,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            merge_distance: 0.5,
            use_point_lights: true,
            point_light_range: 1.,
            merge: MergeConfig::default(),
        }
    }
}

/// World-space probes and how many were folded away by merging.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProbeSet {
    pub positions: Vec<Point>,
    pub merged: usize,
}

/// Samples every volume in order and concatenates the surviving world-space probes.
pub fn sample_volumes<Q: SceneQuery + ?Sized>(
    volumes: &[ProbeVolume],
    query: &mut Q,
) -> Result<Vec<Point>> {
    let mut points = Vec::new();
    for volume in volumes {
        points.extend(volume.sample(query)?);
    }
    Ok(points)
}

/// Builds a fresh probe set: volume samples, then point-light corners, then one merge.
pub fn create_probes<Q: SceneQuery + ?Sized>(
    volumes: &[ProbeVolume],
    lights: &[ProbeTransform],
    settings: &PlacementSettings,
    query: &mut Q,
) -> Result<ProbeSet> {
    let mut points = sample_volumes(volumes, query)?;
    if settings.use_point_lights {
        points.extend(sample_point_lights(lights, settings.point_light_range)?);
    }
    merge_probes(points, settings)
}

/// Re-clusters an existing world-space probe set.
pub fn merge_probes(points: Vec<Point>, settings: &PlacementSettings) -> Result<ProbeSet> {
    let outcome = merge_points(points, settings.merge_distance, &settings.merge)?;
    Ok(ProbeSet {
        positions: outcome.points,
        merged: outcome.removed,
    })
}

/// Probe storage owned by the host: positions live in the group's local space.
///
/// [`create`](ProbeGroup::create) discards whatever was stored and builds from
/// the scene; [`merge`](ProbeGroup::merge) re-clusters what is stored. Both leave
/// the group untouched when they fail.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProbeGroup {
    pub transform: ProbeTransform,
    pub settings: PlacementSettings,
    positions: Vec<Point>,
    merged: usize,
}

impl ProbeGroup {
    pub fn new(transform: ProbeTransform) -> Self {
        Self {
            transform,
            ..Default::default()
        }
    }

    pub fn with_settings(mut self, settings: PlacementSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Stored probes in the group's local space.
    pub fn positions(&self) -> &[Point] {
        &self.positions
    }

    /// Stored probes mapped into world space.
    pub fn world_positions(&self) -> Vec<Point> {
        self.positions
            .iter()
            .map(|p| self.transform.transform_point(p))
            .collect()
    }

    /// Probes removed by the last create or merge.
    pub fn merged_probes(&self) -> usize {
        self.merged
    }

    pub fn delete_all(&mut self) {
        self.positions.clear();
        self.merged = 0;
    }

    /// Replaces the stored probes with a freshly sampled and merged set.
    pub fn create<Q: SceneQuery + ?Sized>(
        &mut self,
        volumes: &[ProbeVolume],
        lights: &[ProbeTransform],
        query: &mut Q,
    ) -> Result<()> {
        self.transform.validate()?;
        let set = create_probes(volumes, lights, &self.settings, query)?;
        info!(
            "created {} light probes from {} volumes and {} lights ({} merged)",
            set.positions.len(),
            volumes.len(),
            if self.settings.use_point_lights { lights.len() } else { 0 },
            set.merged
        );
        self.store(set);
        Ok(())
    }

    /// Merges the stored probes again with the current settings.
    ///
    /// Distances are measured in world space.
    pub fn merge(&mut self) -> Result<()> {
        self.transform.validate()?;
        let set = merge_probes(self.world_positions(), &self.settings)?;
        info!(
            "merged light probes: {} remain ({} merged)",
            set.positions.len(),
            set.merged
        );
        self.store(set);
        Ok(())
    }

    fn store(&mut self, set: ProbeSet) {
        self.positions = set
            .positions
            .iter()
            .map(|p| self.transform.inverse_transform_point(p))
            .collect();
        self.merged = set.merged;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{
        error::ProbePlacementError,
        query::{NoObstruction, QueryConfig},
        types::{Density, DensityMode, LayerMask, Vector},
    };

    /// Solid inside a sphere; reports whether back faces were enabled while queried.
    struct Ball {
        center: Point,
        radius: Value,
        config: QueryConfig,
    }

    impl SceneQuery for Ball {
        fn overlaps(&self, p: Point, r: Value, _: LayerMask) -> bool {
            assert!(self.config.hit_backfaces);
            (p - self.center).norm() < self.radius + r
        }

        fn raycast(&self, _: Point, _: Vector, _: Value, _: LayerMask) -> Option<Point> {
            None
        }

        fn query_config(&self) -> QueryConfig {
            self.config
        }

        fn set_query_config(&mut self, config: QueryConfig) {
            self.config = config;
        }
    }

    fn cube_volume(center: Vector) -> ProbeVolume {
        ProbeVolume::new(Vector::repeat(2.))
            .with_density(DensityMode::Fixed, Density::splat(2.))
            .with_transform(ProbeTransform::from_translation(center))
    }

    #[test]
    fn create_combines_volumes_and_lights() {
        let volumes = [cube_volume(Vector::zeros()), cube_volume(Vector::new(100., 0., 0.))];
        let lights = [ProbeTransform::from_translation(Vector::new(0., 50., 0.))];
        let settings = PlacementSettings {
            merge_distance: 0.1,
            ..Default::default()
        };

        let set = create_probes(&volumes, &lights, &settings, &mut NoObstruction).unwrap();
        assert_eq!(set.positions.len(), 27 + 27 + 8);
        assert_eq!(set.merged, 0);
    }

    #[test]
    fn point_lights_can_be_disabled() {
        let lights = [ProbeTransform::identity()];
        let settings = PlacementSettings {
            use_point_lights: false,
            ..Default::default()
        };

        let set = create_probes(&[], &lights, &settings, &mut NoObstruction).unwrap();
        assert!(set.positions.is_empty());
    }

    #[test]
    fn overlapping_samples_are_merged() {
        // Two identical volumes sample the exact same points.
        let volumes = [cube_volume(Vector::zeros()), cube_volume(Vector::zeros())];
        let settings = PlacementSettings {
            use_point_lights: false,
            ..Default::default()
        };

        let set = create_probes(&volumes, &[], &settings, &mut NoObstruction).unwrap();
        assert_eq!(set.positions.len(), 27);
        assert_eq!(set.merged, 27);
    }

    #[test]
    fn blocked_samples_never_reach_the_group() {
        let mut scene = Ball {
            center: Point::origin(),
            radius: 0.5,
            config: QueryConfig::default(),
        };
        let settings = PlacementSettings {
            use_point_lights: false,
            ..Default::default()
        };

        let volumes = [cube_volume(Vector::zeros())];
        let set = create_probes(&volumes, &[], &settings, &mut scene).unwrap();
        assert_eq!(set.positions.len(), 26);
        assert!(!set.positions.contains(&Point::origin()));
        assert!(!scene.config.hit_backfaces);
    }

    #[test]
    fn group_stores_probes_in_local_space() {
        let mut group = ProbeGroup::new(ProbeTransform::from_translation(Vector::new(5., 0., 0.)))
            .with_settings(PlacementSettings {
                use_point_lights: false,
                ..Default::default()
            });

        group.create(&[cube_volume(Vector::new(5., 0., 0.))], &[], &mut NoObstruction).unwrap();

        assert_eq!(group.positions().len(), 27);
        assert_relative_eq!(group.positions()[0], Point::new(-1., -1., -1.), epsilon = 1e-5);
        assert_relative_eq!(group.world_positions()[0], Point::new(4., -1., -1.), epsilon = 1e-5);
    }

    #[test]
    fn create_discards_previous_probes() {
        let mut group = ProbeGroup::default();
        group.create(&[cube_volume(Vector::zeros())], &[], &mut NoObstruction).unwrap();
        let first = group.positions().to_vec();

        group.create(&[], &[ProbeTransform::identity()], &mut NoObstruction).unwrap();
        assert_eq!(group.positions().len(), 8);
        assert_ne!(group.positions(), first.as_slice());
    }

    #[test]
    fn merge_reclusters_stored_probes() {
        let mut group = ProbeGroup::default().with_settings(PlacementSettings {
            merge_distance: 0.1,
            use_point_lights: false,
            ..Default::default()
        });
        group.create(&[cube_volume(Vector::zeros())], &[], &mut NoObstruction).unwrap();
        assert_eq!(group.positions().len(), 27);

        group.settings.merge_distance = 1.5;
        group.merge().unwrap();

        assert!(group.positions().len() < 27);
        assert_eq!(group.merged_probes(), 27 - group.positions().len());
    }

    #[test]
    fn failed_create_keeps_the_previous_set() {
        let mut group = ProbeGroup::default();
        group.create(&[], &[ProbeTransform::identity()], &mut NoObstruction).unwrap();
        let before = group.clone();

        let broken = ProbeTransform::from_translation(Vector::new(Value::NAN, 0., 0.));
        assert_eq!(
            group.create(&[], &[broken], &mut NoObstruction),
            Err(ProbePlacementError::NonFiniteTransform)
        );
        assert_eq!(group, before);
    }

    #[test]
    fn delete_all_clears_probes_and_count() {
        let mut group = ProbeGroup::default();
        let volumes = [cube_volume(Vector::zeros()), cube_volume(Vector::zeros())];
        group.create(&volumes, &[], &mut NoObstruction).unwrap();
        assert!(group.merged_probes() > 0);

        group.delete_all();
        assert!(group.positions().is_empty());
        assert_eq!(group.merged_probes(), 0);
    }
}
