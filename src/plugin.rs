use bevy::prelude::*;
use nalgebra::{Quaternion, UnitQuaternion};

use crate::{
    placement::ProbeGroup,
    query::{NoObstruction, SceneQuery},
    transform::ProbeTransform,
    types::{Density, DensityMode, LayerMask, Point, Vector},
    volume::ProbeVolume,
};

/// System sets for the probe placement pipeline.
///
/// ```text
/// ProbePlacementSet::Preview  →  ProbePlacementSet::Place
/// ```
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProbePlacementSet {
    /// Refreshes [`VolumePreview`] for volumes that changed.
    Preview,
    /// Handles [`DeleteLightProbes`], [`CreateLightProbes`] and [`MergeLightProbes`] requests.
    Place,
}

/// An oriented box that fills with light probes when its group is created.
///
/// `origin` and `size` are in the entity's local space. Fixed and float densities
/// are kept separately so switching [`mode`](LightProbeVolume::mode) does not lose
/// the other setting.
#[derive(Component, Debug, Clone)]
#[require(Transform, VolumePreview)]
pub struct LightProbeVolume {
    pub origin: Vec3,
    pub size: Vec3,
    pub mode: DensityMode,
    /// Probe count per axis, used in [`DensityMode::Fixed`].
    pub density_fixed: Vec3,
    /// Probe spacing per axis, used in [`DensityMode::Float`].
    pub density_float: Vec3,
    /// Colliders that block or relocate samples.
    pub layers: LayerMask,
}

impl Default for LightProbeVolume {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            size: Vec3::ONE,
            mode: DensityMode::Fixed,
            density_fixed: Vec3::ONE,
            density_float: Vec3::ONE,
            layers: LayerMask::ALL,
        }
    }
}

impl LightProbeVolume {
    /// Density for the current mode.
    pub fn density(&self) -> Vec3 {
        match self.mode {
            DensityMode::Fixed => self.density_fixed,
            DensityMode::Float => self.density_float,
        }
    }

    /// Sets the density for the current mode, clamped to the editor range.
    pub fn set_density(&mut self, density: Vec3) {
        let clamped = Density::from(to_vector(density)).clamped(self.mode).0;
        let density = Vec3::new(clamped.x, clamped.y, clamped.z);
        match self.mode {
            DensityMode::Fixed => self.density_fixed = density,
            DensityMode::Float => self.density_float = density,
        }
    }

    /// Builds the plain-data volume for this component at `transform`.
    ///
    /// The density is clamped to the editor range even when the fields were set directly.
    pub fn to_probe_volume(&self, transform: &GlobalTransform) -> ProbeVolume {
        let density = Density::from(to_vector(self.density())).clamped(self.mode);
        ProbeVolume::new(to_vector(self.size))
            .with_origin(to_vector(self.origin))
            .with_density(self.mode, density)
            .with_layers(self.layers)
            .with_transform(probe_transform(transform))
    }
}

/// World-space probe positions of a [`LightProbeVolume`] as they were last sampled.
///
/// Recomputed only when the volume or its transform changes.
#[derive(Component, Debug, Clone, Default, Deref)]
pub struct VolumePreview(pub Vec<Vec3>);

/// Host-side probe storage. Positions are kept in the entity's local space.
///
/// Insert [`CreateLightProbes`], [`MergeLightProbes`] or [`DeleteLightProbes`] on the
/// same entity to act on it:
///
/// ```rust,ignore
/// commands.spawn((LightProbeGroup::default(), CreateLightProbes));
/// ```
#[derive(Component, Debug, Clone, Default, Deref, DerefMut)]
#[require(Transform)]
pub struct LightProbeGroup(pub ProbeGroup);

impl LightProbeGroup {
    /// Stored probes in local space, as Bevy vectors.
    pub fn local_positions(&self) -> Vec<Vec3> {
        self.0.positions().iter().map(to_vec3).collect()
    }
}

/// Request: rebuild the group from every [`LightProbeVolume`] and [`PointLight`].
#[derive(Component, Debug, Default)]
pub struct CreateLightProbes;

/// Request: merge the group's stored probes again.
#[derive(Component, Debug, Default)]
pub struct MergeLightProbes;

/// Request: clear the group.
#[derive(Component, Debug, Default)]
pub struct DeleteLightProbes;

/// Collision world used for placement, usually backed by a physics engine.
///
/// When absent, nothing obstructs samples.
#[derive(Resource)]
pub struct SceneQueries(pub Box<dyn SceneQuery + Send + Sync>);

impl SceneQueries {
    pub fn new(query: impl SceneQuery + Send + Sync + 'static) -> Self {
        Self(Box::new(query))
    }
}

/// Runtime configuration for probe placement.
///
/// ```rust,ignore
/// app.add_plugins(ProbePlacementPlugin { max_groups_per_frame: 4 });
/// ```
#[derive(Resource)]
pub struct ProbePlacementConfig {
    /// Maximum number of create or merge requests handled per frame. Default: `1`.
    pub max_groups_per_frame: usize,
}

impl Default for ProbePlacementConfig {
    fn default() -> Self {
        Self {
            max_groups_per_frame: 1,
        }
    }
}

/// Bevy plugin that places and merges light probes on request.
///
/// ```text
/// LightProbeVolume added/changed
///   → VolumePreview refreshed            (ProbePlacementSet::Preview)
/// CreateLightProbes inserted on a group
///   → volumes + point lights sampled, merged, stored
///   → CreateLightProbes removed          (ProbePlacementSet::Place)
/// ```
pub struct ProbePlacementPlugin {
    /// Initial value for [`ProbePlacementConfig::max_groups_per_frame`].
    pub max_groups_per_frame: usize,
}

impl Default for ProbePlacementPlugin {
    fn default() -> Self {
        Self {
            max_groups_per_frame: ProbePlacementConfig::default().max_groups_per_frame,
        }
    }
}

impl Plugin for ProbePlacementPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ProbePlacementConfig {
            max_groups_per_frame: self.max_groups_per_frame,
        });

        #[cfg(feature = "auto_place")]
        app.configure_sets(
            Update,
            (ProbePlacementSet::Preview, ProbePlacementSet::Place).chain(),
        )
        .add_systems(
            Update,
            (
                refresh_volume_previews.in_set(ProbePlacementSet::Preview),
                (delete_light_probes, create_light_probes, merge_light_probes)
                    .chain()
                    .in_set(ProbePlacementSet::Place),
            ),
        );
    }
}

/// Resamples every volume whose component or transform changed since the last run.
pub fn refresh_volume_previews(
    mut scene: Option<ResMut<SceneQueries>>,
    mut volumes: Query<
        (&LightProbeVolume, &GlobalTransform, &mut VolumePreview),
        Or<(Changed<LightProbeVolume>, Changed<GlobalTransform>)>,
    >,
) {
    let mut empty = NoObstruction;
    let query: &mut dyn SceneQuery = match scene.as_deref_mut() {
        Some(scene) => &mut *scene.0,
        None => &mut empty,
    };

    for (volume, transform, mut preview) in volumes.iter_mut() {
        match volume.to_probe_volume(transform).sample(&mut *query) {
            Ok(points) => preview.0 = points.iter().map(to_vec3).collect(),
            Err(err) => {
                warn!("could not preview light probe volume: {err}");
                preview.0.clear();
            }
        }
    }
}

/// Clears every group carrying [`DeleteLightProbes`].
pub fn delete_light_probes(
    mut commands: Commands,
    mut groups: Query<(Entity, &mut LightProbeGroup), With<DeleteLightProbes>>,
) {
    for (entity, mut group) in groups.iter_mut() {
        group.delete_all();
        commands.entity(entity).remove::<DeleteLightProbes>();
    }
}

/// Rebuilds groups carrying [`CreateLightProbes`], up to
/// [`ProbePlacementConfig::max_groups_per_frame`] per frame.
///
/// A failed placement is logged and leaves the group's previous probes in place.
pub fn create_light_probes(
    mut commands: Commands,
    config: Res<ProbePlacementConfig>,
    mut scene: Option<ResMut<SceneQueries>>,
    volumes: Query<(&LightProbeVolume, &GlobalTransform)>,
    lights: Query<&GlobalTransform, With<PointLight>>,
    mut groups: Query<(Entity, &mut LightProbeGroup, &GlobalTransform), With<CreateLightProbes>>,
) {
    if groups.is_empty() {
        return;
    }

    let volumes: Vec<ProbeVolume> = volumes
        .iter()
        .map(|(volume, transform)| volume.to_probe_volume(transform))
        .collect();
    let lights: Vec<ProbeTransform> = lights.iter().map(probe_transform).collect();

    let mut empty = NoObstruction;
    let query: &mut dyn SceneQuery = match scene.as_deref_mut() {
        Some(scene) => &mut *scene.0,
        None => &mut empty,
    };

    for (entity, mut group, transform) in groups.iter_mut().take(config.max_groups_per_frame) {
        group.transform = probe_transform(transform);
        if let Err(err) = group.create(&volumes, &lights, &mut *query) {
            error!("light probe placement failed for {entity}: {err}");
        }
        commands.entity(entity).remove::<CreateLightProbes>();
    }
}

/// Re-merges groups carrying [`MergeLightProbes`], up to
/// [`ProbePlacementConfig::max_groups_per_frame`] per frame.
pub fn merge_light_probes(
    mut commands: Commands,
    config: Res<ProbePlacementConfig>,
    mut groups: Query<(Entity, &mut LightProbeGroup, &GlobalTransform), With<MergeLightProbes>>,
) {
    for (entity, mut group, transform) in groups.iter_mut().take(config.max_groups_per_frame) {
        group.transform = probe_transform(transform);
        if let Err(err) = group.merge() {
            error!("light probe merge failed for {entity}: {err}");
        }
        commands.entity(entity).remove::<MergeLightProbes>();
    }
}

/// Converts a Bevy world transform into a [`ProbeTransform`].
pub fn probe_transform(transform: &GlobalTransform) -> ProbeTransform {
    let (scale, rotation, translation) = transform.to_scale_rotation_translation();
    ProbeTransform {
        translation: to_vector(translation),
        rotation: UnitQuaternion::new_unchecked(Quaternion::new(
            rotation.w, rotation.x, rotation.y, rotation.z,
        )),
        scale: to_vector(scale),
    }
}

#[inline]
fn to_vector(v: Vec3) -> Vector {
    Vector::new(v.x, v.y, v.z)
}

#[inline]
fn to_vec3(p: &Point) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}
