use bevy::{log::LogPlugin, prelude::*, transform::TransformPlugin};
use bevy_probe_placer::{
    ProbePlacementPlugin,
    plugin::{CreateLightProbes, LightProbeGroup, LightProbeVolume, MergeLightProbes, SceneQueries},
    query::SceneQuery,
    types::{DensityMode, LayerMask, Point, Value, Vector},
};

/// Everything below `y = 0` is solid ground.
struct Ground;

impl SceneQuery for Ground {
    fn overlaps(&self, point: Point, radius: Value, _layers: LayerMask) -> bool {
        point.y < radius
    }

    fn raycast(
        &self,
        origin: Point,
        direction: Vector,
        max_distance: Value,
        _layers: LayerMask,
    ) -> Option<Point> {
        if origin.y < 0. || direction.y >= 0. {
            return None;
        }
        let t = -origin.y / direction.y;
        (t <= max_distance).then(|| origin + direction * t)
    }
}

fn main() {
    let mut app = App::new();
    app.add_plugins((
        MinimalPlugins,
        LogPlugin::default(),
        TransformPlugin,
        ProbePlacementPlugin::default(),
    ))
    .insert_resource(SceneQueries::new(Ground))
    .add_systems(Startup, setup);

    // Frame 1 spawns and propagates transforms, frame 2 places, frame 3 merges.
    app.update();
    request::<CreateLightProbes>(&mut app);
    app.update();
    report(&mut app);

    for mut group in app
        .world_mut()
        .query::<&mut LightProbeGroup>()
        .iter_mut(app.world_mut())
    {
        group.settings.merge_distance = 2.5;
    }
    request::<MergeLightProbes>(&mut app);
    app.update();
    report(&mut app);
}

fn request<R: Component + Default>(app: &mut App) {
    let groups: Vec<Entity> = app
        .world_mut()
        .query_filtered::<Entity, With<LightProbeGroup>>()
        .iter(app.world())
        .collect();
    for group in groups {
        app.world_mut().entity_mut(group).insert(R::default());
    }
}

fn setup(mut commands: Commands) {
    // A room-sized volume sunk half a meter into the ground: the bottom layer gets pushed up.
    commands.spawn((
        LightProbeVolume {
            size: Vec3::new(8., 3., 8.),
            mode: DensityMode::Float,
            density_float: Vec3::splat(1.5),
            ..Default::default()
        },
        Transform::from_xyz(0., 1., 0.),
    ));

    commands.spawn((
        PointLight::default(),
        Transform::from_xyz(2., 2.5, -1.),
    ));

    commands.spawn(LightProbeGroup::default());
}

fn report(app: &mut App) {
    for group in app.world_mut().query::<&LightProbeGroup>().iter(app.world()) {
        info!(
            "{} light probes, {} merged",
            group.positions().len(),
            group.merged_probes()
        );
    }
}
