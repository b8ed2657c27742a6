use std::ops::{Deref, DerefMut};

use crate::types::{LayerMask, Point, Value, Vector};

/// Global query state a [`SceneQuery`] backend may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryConfig {
    /// Whether overlap and ray queries also report back-facing geometry.
    pub hit_backfaces: bool,
}

/// The collision world the placer probes against.
///
/// Implemented by the host, usually over a physics backend. Overlap and ray
/// queries only see colliders selected by `layers`.
pub trait SceneQuery {
    /// Returns `true` if a sphere of `radius` at `point` intersects solid geometry.
    fn overlaps(&self, point: Point, radius: Value, layers: LayerMask) -> bool;

    /// Casts a ray and returns the first hit point within `max_distance`.
    ///
    /// `direction` is normalized.
    fn raycast(
        &self,
        origin: Point,
        direction: Vector,
        max_distance: Value,
        layers: LayerMask,
    ) -> Option<Point>;

    /// Current global query configuration.
    fn query_config(&self) -> QueryConfig {
        QueryConfig::default()
    }

    /// Replaces the global query configuration.
    fn set_query_config(&mut self, _config: QueryConfig) {}
}

/// A scene with nothing in it. Every sample survives untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObstruction;

impl SceneQuery for NoObstruction {
    fn overlaps(&self, _point: Point, _radius: Value, _layers: LayerMask) -> bool {
        false
    }

    fn raycast(&self, _: Point, _: Vector, _: Value, _: LayerMask) -> Option<Point> {
        None
    }
}

/// Temporarily switches a [`SceneQuery`] to back-face hits.
///
/// The previous [`QueryConfig`] is restored when the scope is dropped,
/// including during unwinding.
///
/// ```rust,ignore
/// let scope = QueryScope::backfaces(&mut physics);
/// let blocked = scope.overlaps(point, 0.01, layers);
/// drop(scope); // physics is back to its previous configuration
/// ```
pub struct QueryScope<'a, Q: SceneQuery + ?Sized> {
    query: &'a mut Q,
    saved: QueryConfig,
}

impl<'a, Q: SceneQuery + ?Sized> QueryScope<'a, Q> {
    /// Saves the current configuration and applies `config`.
    pub fn new(query: &'a mut Q, config: QueryConfig) -> Self {
        let saved = query.query_config();
        query.set_query_config(config);
        Self { query, saved }
    }

    /// Enables back-face hits for the lifetime of the scope.
    pub fn backfaces(query: &'a mut Q) -> Self {
        Self::new(query, QueryConfig { hit_backfaces: true })
    }
}

impl<Q: SceneQuery + ?Sized> Deref for QueryScope<'_, Q> {
    type Target = Q;

    fn deref(&self) -> &Q {
        self.query
    }
}

impl<Q: SceneQuery + ?Sized> DerefMut for QueryScope<'_, Q> {
    fn deref_mut(&mut self) -> &mut Q {
        self.query
    }
}

impl<Q: SceneQuery + ?Sized> Drop for QueryScope<'_, Q> {
    fn drop(&mut self) {
        self.query.set_query_config(self.saved);
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    #[derive(Default)]
    struct Toggle {
        config: QueryConfig,
    }

    impl SceneQuery for Toggle {
        fn overlaps(&self, _: Point, _: Value, _: LayerMask) -> bool {
            assert!(self.config.hit_backfaces, "queried outside a back-face scope");
            false
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

    #[test]
    fn scope_restores_previous_config() {
        let mut scene = Toggle::default();
        {
            let scope = QueryScope::backfaces(&mut scene);
            assert!(scope.query_config().hit_backfaces);
            assert!(!scope.overlaps(Point::origin(), 0.01, LayerMask::ALL));
        }
        assert!(!scene.config.hit_backfaces);
    }

    #[test]
    fn scope_restores_config_on_panic() {
        let mut scene = Toggle::default();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _scope = QueryScope::backfaces(&mut scene);
            panic!("query blew up");
        }));
        assert!(result.is_err());
        assert!(!scene.config.hit_backfaces);
    }

    #[test]
    fn scope_keeps_an_already_enabled_flag() {
        let mut scene = Toggle {
            config: QueryConfig {
                hit_backfaces: true,
            },
        };
        drop(QueryScope::backfaces(&mut scene));
        assert!(scene.config.hit_backfaces);
    }
}
