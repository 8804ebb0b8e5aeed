use crate::dataset::Dataset;
use crate::error::SystemError;
use crate::traits::DiscreteSystem;

/// Applies the update rule `steps` times to a copy of the current state and
/// returns the result. The stored state is untouched; `steps == 0` returns
/// the current state unchanged.
///
/// Exclusive access is required because the large variant steps through a
/// private scratch buffer; one evolution per system at a time.
pub fn evolve<S: DiscreteSystem>(system: &mut S, steps: usize) -> S::State {
    let mut x = system.state();
    for _ in 0..steps {
        system.advance(&mut x);
    }
    x
}

/// Applies the update rule `steps` times, writing each step's result back
/// into the stored state. Returns the system for chaining.
pub fn evolve_in_place<S: DiscreteSystem>(system: &mut S, steps: usize) -> &mut S {
    for _ in 0..steps {
        system.advance_in_place();
    }
    system
}

/// Collects `steps` consecutive states into a [`Dataset`], starting from the
/// state at call time. Point i+1 is the update rule applied to point i; the
/// stored state is untouched, and every returned point is an independent
/// copy.
pub fn trajectory<S: DiscreteSystem>(
    system: &mut S,
    steps: usize,
) -> Result<Dataset<S::State>, SystemError> {
    if steps == 0 {
        return Err(SystemError::InvalidStepCount(steps));
    }

    let mut points = Vec::with_capacity(steps);
    let mut x = system.state();
    for _ in 1..steps {
        points.push(x.clone());
        system.advance(&mut x);
    }
    points.push(x);

    Ok(Dataset::new(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{BigDiscreteMap, DiscreteMap, ScalarMap};
    use crate::traits::{InPlaceRule, MapRule, Scalar, ScalarRule};
    use nalgebra::{DVector, Vector2};

    #[derive(Clone, Copy)]
    struct Logistic {
        r: f64,
    }

    impl<T: Scalar> ScalarRule<T> for Logistic {
        fn apply(&self, x: T) -> T {
            let r = T::from_f64(self.r).unwrap();
            r * x * (T::one() - x)
        }
    }

    #[derive(Clone, Copy)]
    struct Henon {
        a: f64,
        b: f64,
    }

    impl<T: Scalar> MapRule<T> for Henon {
        fn dimension(&self) -> usize {
            2
        }

        fn apply(&self, x: &[T], out: &mut [T]) {
            let a = T::from_f64(self.a).unwrap();
            let b = T::from_f64(self.b).unwrap();
            out[0] = T::one() - a * x[0] * x[0] + x[1];
            out[1] = b * x[0];
        }
    }

    struct HenonInPlace {
        a: f64,
        b: f64,
    }

    impl<T: Scalar> InPlaceRule<T> for HenonInPlace {
        fn apply(&self, out: &mut [T], x: &[T]) {
            let a = T::from_f64(self.a).unwrap();
            let b = T::from_f64(self.b).unwrap();
            out[0] = T::one() - a * x[0] * x[0] + x[1];
            out[1] = b * x[0];
        }
    }

    fn logistic_map() -> ScalarMap<Logistic> {
        ScalarMap::new(0.2, Logistic { r: 4.0 })
    }

    fn henon_map() -> DiscreteMap<2, Henon> {
        DiscreteMap::new(Vector2::new(0.1, 0.2), Henon { a: 1.4, b: 0.3 }).expect("construct")
    }

    fn henon_map_big() -> BigDiscreteMap {
        BigDiscreteMap::builder(DVector::from_vec(vec![0.1, 0.2]))
            .rule(HenonInPlace { a: 1.4, b: 0.3 })
            .build()
            .expect("construct")
    }

    #[test]
    fn logistic_map_follows_known_orbit() {
        let mut system = logistic_map();

        let orbit = trajectory(&mut system, 5).expect("trajectory");
        let expected = [0.2, 0.64, 0.9216, 0.28901376, 0.8219392261226498];
        assert_eq!(orbit.len(), 5);
        for (point, want) in orbit.iter().zip(expected) {
            assert!((point - want).abs() < 1e-12);
        }

        assert!((evolve(&mut system, 4) - expected[4]).abs() < 1e-12);
    }

    #[test]
    fn evolve_does_not_mutate_the_system() {
        let mut system = henon_map();
        let before = system.state();
        let _ = evolve(&mut system, 50);
        let _ = trajectory(&mut system, 50).expect("trajectory");
        assert_eq!(system.state(), before);

        let mut big = henon_map_big();
        let before = big.state();
        let _ = evolve(&mut big, 50);
        let _ = trajectory(&mut big, 50).expect("trajectory");
        assert_eq!(big.state(), before);
    }

    #[test]
    fn evolve_zero_steps_is_identity() {
        let mut system = logistic_map();
        assert_eq!(evolve(&mut system, 0), 0.2);
    }

    #[test]
    fn in_place_evolution_composes() {
        let mut split = henon_map();
        evolve_in_place(&mut split, 3);
        evolve_in_place(&mut split, 4);

        let mut whole = henon_map();
        evolve_in_place(&mut whole, 7);

        assert_eq!(split.state(), whole.state());
    }

    #[test]
    fn in_place_evolution_matches_pure_evolution() {
        let mut pure = henon_map();
        let expected = evolve(&mut pure, 10);

        let mut mutated = henon_map();
        evolve_in_place(&mut mutated, 10);
        assert_eq!(mutated.state(), expected);
    }

    #[test]
    fn trajectory_points_follow_the_rule() {
        let rule = Henon { a: 1.4, b: 0.3 };
        let mut system = henon_map();
        let initial = system.state();
        let orbit = trajectory(&mut system, 20).expect("trajectory");

        assert_eq!(orbit.len(), 20);
        assert_eq!(orbit[0], initial);
        for i in 1..orbit.len() {
            let mut next = Vector2::zeros();
            rule.apply(orbit[i - 1].as_slice(), next.as_mut_slice());
            assert_eq!(orbit[i], next);
        }
    }

    #[test]
    fn variants_evolve_identically() {
        let mut small = henon_map();
        let mut big = henon_map_big();

        let small_orbit = trajectory(&mut small, 25).expect("trajectory");
        let big_orbit = trajectory(&mut big, 25).expect("trajectory");
        for (a, b) in small_orbit.iter().zip(big_orbit.iter()) {
            assert_eq!(a.as_slice(), b.as_slice());
        }

        let small_final = evolve(&mut small, 25);
        let big_final = evolve(&mut big, 25);
        assert_eq!(small_final.as_slice(), big_final.as_slice());

        evolve_in_place(&mut small, 25);
        evolve_in_place(&mut big, 25);
        assert_eq!(small.state().as_slice(), big.state().as_slice());
    }

    #[test]
    fn single_point_trajectory_is_the_current_state() {
        let mut system = logistic_map();
        let orbit = trajectory(&mut system, 1).expect("trajectory");
        assert_eq!(orbit.len(), 1);
        assert_eq!(orbit[0], 0.2);
    }

    #[test]
    fn zero_step_trajectory_is_rejected() {
        let mut system = logistic_map();
        let err = trajectory(&mut system, 0).expect_err("expected invalid step count");
        assert_eq!(err, SystemError::InvalidStepCount(0));
    }

    #[test]
    fn trajectory_owns_its_points() {
        let mut big = henon_map_big();
        let orbit = trajectory(&mut big, 5).expect("trajectory");
        let snapshot = orbit.clone();

        // Mutating the system afterwards must not reach into the dataset.
        evolve_in_place(&mut big, 10);
        assert_eq!(orbit, snapshot);
        assert_eq!(orbit[0], DVector::from_vec(vec![0.1, 0.2]));
    }

    #[test]
    fn chained_in_place_evolution_returns_the_system() {
        let mut system = logistic_map();
        let state = evolve_in_place(&mut system, 1).state();
        assert!((state - 0.64).abs() < 1e-12);
    }
}
