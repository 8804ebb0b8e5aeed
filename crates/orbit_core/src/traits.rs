use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars in update rules.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// An out-of-place update rule for a vector-valued map, x_{n+1} = f(x_n).
///
/// Implemented generically over `Scalar` (for both `f64` and `Dual`) the rule
/// can be differentiated by the adapter in `autodiff`; an implementation for
/// `f64` alone is enough when an analytic Jacobian is supplied instead.
pub trait MapRule<T: Scalar> {
    /// Number of state variables the rule reads and writes.
    fn dimension(&self) -> usize;

    /// Evaluates the map.
    /// x: current state
    /// out: buffer to write the next state (never aliases x)
    fn apply(&self, x: &[T], out: &mut [T]);
}

/// An update rule for a one-dimensional map.
pub trait ScalarRule<T: Scalar> {
    fn apply(&self, x: T) -> T;
}

/// Plain closures work as scalar rules. A closure is monomorphic, so
/// `|x: f64| ...` satisfies `ScalarRule<f64>` only; derivative synthesis
/// needs a rule implemented generically over `Scalar`.
impl<T: Scalar, F: Fn(T) -> T> ScalarRule<T> for F {
    fn apply(&self, x: T) -> T {
        self(x)
    }
}

/// An in-place update rule for large systems: writes the next state into a
/// caller-supplied buffer instead of returning a fresh vector.
///
/// `out` and `x` are always physically distinct buffers; an implementation
/// may freely write `out` in any order without corrupting its input.
pub trait InPlaceRule<T: Scalar> {
    /// Evaluates the map.
    /// out: buffer to write the next state
    /// x: current state (never aliases out)
    fn apply(&self, out: &mut [T], x: &[T]);
}

/// The single-step contract shared by all three system variants.
///
/// Stepping takes `&mut self` uniformly: the large variant reuses a private
/// scratch buffer, and exclusive access is what rules out two evolutions
/// running on one system at the same time.
pub trait DiscreteSystem {
    /// Owned representation of one point of the state space.
    type State: Clone + PartialEq + Debug + 'static;

    /// Returns the dimension of the state space (constant for the lifetime
    /// of the system).
    fn dimension(&self) -> usize;

    /// Returns an owned copy of the current state.
    fn state(&self) -> Self::State;

    /// Replaces the current state.
    fn set_state(&mut self, state: Self::State);

    /// Applies the update rule once to a caller-owned point. The stored
    /// state is not touched.
    fn advance(&mut self, x: &mut Self::State);

    /// Applies the update rule once to the stored state.
    fn advance_in_place(&mut self);
}
