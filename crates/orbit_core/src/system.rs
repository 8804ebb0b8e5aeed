use crate::autodiff::{self, Dual};
use crate::error::SystemError;
use crate::traits::{DiscreteSystem, InPlaceRule, MapRule, ScalarRule};
use nalgebra::{DMatrix, DVector, SMatrix, SVector};
use std::any::type_name;
use std::fmt;
use std::rc::Rc;

fn check_dimension(rule: usize, state: usize) -> Result<(), SystemError> {
    if rule != state {
        return Err(SystemError::DimensionMismatch { rule, state });
    }
    Ok(())
}

// --- Small / general variant ---

/// A discrete map with a compile-time-fixed, small dimension D.
///
/// State lives on the stack and is copied by value on every step; the
/// derivative rule is resolved at construction into one stored callable,
/// either the user's analytic Jacobian or a forward-mode synthesis through
/// the update rule.
///
/// Systems are reference-identified: two maps with equal states and rules
/// are still distinct entities, and no `PartialEq` is provided.
pub struct DiscreteMap<const D: usize, R> {
    state: SVector<f64, D>,
    rule: R,
    jac: Box<dyn Fn(&SVector<f64, D>) -> SMatrix<f64, D, D>>,
}

impl<const D: usize, R> DiscreteMap<D, R>
where
    R: MapRule<f64> + MapRule<Dual> + Clone + 'static,
{
    /// Builds a map whose Jacobian is synthesized by forward-mode
    /// differentiation of `rule`. The synthesis happens through a clone of
    /// the rule captured at construction; it is never re-derived.
    pub fn new(state: SVector<f64, D>, rule: R) -> Result<Self, SystemError> {
        check_dimension(MapRule::<f64>::dimension(&rule), D)?;
        let forward = rule.clone();
        let jac = Box::new(move |x: &SVector<f64, D>| {
            let mut flat = vec![0.0; D * D];
            autodiff::jacobian_row_major(&forward, x.as_slice(), &mut flat);
            SMatrix::<f64, D, D>::from_row_slice(&flat)
        });
        Ok(Self { state, rule, jac })
    }
}

impl<const D: usize, R> DiscreteMap<D, R>
where
    R: MapRule<f64>,
{
    /// Builds a map with a user-supplied analytic Jacobian. The rule only
    /// needs an `f64` implementation in this form.
    pub fn with_jacobian<J>(
        state: SVector<f64, D>,
        rule: R,
        jacobian: J,
    ) -> Result<Self, SystemError>
    where
        J: Fn(&SVector<f64, D>) -> SMatrix<f64, D, D> + 'static,
    {
        check_dimension(rule.dimension(), D)?;
        Ok(Self {
            state,
            rule,
            jac: Box::new(jacobian),
        })
    }

    /// Jacobian of the update rule at the current state.
    pub fn jacobian(&self) -> SMatrix<f64, D, D> {
        (self.jac)(&self.state)
    }

    /// Jacobian of the update rule at an arbitrary point.
    pub fn jacobian_at(&self, x: &SVector<f64, D>) -> SMatrix<f64, D, D> {
        (self.jac)(x)
    }
}

impl<const D: usize, R: MapRule<f64>> DiscreteSystem for DiscreteMap<D, R> {
    type State = SVector<f64, D>;

    fn dimension(&self) -> usize {
        D
    }

    fn state(&self) -> SVector<f64, D> {
        self.state
    }

    fn set_state(&mut self, state: SVector<f64, D>) {
        self.state = state;
    }

    fn advance(&mut self, x: &mut SVector<f64, D>) {
        let mut out = SVector::<f64, D>::zeros();
        self.rule.apply(x.as_slice(), out.as_mut_slice());
        *x = out;
    }

    fn advance_in_place(&mut self) {
        let mut out = SVector::<f64, D>::zeros();
        self.rule.apply(self.state.as_slice(), out.as_mut_slice());
        self.state = out;
    }
}

impl<const D: usize, R> fmt::Debug for DiscreteMap<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscreteMap")
            .field("state", &self.state.as_slice())
            .field("rule", &type_name::<R>())
            .finish_non_exhaustive()
    }
}

impl<const D: usize, R> fmt::Display for DiscreteMap<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}-dimensional discrete map", D)?;
        writeln!(f, " rule: {}", type_name::<R>())?;
        write!(f, " state: {:?}", self.state.as_slice())
    }
}

// --- Scalar variant ---

/// A one-dimensional discrete map over a bare `f64` state.
pub struct ScalarMap<R> {
    state: f64,
    rule: R,
    deriv: Box<dyn Fn(f64) -> f64>,
}

impl<R> ScalarMap<R>
where
    R: ScalarRule<f64> + ScalarRule<Dual> + Clone + 'static,
{
    /// Builds a map whose derivative is synthesized by forward-mode
    /// differentiation of `rule`.
    pub fn new(state: f64, rule: R) -> Self {
        let forward = rule.clone();
        let deriv = Box::new(move |x: f64| autodiff::derivative(&forward, x));
        Self { state, rule, deriv }
    }
}

impl<R> ScalarMap<R>
where
    R: ScalarRule<f64>,
{
    /// Builds a map with a user-supplied analytic derivative.
    pub fn with_derivative<Df>(state: f64, rule: R, derivative: Df) -> Self
    where
        Df: Fn(f64) -> f64 + 'static,
    {
        Self {
            state,
            rule,
            deriv: Box::new(derivative),
        }
    }

    /// Derivative of the update rule at the current state.
    pub fn derivative(&self) -> f64 {
        (self.deriv)(self.state)
    }

    /// Derivative of the update rule at an arbitrary point.
    pub fn derivative_at(&self, x: f64) -> f64 {
        (self.deriv)(x)
    }
}

impl<R: ScalarRule<f64>> DiscreteSystem for ScalarMap<R> {
    type State = f64;

    fn dimension(&self) -> usize {
        1
    }

    fn state(&self) -> f64 {
        self.state
    }

    fn set_state(&mut self, state: f64) {
        self.state = state;
    }

    fn advance(&mut self, x: &mut f64) {
        *x = self.rule.apply(*x);
    }

    fn advance_in_place(&mut self) {
        self.state = self.rule.apply(self.state);
    }
}

impl<R> fmt::Display for ScalarMap<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "1-dimensional discrete map")?;
        writeln!(f, " rule: {}", type_name::<R>())?;
        write!(f, " state: {}", self.state)
    }
}

// --- Large / in-place variant ---

/// Combined bound for boxed large-system rules: evaluatable on `f64` for
/// stepping and on `Dual` for Jacobian synthesis.
pub trait BigRule: InPlaceRule<f64> + InPlaceRule<Dual> {}

impl<R: InPlaceRule<f64> + InPlaceRule<Dual>> BigRule for R {}

/// A discrete map with a large, runtime-sized dimension and in-place
/// update/Jacobian rules.
///
/// Two buffers are allocated once at construction and reused for every
/// subsequent call: `scratch` holds the input copy handed to the rule each
/// step (so the rule never reads the buffer it is writing), and `jac`
/// receives the Jacobian. Only `state` changes across evolution calls.
///
/// Stepping requires `&mut` access, so two evolutions cannot run on one
/// system at the same time.
pub struct BigDiscreteMap {
    state: DVector<f64>,
    rule: Rc<dyn BigRule>,
    rule_name: &'static str,
    jac_rule: Box<dyn Fn(&DVector<f64>, &mut DMatrix<f64>)>,
    jac: DMatrix<f64>,
    scratch: DVector<f64>,
}

/// Assembles a [`BigDiscreteMap`]. The update rule is mandatory and is never
/// synthesized; the Jacobian rule and buffer default to forward-mode
/// synthesis and a zero matrix respectively.
pub struct BigDiscreteMapBuilder {
    state: DVector<f64>,
    rule: Option<Rc<dyn BigRule>>,
    rule_name: &'static str,
    jac_rule: Option<Box<dyn Fn(&DVector<f64>, &mut DMatrix<f64>)>>,
    jac: Option<DMatrix<f64>>,
}

impl BigDiscreteMap {
    pub fn builder(state: DVector<f64>) -> BigDiscreteMapBuilder {
        BigDiscreteMapBuilder {
            state,
            rule: None,
            rule_name: "",
            jac_rule: None,
            jac: None,
        }
    }

    /// Fills the persisted Jacobian buffer at the current state and returns
    /// a view of it.
    pub fn jacobian(&mut self) -> &DMatrix<f64> {
        (self.jac_rule)(&self.state, &mut self.jac);
        &self.jac
    }

    /// Fills the persisted Jacobian buffer at an arbitrary point.
    pub fn jacobian_at(&mut self, x: &DVector<f64>) -> &DMatrix<f64> {
        (self.jac_rule)(x, &mut self.jac);
        &self.jac
    }
}

impl BigDiscreteMapBuilder {
    /// In-place update rule: writes the next state into its first argument,
    /// reading the current state from its second.
    pub fn rule<R>(mut self, rule: R) -> Self
    where
        R: InPlaceRule<f64> + InPlaceRule<Dual> + 'static,
    {
        self.rule_name = type_name::<R>();
        self.rule = Some(Rc::new(rule));
        self
    }

    /// In-place analytic Jacobian: writes the D×D Jacobian at the given
    /// point into the supplied matrix.
    pub fn jacobian<J>(mut self, jacobian: J) -> Self
    where
        J: Fn(&DVector<f64>, &mut DMatrix<f64>) + 'static,
    {
        self.jac_rule = Some(Box::new(jacobian));
        self
    }

    /// Seed for the persisted Jacobian buffer. Must be D×D.
    pub fn jacobian_buffer(mut self, buffer: DMatrix<f64>) -> Self {
        self.jac = Some(buffer);
        self
    }

    pub fn build(self) -> Result<BigDiscreteMap, SystemError> {
        let dim = self.state.len();
        let rule = self.rule.ok_or(SystemError::MissingRule)?;

        let jac = match self.jac {
            Some(buffer) => {
                if buffer.nrows() != dim || buffer.ncols() != dim {
                    return Err(SystemError::DimensionMismatch {
                        rule: buffer.nrows(),
                        state: dim,
                    });
                }
                buffer
            }
            None => DMatrix::zeros(dim, dim),
        };

        let jac_rule = match self.jac_rule {
            Some(jacobian) => jacobian,
            None => {
                let forward = Rc::clone(&rule);
                Box::new(move |x: &DVector<f64>, out: &mut DMatrix<f64>| {
                    autodiff::jacobian_in_place(forward.as_ref(), x.as_slice(), out);
                }) as Box<dyn Fn(&DVector<f64>, &mut DMatrix<f64>)>
            }
        };

        Ok(BigDiscreteMap {
            scratch: DVector::zeros(dim),
            state: self.state,
            rule,
            rule_name: self.rule_name,
            jac_rule,
            jac,
        })
    }
}

impl DiscreteSystem for BigDiscreteMap {
    type State = DVector<f64>;

    fn dimension(&self) -> usize {
        self.state.len()
    }

    fn state(&self) -> DVector<f64> {
        self.state.clone()
    }

    fn set_state(&mut self, state: DVector<f64>) {
        // copy_from keeps the existing allocation and enforces the
        // constant-dimension invariant.
        self.state.copy_from(&state);
    }

    fn advance(&mut self, x: &mut DVector<f64>) {
        self.scratch.copy_from(x);
        InPlaceRule::<f64>::apply(&*self.rule, x.as_mut_slice(), self.scratch.as_slice());
    }

    fn advance_in_place(&mut self) {
        self.scratch.copy_from(&self.state);
        InPlaceRule::<f64>::apply(
            &*self.rule,
            self.state.as_mut_slice(),
            self.scratch.as_slice(),
        );
    }
}

impl fmt::Debug for BigDiscreteMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BigDiscreteMap")
            .field("state", &self.state.as_slice())
            .field("rule", &self.rule_name)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for BigDiscreteMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}-dimensional discrete map (in-place)", self.state.len())?;
        writeln!(f, " rule: {}", self.rule_name)?;
        write!(f, " state: {:?}", self.state.as_slice())
    }
}
