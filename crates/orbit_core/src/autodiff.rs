use crate::traits::{InPlaceRule, MapRule, ScalarRule};
use nalgebra::DMatrix;
use num_traits::{Float, FromPrimitive, Num, NumCast, One, ToPrimitive, Zero};
use std::ops::{
    Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, RemAssign, Sub, SubAssign,
};

/// Dual number for forward-mode automatic differentiation.
/// val: real part
/// eps: infinitesimal part (carries the derivative)
///
/// Seeding an input with eps = 1 and evaluating a rule on `Dual` values
/// yields the exact derivative in the output's eps part, to floating-point
/// precision. At points where the rule is not differentiable the eps part is
/// whatever the one-sided arithmetic produces (possibly NaN); this is
/// propagated, not flagged.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Dual {
    pub val: f64,
    pub eps: f64,
}

impl Dual {
    pub fn new(val: f64, eps: f64) -> Self {
        Self { val, eps }
    }

    /// A value with no derivative seed (a constant).
    pub fn constant(val: f64) -> Self {
        Self { val, eps: 0.0 }
    }
}

// The trait ladder below is what lets `Dual` pass for a `Scalar`, so user
// rules written generically run unchanged on dual inputs.

impl Zero for Dual {
    fn zero() -> Self {
        Self::new(0.0, 0.0)
    }
    fn is_zero(&self) -> bool {
        self.val == 0.0 && self.eps == 0.0
    }
}

impl One for Dual {
    fn one() -> Self {
        Self::new(1.0, 0.0)
    }
}

impl Add for Dual {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.val + rhs.val, self.eps + rhs.eps)
    }
}

impl Sub for Dual {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.val - rhs.val, self.eps - rhs.eps)
    }
}

impl Mul for Dual {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self::new(self.val * rhs.val, self.val * rhs.eps + self.eps * rhs.val)
    }
}

impl Div for Dual {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        let denom = rhs.val * rhs.val;
        Self::new(
            self.val / rhs.val,
            (self.eps * rhs.val - self.val * rhs.eps) / denom,
        )
    }
}

impl Neg for Dual {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.val, -self.eps)
    }
}

impl Rem for Dual {
    type Output = Self;
    fn rem(self, rhs: Self) -> Self {
        // Piecewise-constant shift; the derivative passes through.
        Self::new(self.val % rhs.val, self.eps)
    }
}

impl AddAssign for Dual {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}
impl SubAssign for Dual {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}
impl MulAssign for Dual {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}
impl DivAssign for Dual {
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}
impl RemAssign for Dual {
    fn rem_assign(&mut self, rhs: Self) {
        *self = *self % rhs;
    }
}

impl Num for Dual {
    type FromStrRadixErr = ();
    fn from_str_radix(str: &str, radix: u32) -> Result<Self, Self::FromStrRadixErr> {
        f64::from_str_radix(str, radix)
            .map(Self::constant)
            .map_err(|_| ())
    }
}

impl ToPrimitive for Dual {
    fn to_i64(&self) -> Option<i64> {
        self.val.to_i64()
    }
    fn to_u64(&self) -> Option<u64> {
        self.val.to_u64()
    }
    fn to_f64(&self) -> Option<f64> {
        Some(self.val)
    }
}

impl FromPrimitive for Dual {
    fn from_i64(n: i64) -> Option<Self> {
        Some(Self::constant(n as f64))
    }
    fn from_u64(n: u64) -> Option<Self> {
        Some(Self::constant(n as f64))
    }
    fn from_f64(n: f64) -> Option<Self> {
        Some(Self::constant(n))
    }
}

impl NumCast for Dual {
    fn from<T: ToPrimitive>(n: T) -> Option<Self> {
        n.to_f64().map(Self::constant)
    }
}

impl Float for Dual {
    fn nan() -> Self {
        Self::constant(f64::NAN)
    }
    fn infinity() -> Self {
        Self::constant(f64::INFINITY)
    }
    fn neg_infinity() -> Self {
        Self::constant(f64::NEG_INFINITY)
    }
    fn neg_zero() -> Self {
        Self::new(-0.0, -0.0)
    }
    fn min_value() -> Self {
        Self::constant(f64::MIN)
    }
    fn min_positive_value() -> Self {
        Self::constant(f64::MIN_POSITIVE)
    }
    fn max_value() -> Self {
        Self::constant(f64::MAX)
    }
    fn is_nan(self) -> bool {
        self.val.is_nan()
    }
    fn is_infinite(self) -> bool {
        self.val.is_infinite()
    }
    fn is_finite(self) -> bool {
        self.val.is_finite()
    }
    fn is_normal(self) -> bool {
        self.val.is_normal()
    }
    fn classify(self) -> std::num::FpCategory {
        self.val.classify()
    }

    // Step functions: derivative is zero almost everywhere.
    fn floor(self) -> Self {
        Self::constant(self.val.floor())
    }
    fn ceil(self) -> Self {
        Self::constant(self.val.ceil())
    }
    fn round(self) -> Self {
        Self::constant(self.val.round())
    }
    fn trunc(self) -> Self {
        Self::constant(self.val.trunc())
    }
    fn fract(self) -> Self {
        Self::new(self.val.fract(), self.eps)
    }
    fn signum(self) -> Self {
        Self::constant(self.val.signum())
    }

    fn abs(self) -> Self {
        Self::new(
            self.val.abs(),
            if self.val >= 0.0 { self.eps } else { -self.eps },
        )
    }
    fn abs_sub(self, other: Self) -> Self {
        if self.val > other.val {
            self - other
        } else {
            Self::constant(0.0)
        }
    }
    fn is_sign_positive(self) -> bool {
        self.val.is_sign_positive()
    }
    fn is_sign_negative(self) -> bool {
        self.val.is_sign_negative()
    }
    fn mul_add(self, a: Self, b: Self) -> Self {
        self * a + b
    }
    fn recip(self) -> Self {
        Self::one() / self
    }

    fn powi(self, n: i32) -> Self {
        Self::new(
            self.val.powi(n),
            (n as f64) * self.val.powi(n - 1) * self.eps,
        )
    }
    fn powf(self, n: Self) -> Self {
        // x^y = exp(y ln x)
        let v = self.val.powf(n.val);
        Self::new(
            v,
            v * (n.eps * self.val.ln() + n.val * self.eps / self.val),
        )
    }
    fn sqrt(self) -> Self {
        let s = self.val.sqrt();
        Self::new(s, self.eps / (2.0 * s))
    }
    fn cbrt(self) -> Self {
        let c = self.val.cbrt();
        Self::new(c, self.eps / (3.0 * c * c))
    }
    fn hypot(self, other: Self) -> Self {
        let h = self.val.hypot(other.val);
        Self::new(h, (self.val * self.eps + other.val * other.eps) / h)
    }

    fn exp(self) -> Self {
        let e = self.val.exp();
        Self::new(e, e * self.eps)
    }
    fn exp2(self) -> Self {
        let e = self.val.exp2();
        Self::new(e, e * std::f64::consts::LN_2 * self.eps)
    }
    fn exp_m1(self) -> Self {
        Self::new(self.val.exp_m1(), self.val.exp() * self.eps)
    }
    fn ln(self) -> Self {
        Self::new(self.val.ln(), self.eps / self.val)
    }
    fn ln_1p(self) -> Self {
        Self::new(self.val.ln_1p(), self.eps / (1.0 + self.val))
    }
    fn log(self, base: Self) -> Self {
        self.ln() / base.ln()
    }
    fn log2(self) -> Self {
        Self::new(
            self.val.log2(),
            self.eps / (self.val * std::f64::consts::LN_2),
        )
    }
    fn log10(self) -> Self {
        Self::new(
            self.val.log10(),
            self.eps / (self.val * std::f64::consts::LN_10),
        )
    }

    fn max(self, other: Self) -> Self {
        if self.val > other.val {
            self
        } else {
            other
        }
    }
    fn min(self, other: Self) -> Self {
        if self.val < other.val {
            self
        } else {
            other
        }
    }

    fn sin(self) -> Self {
        Self::new(self.val.sin(), self.eps * self.val.cos())
    }
    fn cos(self) -> Self {
        Self::new(self.val.cos(), -self.eps * self.val.sin())
    }
    fn tan(self) -> Self {
        let t = self.val.tan();
        Self::new(t, self.eps * (1.0 + t * t))
    }
    fn sin_cos(self) -> (Self, Self) {
        (self.sin(), self.cos())
    }
    fn asin(self) -> Self {
        Self::new(self.val.asin(), self.eps / (1.0 - self.val * self.val).sqrt())
    }
    fn acos(self) -> Self {
        Self::new(
            self.val.acos(),
            -self.eps / (1.0 - self.val * self.val).sqrt(),
        )
    }
    fn atan(self) -> Self {
        Self::new(self.val.atan(), self.eps / (1.0 + self.val * self.val))
    }
    fn atan2(self, other: Self) -> Self {
        // self = y, other = x
        let denom = self.val * self.val + other.val * other.val;
        Self::new(
            self.val.atan2(other.val),
            (other.val * self.eps - self.val * other.eps) / denom,
        )
    }

    fn sinh(self) -> Self {
        Self::new(self.val.sinh(), self.eps * self.val.cosh())
    }
    fn cosh(self) -> Self {
        Self::new(self.val.cosh(), self.eps * self.val.sinh())
    }
    fn tanh(self) -> Self {
        let t = self.val.tanh();
        Self::new(t, self.eps * (1.0 - t * t))
    }
    fn asinh(self) -> Self {
        Self::new(
            self.val.asinh(),
            self.eps / (self.val * self.val + 1.0).sqrt(),
        )
    }
    fn acosh(self) -> Self {
        Self::new(
            self.val.acosh(),
            self.eps / (self.val * self.val - 1.0).sqrt(),
        )
    }
    fn atanh(self) -> Self {
        Self::new(self.val.atanh(), self.eps / (1.0 - self.val * self.val))
    }

    fn integer_decode(self) -> (u64, i16, i8) {
        self.val.integer_decode()
    }
}

// --- Differentiation adapter ---

/// Derivative of a scalar rule at `x`.
pub fn derivative<R>(rule: &R, x: f64) -> f64
where
    R: ScalarRule<Dual>,
{
    rule.apply(Dual::new(x, 1.0)).eps
}

/// Jacobian of an out-of-place vector rule at `x`, written row-major into
/// `out` (length must be n*n for an n-dimensional `x`).
///
/// Column j is obtained by seeding coordinate j with eps = 1 and reading the
/// eps parts of the outputs.
pub fn jacobian_row_major<R>(rule: &R, x: &[f64], out: &mut [f64])
where
    R: MapRule<Dual>,
{
    let n = x.len();
    debug_assert_eq!(out.len(), n * n);

    let mut dual_x = vec![Dual::constant(0.0); n];
    let mut dual_out = vec![Dual::constant(0.0); n];

    for j in 0..n {
        for i in 0..n {
            dual_x[i] = Dual::new(x[i], if i == j { 1.0 } else { 0.0 });
        }
        rule.apply(&dual_x, &mut dual_out);
        for i in 0..n {
            out[i * n + j] = dual_out[i].eps;
        }
    }
}

/// Jacobian of an in-place rule at `x`, written into a caller-supplied
/// matrix. The in-place rule is evaluated on dual slices, which is the
/// out-of-place wrapper the in-place form implies.
pub fn jacobian_in_place<R>(rule: &R, x: &[f64], out: &mut DMatrix<f64>)
where
    R: InPlaceRule<Dual> + ?Sized,
{
    let n = x.len();
    debug_assert_eq!(out.nrows(), n);
    debug_assert_eq!(out.ncols(), n);

    let mut dual_x = vec![Dual::constant(0.0); n];
    let mut dual_out = vec![Dual::constant(0.0); n];

    for j in 0..n {
        for i in 0..n {
            dual_x[i] = Dual::new(x[i], if i == j { 1.0 } else { 0.0 });
        }
        rule.apply(&mut dual_out, &dual_x);
        for i in 0..n {
            out[(i, j)] = dual_out[i].eps;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Scalar;

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

    #[test]
    fn product_and_quotient_rules_hold() {
        let x = Dual::new(3.0, 1.0);
        let y = Dual::constant(2.0);

        let p = x * x * y;
        assert!((p.val - 18.0).abs() < 1e-12);
        assert!((p.eps - 12.0).abs() < 1e-12);

        let q = y / x;
        assert!((q.val - 2.0 / 3.0).abs() < 1e-12);
        assert!((q.eps + 2.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn transcendental_derivatives_match_identities() {
        let x = Dual::new(0.7, 1.0);

        assert!((x.exp().eps - 0.7_f64.exp()).abs() < 1e-12);
        assert!((x.ln().eps - 1.0 / 0.7).abs() < 1e-12);
        assert!((x.sin().eps - 0.7_f64.cos()).abs() < 1e-12);
        assert!((x.tanh().eps - (1.0 - 0.7_f64.tanh().powi(2))).abs() < 1e-12);
        assert!((x.asin().eps - 1.0 / (1.0 - 0.49_f64).sqrt()).abs() < 1e-12);
        assert!((x.sqrt().eps - 0.5 / 0.7_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn chain_rule_through_composition() {
        // d/dx sin(x^2) = 2x cos(x^2)
        let x = Dual::new(1.3, 1.0);
        let y = (x * x).sin();
        let expected = 2.0 * 1.3 * (1.3_f64 * 1.3).cos();
        assert!((y.eps - expected).abs() < 1e-12);
    }

    #[test]
    fn scalar_derivative_matches_closed_form() {
        let rule = Logistic { r: 4.0 };
        // d/dx r x (1 - x) = r - 2 r x
        let x = 0.2;
        let d = derivative(&rule, x);
        assert!((d - (4.0 - 8.0 * x)).abs() < 1e-12);
    }

    #[test]
    fn jacobian_row_major_matches_closed_form() {
        let rule = Henon { a: 1.4, b: 0.3 };
        let x = [0.5, -0.2];
        let mut jac = [0.0; 4];
        jacobian_row_major(&rule, &x, &mut jac);

        // [[-2 a x0, 1], [b, 0]]
        assert!((jac[0] + 2.0 * 1.4 * 0.5).abs() < 1e-12);
        assert!((jac[1] - 1.0).abs() < 1e-12);
        assert!((jac[2] - 0.3).abs() < 1e-12);
        assert!(jac[3].abs() < 1e-12);
    }

    #[test]
    fn jacobian_in_place_matches_out_of_place() {
        let rule = HenonInPlace { a: 1.4, b: 0.3 };
        let x = [0.5, -0.2];
        let mut jac = DMatrix::zeros(2, 2);
        jacobian_in_place(&rule, &x, &mut jac);

        assert!((jac[(0, 0)] + 2.0 * 1.4 * 0.5).abs() < 1e-12);
        assert!((jac[(0, 1)] - 1.0).abs() < 1e-12);
        assert!((jac[(1, 0)] - 0.3).abs() < 1e-12);
        assert!(jac[(1, 1)].abs() < 1e-12);
    }

    #[test]
    fn closure_works_as_scalar_rule() {
        let d = derivative(&|x: Dual| x * x * x, 2.0);
        assert!((d - 12.0).abs() < 1e-12);
    }
}
