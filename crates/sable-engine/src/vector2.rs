//! 2D vector value type shared by every subsystem.
//!
//! [`Vector2`] uses `f64` components in pixel space. Conversions to and from
//! rapier's `f32` vectors are lossless in the direction engine -> physics only
//! up to `f32` precision, which is the precision the physics backend runs at.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use rapier2d::prelude::{Real, Vector};
use serde::{Deserialize, Serialize};

/// A 2D vector with element-wise arithmetic and scalar broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component.
    pub y: f64,
}

impl Vector2 {
    /// The zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Construct a vector from its components.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length.
    #[inline]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Squared length, avoiding the square root.
    #[inline]
    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Unit vector pointing in the same direction.
    ///
    /// The zero vector has no direction: normalizing it divides by zero and
    /// yields NaN components. Callers must check [`length`](Self::length)
    /// first.
    #[inline]
    pub fn normalize(self) -> Self {
        self / self.length()
    }

    /// Dot product.
    #[inline]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Linear interpolation from `self` towards `target` by `t`.
    ///
    /// `t = 0` returns `self`, `t = 1` returns `target`; values outside
    /// `[0, 1]` extrapolate.
    #[inline]
    pub fn lerp(self, target: Self, t: f64) -> Self {
        self + (target - self) * t
    }
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

impl Add for Vector2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vector2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vector2 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul for Vector2 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::new(self.x * rhs.x, self.y * rhs.y)
    }
}

impl Mul<f64> for Vector2 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Div for Vector2 {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        Self::new(self.x / rhs.x, self.y / rhs.y)
    }
}

impl Div<f64> for Vector2 {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vector2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl fmt::Display for Vector2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// External representations
// ---------------------------------------------------------------------------

impl From<Vector<Real>> for Vector2 {
    fn from(v: Vector<Real>) -> Self {
        Self::new(v.x as f64, v.y as f64)
    }
}

impl From<Vector2> for Vector<Real> {
    fn from(v: Vector2) -> Self {
        Vector::new(v.x as Real, v.y as Real)
    }
}

impl From<(f64, f64)> for Vector2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<Vector2> for (f64, f64) {
    fn from(v: Vector2) -> Self {
        (v.x, v.y)
    }
}

impl From<[f32; 2]> for Vector2 {
    fn from([x, y]: [f32; 2]) -> Self {
        Self::new(x as f64, y as f64)
    }
}

impl From<Vector2> for [f32; 2] {
    fn from(v: Vector2) -> Self {
        [v.x as f32, v.y as f32]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_is_element_wise() {
        let a = Vector2::new(1.0, 2.0);
        let b = Vector2::new(3.0, 5.0);
        assert_eq!(a + b, Vector2::new(4.0, 7.0));
        assert_eq!(b - a, Vector2::new(2.0, 3.0));
        assert_eq!(a * b, Vector2::new(3.0, 10.0));
        assert_eq!(b / a, Vector2::new(3.0, 2.5));
        assert_eq!(-a, Vector2::new(-1.0, -2.0));
    }

    #[test]
    fn scalar_operators_broadcast() {
        let v = Vector2::new(2.0, -4.0);
        assert_eq!(v * 0.5, Vector2::new(1.0, -2.0));
        assert_eq!(v / 2.0, Vector2::new(1.0, -2.0));
    }

    #[test]
    fn length_and_normalize() {
        let v = Vector2::new(3.0, 4.0);
        assert_eq!(v.length(), 5.0);
        let n = v.normalize();
        assert!((n.length() - 1.0).abs() < 1e-12, "got {}", n.length());
        assert!((n.x - 0.6).abs() < 1e-12);
    }

    #[test]
    fn normalizing_zero_yields_nan() {
        let n = Vector2::ZERO.normalize();
        assert!(n.x.is_nan() && n.y.is_nan());
    }

    #[test]
    fn lerp_endpoints_and_midpoint() {
        let a = Vector2::new(0.0, 10.0);
        let b = Vector2::new(10.0, 20.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Vector2::new(5.0, 15.0));
    }

    #[test]
    fn converts_to_and_from_physics_vectors() {
        let v = Vector2::new(1.5, -2.25);
        let p: Vector<Real> = v.into();
        assert_eq!(p.x, 1.5);
        assert_eq!(Vector2::from(p), v);
    }

    #[test]
    fn assign_operators() {
        let mut v = Vector2::new(1.0, 1.0);
        v += Vector2::new(2.0, 3.0);
        v -= Vector2::new(1.0, 1.0);
        assert_eq!(v, Vector2::new(2.0, 3.0));
        assert_eq!(format!("{v}"), "(2, 3)");
    }
}
