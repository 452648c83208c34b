/// A point in user or text space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Affine transformation matrix `[a b c d e f]`.
///
/// Maps `(x, y)` to `(a·x + c·y + e, b·x + d·y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Exact comparison against the identity matrix.
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// `self × other`: apply `self` first, then `other`.
    ///
    /// This is PDF concatenation order, so `cm` with matrix `m` turns a
    /// CTM into `m.concat(&ctm)`.
    pub fn concat(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// `translate(tx, ty) × self`.
    pub fn pre_translate(&self, tx: f64, ty: f64) -> Matrix {
        Matrix {
            e: self.e + tx * self.a + ty * self.c,
            f: self.f + tx * self.b + ty * self.d,
            ..*self
        }
    }

    pub fn transform_point(&self, p: Point) -> Point {
        Point {
            x: self.a * p.x + self.c * p.y + self.e,
            y: self.b * p.x + self.d * p.y + self.f,
        }
    }

    /// Bounding box of the transformed corners of `rect`.
    pub fn transform_rect(&self, rect: &Rect) -> Rect {
        if rect.is_empty() {
            return *rect;
        }
        let corners = [
            self.transform_point(Point::new(rect.x0, rect.y0)),
            self.transform_point(Point::new(rect.x1, rect.y0)),
            self.transform_point(Point::new(rect.x0, rect.y1)),
            self.transform_point(Point::new(rect.x1, rect.y1)),
        ];
        let mut out = Rect::new(corners[0].x, corners[0].y, corners[0].x, corners[0].y);
        for p in &corners[1..] {
            out.x0 = out.x0.min(p.x);
            out.y0 = out.y0.min(p.y);
            out.x1 = out.x1.max(p.x);
            out.y1 = out.y1.max(p.y);
        }
        out
    }

    pub fn to_array(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }
}

/// Axis-aligned rectangle with bottom-left origin (PDF user space).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// The empty rectangle; a union identity.
    pub fn empty() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "expected {b}, got {a}");
    }

    #[test]
    fn identity_is_identity() {
        assert!(Matrix::identity().is_identity());
        assert!(!Matrix::translate(1.0, 0.0).is_identity());
    }

    #[test]
    fn concat_applies_self_first() {
        let scale = Matrix::scale(2.0, 2.0);
        let shift = Matrix::translate(10.0, 0.0);
        let p = scale.concat(&shift).transform_point(Point::new(1.0, 1.0));
        assert_approx(p.x, 12.0);
        assert_approx(p.y, 2.0);
        let p = shift.concat(&scale).transform_point(Point::new(1.0, 1.0));
        assert_approx(p.x, 22.0);
    }

    #[test]
    fn pre_translate_matches_concat() {
        let m = Matrix::new(2.0, 0.0, 0.0, 3.0, 5.0, 7.0);
        assert_eq!(m.pre_translate(1.0, 1.0), Matrix::translate(1.0, 1.0).concat(&m));
    }

    #[test]
    fn transform_rect_bounds_rotated_corners() {
        let rot = Matrix::new(0.0, 1.0, -1.0, 0.0, 0.0, 0.0);
        let r = rot.transform_rect(&Rect::new(0.0, 0.0, 2.0, 1.0));
        assert_approx(r.x0, -1.0);
        assert_approx(r.y0, 0.0);
        assert_approx(r.x1, 0.0);
        assert_approx(r.y1, 2.0);
    }

    #[test]
    fn union_skips_empty() {
        let a = Rect::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(Rect::empty().union(&a), a);
        let b = Rect::new(2.0, -1.0, 3.0, 0.5);
        assert_eq!(a.union(&b), Rect::new(0.0, -1.0, 3.0, 1.0));
        assert_approx(a.union(&b).width(), 3.0);
    }
}
