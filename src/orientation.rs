//! Immutable 3x3 orientation matrix.
//!
//! Columns of a patient orientation matrix are the row direction, the
//! column direction and the slice normal. The matrix is used to order
//! slices along the normal and to describe the volume frame.

use std::fmt;
use std::sync::OnceLock;

use nalgebra::{Matrix3, Point3, Vector3};

use crate::enums::Orientation;

/// Minimum component magnitude for an axis to count as dominant.
const ORIENTATION_CODE_THRESHOLD: f64 = 1e-4;

/// Value and position of the largest magnitude element of a row or column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbsMax {
    pub value: f64,
    pub index: usize,
}

pub struct OrientationMatrix {
    matrix: Matrix3<f64>,
    inverse: OnceLock<Option<Box<OrientationMatrix>>>,
}

impl OrientationMatrix {
    /// Build from 9 row-major values.
    pub fn new(values: [f64; 9]) -> Self {
        Self::from_matrix(Matrix3::from_row_slice(&values))
    }

    pub fn from_matrix(matrix: Matrix3<f64>) -> Self {
        Self {
            matrix,
            inverse: OnceLock::new(),
        }
    }

    pub fn identity() -> Self {
        Self::from_matrix(Matrix3::identity())
    }

    /// Matrix whose columns are the given vectors.
    pub fn from_columns(x: &Vector3<f64>, y: &Vector3<f64>, z: &Vector3<f64>) -> Self {
        Self::from_matrix(Matrix3::from_columns(&[*x, *y, *z]))
    }

    /// Build from image orientation cosines (row direction then column
    /// direction); the third column is their cross product.
    pub fn from_cosines(cosines: &[f64; 6]) -> Self {
        let row = Vector3::new(cosines[0], cosines[1], cosines[2]);
        let col = Vector3::new(cosines[3], cosines[4], cosines[5]);
        let normal = row.cross(&col);
        Self::from_columns(&row, &col, &normal)
    }

    /// Signed permutation matrix whose columns match an orientation code
    /// such as "LPS". Returns `None` for codes that are not three letters
    /// covering each axis once.
    pub fn from_orientation_code(code: &str) -> Option<Self> {
        let letters: Vec<char> = code.chars().collect();
        if letters.len() != 3 {
            return None;
        }
        let mut matrix = Matrix3::zeros();
        let mut used = [false; 3];
        for (col, letter) in letters.into_iter().enumerate() {
            let (axis, sign) = match letter.to_ascii_uppercase() {
                'L' => (0, 1.0),
                'R' => (0, -1.0),
                'P' => (1, 1.0),
                'A' => (1, -1.0),
                'S' => (2, 1.0),
                'I' => (2, -1.0),
                _ => return None,
            };
            if used[axis] {
                return None;
            }
            used[axis] = true;
            matrix[(axis, col)] = sign;
        }
        Some(Self::from_matrix(matrix))
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Element at `row`, `col`.
    ///
    /// # Panics
    ///
    /// Panics if either index is greater than 2.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < 3 && col < 3, "matrix index ({row}, {col}) out of range");
        self.matrix[(row, col)]
    }

    pub fn column(&self, col: usize) -> Vector3<f64> {
        self.matrix.column(col).into_owned()
    }

    pub fn determinant(&self) -> f64 {
        self.matrix.determinant()
    }

    /// Inverse through the adjugate, computed on first use and cached.
    /// `None` when the determinant is exactly zero.
    pub fn inverse(&self) -> Option<&OrientationMatrix> {
        self.inverse
            .get_or_init(|| self.compute_inverse().map(Box::new))
            .as_deref()
    }

    fn compute_inverse(&self) -> Option<OrientationMatrix> {
        let det = self.determinant();
        if det == 0.0 {
            return None;
        }
        let m = |row: usize, col: usize| self.matrix[(row, col)];
        let adjugate = Matrix3::new(
            m(1, 1) * m(2, 2) - m(1, 2) * m(2, 1),
            m(0, 2) * m(2, 1) - m(0, 1) * m(2, 2),
            m(0, 1) * m(1, 2) - m(0, 2) * m(1, 1),
            m(1, 2) * m(2, 0) - m(1, 0) * m(2, 2),
            m(0, 0) * m(2, 2) - m(0, 2) * m(2, 0),
            m(0, 2) * m(1, 0) - m(0, 0) * m(1, 2),
            m(1, 0) * m(2, 1) - m(1, 1) * m(2, 0),
            m(0, 1) * m(2, 0) - m(0, 0) * m(2, 1),
            m(0, 0) * m(1, 1) - m(0, 1) * m(1, 0),
        );
        Some(OrientationMatrix::from_matrix(adjugate / det))
    }

    pub fn multiply(&self, rhs: &OrientationMatrix) -> OrientationMatrix {
        OrientationMatrix::from_matrix(self.matrix * rhs.matrix)
    }

    /// Product with a 3 element array; `None` for any other length.
    pub fn multiply_array(&self, values: &[f64]) -> Option<[f64; 3]> {
        let [x, y, z] = <[f64; 3]>::try_from(values).ok()?;
        let product = self.matrix * Vector3::new(x, y, z);
        Some([product.x, product.y, product.z])
    }

    pub fn multiply_vector(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.matrix * vector
    }

    pub fn multiply_point(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.matrix * point.coords)
    }

    /// Product with an integer index, rounded back to the nearest index.
    pub fn multiply_index(&self, index: &[i64; 3]) -> [i64; 3] {
        let index = Vector3::new(index[0] as f64, index[1] as f64, index[2] as f64);
        let product = self.matrix * index;
        [product.x, product.y, product.z].map(|v| v.round() as i64)
    }

    /// Largest magnitude element of `row`, first one wins on ties.
    pub fn row_abs_max(&self, row: usize) -> AbsMax {
        Self::abs_max(self.matrix.row(row).iter().copied())
    }

    /// Largest magnitude element of `col`, first one wins on ties.
    pub fn col_abs_max(&self, col: usize) -> AbsMax {
        Self::abs_max(self.matrix.column(col).iter().copied())
    }

    fn abs_max(values: impl Iterator<Item = f64>) -> AbsMax {
        let mut max = AbsMax { value: 0.0, index: 0 };
        for (index, value) in values.enumerate() {
            if index == 0 || value.abs() > max.value.abs() {
                max = AbsMax { value, index };
            }
        }
        max
    }

    /// Element-wise comparison within `tolerance`.
    pub fn equals(&self, other: &OrientationMatrix, tolerance: f64) -> bool {
        self.matrix
            .iter()
            .zip(other.matrix.iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    /// Three letter patient orientation code of the columns, e.g. "LPS".
    ///
    /// Stops at the first column without a dominant axis, so degenerate
    /// matrices yield a shorter code.
    pub fn orientation_code(&self) -> String {
        let mut code = String::with_capacity(3);
        for column in self.matrix.column_iter() {
            let mut dominant: Option<(usize, f64)> = None;
            for (axis, value) in column.iter().copied().enumerate() {
                let current = dominant.map_or(ORIENTATION_CODE_THRESHOLD, |(_, v)| v.abs());
                if value.abs() > current {
                    dominant = Some((axis, value));
                }
            }
            let Some((axis, value)) = dominant else {
                break;
            };
            let letter = match (axis, value < 0.0) {
                (0, true) => 'R',
                (0, false) => 'L',
                (1, true) => 'A',
                (1, false) => 'P',
                (_, true) => 'I',
                (_, false) => 'S',
            };
            code.push(letter);
        }
        code
    }
}

impl From<Orientation> for OrientationMatrix {
    fn from(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Axial => OrientationMatrix::identity(),
            Orientation::Coronal => {
                OrientationMatrix::new([1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, -1.0, 0.0])
            }
            Orientation::Sagittal => {
                OrientationMatrix::new([0.0, 0.0, -1.0, 1.0, 0.0, 0.0, 0.0, -1.0, 0.0])
            }
        }
    }
}

impl Clone for OrientationMatrix {
    fn clone(&self) -> Self {
        Self::from_matrix(self.matrix)
    }
}

impl PartialEq for OrientationMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other, f64::EPSILON)
    }
}

impl fmt::Debug for OrientationMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OrientationMatrix").field(&self.matrix).finish()
    }
}

impl fmt::Display for OrientationMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.matrix.row_iter() {
            writeln!(f, "[{}, {}, {}]", row[0], row[1], row[2])?;
        }
        Ok(())
    }
}
