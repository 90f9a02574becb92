use crate::{Error, Matrix3, Vector3D};

/// The shape of a unit cell determines how periodic boundary conditions
/// are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellShape {
    /// Infinite cell, no periodic boundary conditions
    Infinite,
    /// Cuboid cell, with a diagonal cell matrix
    Orthorhombic,
    /// Arbitrary parallelepiped cell
    Triclinic,
}

/// Periodic boundaries of an atomic structure.
///
/// The cell matrix is stored in row major order, each row being one of the
/// cell vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitCell {
    matrix: Matrix3,
    /// transpose of `matrix`, cached for cartesian/fractional conversions
    transpose: Matrix3,
    /// inverse of `transpose`, cached for cartesian/fractional conversions
    inverse: Matrix3,
    shape: CellShape,
}

impl UnitCell {
    /// Create an infinite unit cell, i.e. a structure without periodic
    /// boundary conditions.
    pub fn infinite() -> UnitCell {
        UnitCell {
            matrix: Matrix3::zero(),
            transpose: Matrix3::zero(),
            inverse: Matrix3::zero(),
            shape: CellShape::Infinite,
        }
    }

    /// Create a unit cell from the full cell matrix, one cell vector per
    /// row. The shape is detected from the matrix.
    pub fn from_matrix(matrix: Matrix3) -> Result<UnitCell, Error> {
        if matrix.determinant() <= 1e-6 {
            return Err(Error::Geometry(format!(
                "unit cell is degenerate: determinant of the cell matrix is {}",
                matrix.determinant()
            )));
        }

        let is_close_0 = |value: f64| value.abs() < 1e-6;
        let is_diagonal = is_close_0(matrix[0][1]) && is_close_0(matrix[0][2])
            && is_close_0(matrix[1][0]) && is_close_0(matrix[1][2])
            && is_close_0(matrix[2][0]) && is_close_0(matrix[2][1]);

        let shape = if is_diagonal {
            CellShape::Orthorhombic
        } else {
            CellShape::Triclinic
        };

        return Ok(UnitCell {
            matrix: matrix,
            transpose: matrix.transposed(),
            inverse: matrix.transposed().inverse(),
            shape: shape,
        });
    }

    /// Create an orthorhombic unit cell with the given side lengths
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Result<UnitCell, Error> {
        if !(a > 0.0 && b > 0.0 && c > 0.0) {
            return Err(Error::Geometry(format!(
                "cell lengths must be positive, got [{}, {}, {}]", a, b, c
            )));
        }
        UnitCell::from_matrix(Matrix3::new([
            [a, 0.0, 0.0],
            [0.0, b, 0.0],
            [0.0, 0.0, c],
        ]))
    }

    /// Create a cubic unit cell with the given side length
    pub fn cubic(length: f64) -> Result<UnitCell, Error> {
        UnitCell::orthorhombic(length, length, length)
    }

    /// Create a triclinic unit cell from side lengths and angles (in
    /// degrees)
    pub fn triclinic(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Result<UnitCell, Error> {
        if !(a > 0.0 && b > 0.0 && c > 0.0) {
            return Err(Error::Geometry(format!(
                "cell lengths must be positive, got [{}, {}, {}]", a, b, c
            )));
        }
        let cos_alpha = alpha.to_radians().cos();
        let cos_beta = beta.to_radians().cos();
        let (sin_gamma, cos_gamma) = gamma.to_radians().sin_cos();

        let b_x = b * cos_gamma;
        let b_y = b * sin_gamma;

        let c_x = c * cos_beta;
        let c_y = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
        let c_z2 = c * c - c_y * c_y - c_x * c_x;
        if !(c_z2 > 0.0) {
            return Err(Error::Geometry(format!(
                "invalid triclinic cell angles: [{}, {}, {}]", alpha, beta, gamma
            )));
        }

        return UnitCell::from_matrix(Matrix3::new([
            [a, 0.0, 0.0],
            [b_x, b_y, 0.0],
            [c_x, c_y, f64::sqrt(c_z2)],
        ]));
    }

    /// Get the cell shape
    pub fn shape(&self) -> CellShape {
        self.shape
    }

    /// Check whether this cell has no periodic boundary conditions
    pub fn is_infinite(&self) -> bool {
        self.shape == CellShape::Infinite
    }

    /// Get the cell matrix, one cell vector per row
    pub fn matrix(&self) -> Matrix3 {
        self.matrix
    }

    /// Express a cartesian vector in fractional (cell vector basis)
    /// coordinates
    pub fn fractional(&self, vector: Vector3D) -> Vector3D {
        // multiplying by the inverse transpose on the left is the same as
        // multiplying the row vector by the matrix inverse on the right
        self.inverse * vector
    }

    /// Express a fractional vector in cartesian coordinates
    pub fn cartesian(&self, fractional: Vector3D) -> Vector3D {
        self.transpose * fractional
    }

    /// Distances between the pairs of opposite faces of the cell. This is
    /// the relevant length when deciding how many periodic images can hold
    /// an atom within a given cutoff.
    pub fn distances_between_faces(&self) -> Vector3D {
        if self.is_infinite() {
            return Vector3D::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        }

        let a = Vector3D::from(self.matrix[0]);
        let b = Vector3D::from(self.matrix[1]);
        let c = Vector3D::from(self.matrix[2]);

        // normal vector of each pair of faces
        let na = (b ^ c).normalized();
        let nb = (c ^ a).normalized();
        let nc = (a ^ b).normalized();

        Vector3D::new(f64::abs(na * a), f64::abs(nb * b), f64::abs(nc * c))
    }
}
