use crate::{Error, Vector3D};

mod cell;
pub use self::cell::{CellShape, UnitCell};

/// Raw per-atom data of a single atomic structure: positions, species
/// codes and the periodic cell.
///
/// This is the leaf of every manager stack. It knows nothing about
/// neighbors or clusters; it is only mutated by explicit structure updates
/// through [`crate::ManagerStack::update`].
///
/// Species are identified by arbitrary integer codes provided by the
/// caller (usually atomic numbers). There is no global species catalog:
/// whatever metadata a consumer needs about a species travels alongside
/// the structure, not through process-wide state.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    cell: UnitCell,
    species: Vec<i32>,
    positions: Vec<Vector3D>,
}

impl Structure {
    /// Create an empty structure with the given unit cell
    pub fn new(cell: UnitCell) -> Structure {
        Structure {
            cell: cell,
            species: Vec::new(),
            positions: Vec::new(),
        }
    }

    /// Add an atom with the given species code and cartesian position.
    /// The atom tag is the insertion rank.
    pub fn add_atom(&mut self, species: i32, position: Vector3D) {
        self.species.push(species);
        self.positions.push(position);
    }

    /// Number of atoms in the structure
    pub fn size(&self) -> usize {
        self.species.len()
    }

    /// Unit cell of the structure
    pub fn cell(&self) -> UnitCell {
        self.cell
    }

    /// Species codes for all atoms, in tag order
    pub fn species(&self) -> &[i32] {
        &self.species
    }

    /// Cartesian positions for all atoms, in tag order
    pub fn positions(&self) -> &[Vector3D] {
        &self.positions
    }

    /// Position of the atom with the given tag
    pub fn position(&self, tag: usize) -> Result<Vector3D, Error> {
        self.positions.get(tag).copied().ok_or_else(|| Error::Index(format!(
            "atom tag {} is out of bounds for a structure with {} atoms",
            tag, self.size()
        )))
    }

    /// Species code of the atom with the given tag
    pub fn species_of(&self, tag: usize) -> Result<i32, Error> {
        self.species.get(tag).copied().ok_or_else(|| Error::Index(format!(
            "atom tag {} is out of bounds for a structure with {} atoms",
            tag, self.size()
        )))
    }

    /// Move the atom with the given tag to a new position
    pub fn set_position(&mut self, tag: usize, position: Vector3D) -> Result<(), Error> {
        let size = self.size();
        match self.positions.get_mut(tag) {
            Some(slot) => {
                *slot = position;
                Ok(())
            }
            None => Err(Error::Index(format!(
                "atom tag {} is out of bounds for a structure with {} atoms",
                tag, size
            ))),
        }
    }
}
