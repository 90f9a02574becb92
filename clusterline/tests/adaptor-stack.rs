use approx::assert_ulps_eq;

use clusterline::managers::{HalfListAdaptor, MaxOrderAdaptor, NeighborListAdaptor, RootManager};
use clusterline::{AdaptorParameters, ClusterSource, ManagerStack, Structure, UnitCell, Vector3D};

/// three atoms at awkward positions in a small periodic box
fn periodic_structure() -> Structure {
    let mut structure = Structure::new(UnitCell::cubic(4.0).unwrap());
    structure.add_atom(14, Vector3D::new(0.3, 0.1, 3.9));
    structure.add_atom(8, Vector3D::new(2.1, 1.7, 0.4));
    structure.add_atom(8, Vector3D::new(3.8, 3.2, 2.0));
    return structure;
}

/// all pairs `(tag_i, tag_j, shift)` with distance below the cutoff, from
/// a direct search over every atom pair and every periodic image in range
fn brute_force_pairs(structure: &Structure, cutoff: f64) -> Vec<(usize, usize, [i32; 3], f64)> {
    let matrix = structure.cell().matrix();
    let shift_vector = |shift: [i32; 3]| {
        Vector3D::from(matrix[0]) * f64::from(shift[0])
            + Vector3D::from(matrix[1]) * f64::from(shift[1])
            + Vector3D::from(matrix[2]) * f64::from(shift[2])
    };

    let mut pairs = Vec::new();
    for i in 0..structure.size() {
        for j in 0..structure.size() {
            for x in -2..=2_i32 {
                for y in -2..=2_i32 {
                    for z in -2..=2_i32 {
                        let shift = [x, y, z];
                        if i == j && shift == [0, 0, 0] {
                            continue;
                        }
                        let vector = structure.positions()[j] - structure.positions()[i]
                            + shift_vector(shift);
                        let distance = vector.norm();
                        if distance <= cutoff {
                            pairs.push((i, j, shift, distance));
                        }
                    }
                }
            }
        }
    }
    pairs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    return pairs;
}

/// pair key usable across stacks: tags instead of (ghost) atom indices
fn pair_keys(source: &dyn ClusterSource) -> Vec<(usize, usize, [i32; 3])> {
    let mut keys = Vec::new();
    for pair in source.pairs().unwrap() {
        let first = source.tag(pair.first).unwrap();
        let second = source.tag(pair.second).unwrap();
        keys.push((first, second, pair.cell_shift_indices));
    }
    keys.sort_unstable();
    return keys;
}

#[test]
fn neighbor_search_is_sound_and_complete() {
    let cutoff = 3.0;
    let stack = ManagerStack::new(periodic_structure(), &[
        AdaptorParameters::NeighborList { cutoff: cutoff },
        AdaptorParameters::StrictCutoff { cutoff: cutoff },
    ]).unwrap();

    let mut expected = Vec::new();
    for (i, j, shift, _) in brute_force_pairs(&periodic_structure(), cutoff) {
        expected.push((i, j, shift));
    }
    expected.sort_unstable();

    // soundness: no emitted pair is above the cutoff
    for pair in stack.pairs().unwrap() {
        assert!(pair.distance <= cutoff);
        assert_ulps_eq!(pair.vector.norm(), pair.distance, epsilon = 1e-12);
    }

    // completeness: every image pair below the cutoff is emitted, once
    assert_eq!(pair_keys(stack.source()), expected);
}

#[test]
fn updates_are_idempotent() {
    let mut stack = ManagerStack::new(periodic_structure(), &[
        AdaptorParameters::NeighborList { cutoff: 2.5 },
        AdaptorParameters::StrictCutoff { cutoff: 2.2 },
        AdaptorParameters::MaxOrder,
    ]).unwrap();

    let snapshot = |stack: &ManagerStack| {
        let pairs: Vec<_> = stack.pairs().unwrap().iter().map(|pair| {
            (pair.first, pair.second, pair.cell_shift_indices, pair.distance.to_bits())
        }).collect();

        let mut triplets = Vec::new();
        let mut offsets = Vec::new();
        for index in 0..stack.cluster_count(3).unwrap() {
            triplets.push(stack.source().cluster_atoms(3, index).unwrap().to_vec());
        }
        for index in 0..stack.cluster_count(2).unwrap() {
            offsets.push(stack.extension_range(2, index).unwrap());
        }
        (pairs, triplets, offsets)
    };

    let first = snapshot(&stack);
    stack.update(None).unwrap();
    let second = snapshot(&stack);
    assert_eq!(first, second);

    // re-running the iterator without an update yields the same sequence
    let once: Vec<_> = stack.clusters(3).unwrap().map(|c| c.atoms().to_vec()).collect();
    let twice: Vec<_> = stack.clusters(3).unwrap().map(|c| c.atoms().to_vec()).collect();
    assert_eq!(once, twice);
}

#[test]
fn half_list_and_complement_reconstruct_the_full_list() {
    let mut full = NeighborListAdaptor::new(RootManager::new(periodic_structure()), 3.0).unwrap();
    full.update(None).unwrap();
    let full_keys = pair_keys(&full);

    let mut half = HalfListAdaptor::new(full).unwrap();
    half.update(None).unwrap();
    let half_keys = pair_keys(&half);

    // the complement is everything the half list dropped
    let mut complement: Vec<_> = full_keys.iter()
        .copied()
        .filter(|key| !half_keys.contains(key))
        .collect();
    assert_eq!(half_keys.len() + complement.len(), full_keys.len());

    // mirroring the half list gives back exactly the complement
    let mut mirrored: Vec<_> = half_keys.iter().map(|&(i, j, shift)| {
        (j, i, [-shift[0], -shift[1], -shift[2]])
    }).collect();
    mirrored.sort_unstable();
    complement.sort_unstable();
    assert_eq!(mirrored, complement);
}

#[test]
fn ghost_count_covers_the_cutoff_sphere_exactly() {
    let mut structure = Structure::new(UnitCell::cubic(3.0).unwrap());
    structure.add_atom(11, Vector3D::new(0.0, 0.0, 0.0));

    // lattice < cutoff < face diagonal: the six face images are within
    // range, the twelve edge images (at 3 * sqrt(2)) are not
    let mut list = NeighborListAdaptor::new(RootManager::new(structure), 4.0).unwrap();
    list.update(None).unwrap();

    assert_eq!(list.ghosts().len(), 6);
    for ghost in list.ghosts() {
        assert_eq!(ghost.tag, 0);
        let shift = ghost.cell_shift;
        let one_step = shift[0].abs() + shift[1].abs() + shift[2].abs();
        assert_eq!(one_step, 1);
        assert_ulps_eq!(ghost.position.norm(), 3.0, epsilon = 1e-10);
    }
}

#[test]
fn two_atom_cubic_cell_face_neighbors() {
    let mut structure = Structure::new(UnitCell::cubic(3.0).unwrap());
    structure.add_atom(55, Vector3D::new(0.0, 0.0, 0.0));
    structure.add_atom(17, Vector3D::new(1.5, 1.5, 1.5));

    let mut list = NeighborListAdaptor::new(RootManager::new(structure), 3.2).unwrap();
    list.update(None).unwrap();

    for atom in 0..2 {
        let range = list.extension_range(1, atom).unwrap();
        let pairs = &list.pairs().unwrap()[range];

        // every atom sees its six face images at the lattice constant, and
        // the eight body-center images of the other atom
        let self_images: Vec<_> = pairs.iter()
            .filter(|pair| list.tag(pair.second).unwrap() == atom)
            .collect();
        assert_eq!(self_images.len(), 6);
        for pair in self_images {
            assert_ulps_eq!(pair.distance, 3.0, epsilon = 1e-10);
        }

        let others: Vec<_> = pairs.iter()
            .filter(|pair| list.tag(pair.second).unwrap() != atom)
            .collect();
        assert_eq!(others.len(), 8);
        for pair in others {
            assert_ulps_eq!(pair.distance, 1.5 * f64::sqrt(3.0), epsilon = 1e-10);
        }
    }
}

#[test]
fn triplet_closure() {
    let stack = ManagerStack::new(periodic_structure(), &[
        AdaptorParameters::NeighborList { cutoff: 2.5 },
        AdaptorParameters::MaxOrder,
    ]).unwrap();

    let mut pairs = Vec::new();
    for cluster in stack.clusters(2).unwrap() {
        pairs.push(cluster.atoms().to_vec());
    }

    // the prefix pair of every triplet is a pair of the upstream manager
    for cluster in stack.clusters(3).unwrap() {
        let prefix = cluster.atoms()[..2].to_vec();
        assert!(
            pairs.contains(&prefix),
            "triplet {:?} extends the missing pair {:?}", cluster.atoms(), prefix
        );
    }
}

#[test]
fn triplets_of_ghost_neighbors_stay_within_known_atoms() {
    // a linear periodic chain: each atom sees both periodic sides
    let mut structure = Structure::new(UnitCell::orthorhombic(2.0, 20.0, 20.0).unwrap());
    structure.add_atom(6, Vector3D::new(0.0, 10.0, 10.0));

    let stack = ManagerStack::new(structure, &[
        AdaptorParameters::NeighborList { cutoff: 2.5 },
        AdaptorParameters::MaxOrder,
    ]).unwrap();

    let n_atoms = stack.size_with_ghosts();
    for cluster in stack.clusters(3).unwrap() {
        for &atom in cluster.atoms() {
            assert!(atom < n_atoms);
            assert_eq!(stack.source().tag(atom).unwrap(), 0);
        }
    }
}

#[test]
fn species_and_layers_through_the_stack() {
    let stack = ManagerStack::new(periodic_structure(), &[
        AdaptorParameters::NeighborList { cutoff: 2.5 },
        AdaptorParameters::HalfList,
        AdaptorParameters::CenterContribution,
        AdaptorParameters::MaxOrder,
    ]).unwrap();

    // atoms re-indexed once by the neighbor list; pairs re-indexed by the
    // two filters after their introduction; triplets untouched
    assert_eq!(stack.layer(1).unwrap(), 1);
    assert_eq!(stack.layer(2).unwrap(), 2);
    assert_eq!(stack.layer(3).unwrap(), 0);

    let reference = periodic_structure();
    for cluster in stack.clusters(2).unwrap() {
        let species = cluster.species().unwrap();
        let tags = cluster.tags().unwrap();
        for (&tag, &code) in tags.iter().zip(&species) {
            assert_eq!(reference.species()[tag], code);
        }
    }
}
