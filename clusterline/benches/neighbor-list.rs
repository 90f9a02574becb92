use criterion::{black_box, criterion_group, criterion_main, Criterion};

use clusterline::{AdaptorParameters, ManagerStack, Structure, UnitCell, Vector3D};

/// a rock salt supercell with `repeat^3` unit cells (8 atoms each)
fn rock_salt(repeat: usize) -> Structure {
    let lattice = 5.64;
    let length = lattice * repeat as f64;
    let mut structure = Structure::new(UnitCell::cubic(length).unwrap());

    let basis = [
        (11, Vector3D::new(0.0, 0.0, 0.0)),
        (11, Vector3D::new(0.5, 0.5, 0.0)),
        (11, Vector3D::new(0.5, 0.0, 0.5)),
        (11, Vector3D::new(0.0, 0.5, 0.5)),
        (17, Vector3D::new(0.5, 0.0, 0.0)),
        (17, Vector3D::new(0.0, 0.5, 0.0)),
        (17, Vector3D::new(0.0, 0.0, 0.5)),
        (17, Vector3D::new(0.5, 0.5, 0.5)),
    ];

    for i in 0..repeat {
        for j in 0..repeat {
            for k in 0..repeat {
                let origin = Vector3D::new(i as f64, j as f64, k as f64);
                for &(species, fractional) in &basis {
                    structure.add_atom(species, (origin + fractional) * lattice);
                }
            }
        }
    }

    return structure;
}

fn neighbor_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("neighbor list rebuild");
    group.noise_threshold(0.05);

    for &repeat in black_box(&[2, 3, 4]) {
        let structure = rock_salt(repeat);
        let n_atoms = structure.size();

        let mut stack = ManagerStack::new(structure, &[
            AdaptorParameters::NeighborList { cutoff: 6.0 },
            AdaptorParameters::StrictCutoff { cutoff: 5.5 },
        ]).unwrap();

        group.bench_function(format!("{} atoms", n_atoms), |b| b.iter(|| {
            stack.update(None).unwrap();
            black_box(stack.cluster_count(2).unwrap())
        }));
    }

    group.finish();
}

fn triplets(c: &mut Criterion) {
    let mut group = c.benchmark_group("triplet rebuild");
    group.noise_threshold(0.05);

    let structure = rock_salt(2);
    let n_atoms = structure.size();

    let mut stack = ManagerStack::new(structure, &[
        AdaptorParameters::NeighborList { cutoff: 4.0 },
        AdaptorParameters::HalfList,
        AdaptorParameters::MaxOrder,
    ]).unwrap();

    group.bench_function(format!("{} atoms", n_atoms), |b| b.iter(|| {
        stack.update(None).unwrap();
        black_box(stack.cluster_count(3).unwrap())
    }));

    group.finish();
}

criterion_group!(benches, neighbor_list, triplets);
criterion_main!(benches);
