use clusterline::{AdaptorParameters, ManagerStack, Structure, UnitCell, Vector3D};

/// Build a manager stack over a small periodic crystal and print how many
/// clusters of each order it holds.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut structure = Structure::new(UnitCell::cubic(3.61).unwrap());
    // conventional fcc copper cell
    structure.add_atom(29, Vector3D::new(0.0, 0.0, 0.0));
    structure.add_atom(29, Vector3D::new(1.805, 1.805, 0.0));
    structure.add_atom(29, Vector3D::new(1.805, 0.0, 1.805));
    structure.add_atom(29, Vector3D::new(0.0, 1.805, 1.805));

    let stack = ManagerStack::new(structure, &[
        AdaptorParameters::NeighborList { cutoff: 3.0 },
        AdaptorParameters::StrictCutoff { cutoff: 2.6 },
        AdaptorParameters::MaxOrder,
    ])?;

    println!("atoms: {} real, {} with ghosts", stack.size(), stack.size_with_ghosts());
    for order in 1..=stack.max_order() {
        println!(
            "order {}: {} clusters at layer {}",
            order,
            stack.cluster_count(order)?,
            stack.layer(order)?,
        );
    }

    for cluster in stack.clusters(2)?.take(4) {
        println!(
            "pair {:?} at distance {:.3}",
            cluster.tags()?,
            cluster.distance()?,
        );
    }

    Ok(())
}
