//! Mesh migration driver.
//!
//! [`migrate_mesh`] redistributes a mesh given, for each new element, the
//! old owner it should be copied from. Dimensions are processed from the
//! elements down to the vertices; each step yields the owner-to-copies
//! pattern of the dimension below. The caller's mesh is replaced only once
//! every step has succeeded.

use crate::algs::communicator::Communicator;
use crate::algs::dist::Dist;
use crate::algs::exchange::{allreduce_max, allreduce_sum};
use crate::algs::periodic::push_matches;
use crate::algs::push::{push_down, push_ents};
use crate::config::{MigrateOptions, PartitionMode};
use crate::mesh::{Mesh, VERT};
use crate::mesh_error::MeshError;

/// Volume of a migration, summed over all ranks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MigrationStats {
    /// New elements pulled from their old owners.
    pub pulled: u64,
    /// Of those, elements whose old owner lives on another rank.
    pub remote: u64,
}

/// Count the elements `new_elems2old_owners` pulls, and how many cross ranks.
/// Collective.
pub fn migration_stats<C: Communicator>(
    new_elems2old_owners: &Dist<C>,
) -> Result<MigrationStats, MeshError> {
    let rank = new_elems2old_owners.comm().rank();
    let ranks = new_elems2old_owners.items2ranks();
    let remote = ranks.iter().filter(|&&r| r != rank).count() as u64;
    let comm = new_elems2old_owners.comm();
    Ok(MigrationStats {
        pulled: allreduce_sum(comm, ranks.len() as u64)?,
        remote: allreduce_sum(comm, remote)?,
    })
}

/// Error unless every dimension carries the `"global"` tag.
pub fn check_globals<C: Communicator>(mesh: &Mesh<C>) -> Result<(), MeshError> {
    for dim in 0..=mesh.dim() {
        mesh.globals(dim)?;
    }
    Ok(())
}

/// Migrate `mesh` so that this rank holds the elements named by
/// `new_elems2old_owners`. Collective.
pub fn migrate_mesh<C: Communicator>(
    mesh: &mut Mesh<C>,
    new_elems2old_owners: &Dist<C>,
    mode: PartitionMode,
    verbose: bool,
) -> Result<(), MeshError> {
    let opts = MigrateOptions { mode, verbose };
    migrate_mesh_with(mesh, new_elems2old_owners, &opts)
}

/// [`migrate_mesh`] taking its settings from [`MigrateOptions`].
pub fn migrate_mesh_with<C: Communicator>(
    mesh: &mut Mesh<C>,
    new_elems2old_owners: &Dist<C>,
    opts: &MigrateOptions,
) -> Result<(), MeshError> {
    check_globals(mesh)?;
    let comm = mesh.comm().clone();
    let dim = mesh.dim();
    let mut new_mesh = mesh.copy_meta();

    if opts.verbose {
        let stats = migration_stats(new_elems2old_owners)?;
        if comm.rank() == 0 {
            log::info!(
                "migration pulling ({} remote) / ({} total) elements",
                stats.remote,
                stats.pulled
            );
        }
    }

    let periodic = allreduce_max(&comm, u64::from(mesh.is_periodic()))? > 0;
    let mut old_owners2new_ents = new_elems2old_owners.invert();
    for d in (1..=dim).rev() {
        let (new_down, old_low_owners2new_lows) = push_down(mesh, d, d - 1, &old_owners2new_ents)?;
        new_mesh.set_ents(d, new_down)?;
        let new_ents2old_owners = old_owners2new_ents.invert();
        push_ents(
            mesh,
            &mut new_mesh,
            d,
            &new_ents2old_owners,
            &old_owners2new_ents,
            opts.mode,
        )?;
        if periodic && d < dim {
            push_matches(mesh, &mut new_mesh, d, &new_ents2old_owners, &old_owners2new_ents)?;
        }
        log::debug!(
            "rank {}: dimension {d} now has {} entities ({} owned)",
            comm.rank(),
            new_mesh.nents(d),
            new_mesh.owned_count(d)
        );
        old_owners2new_ents = old_low_owners2new_lows;
    }

    let new_verts2old_owners = old_owners2new_ents.invert();
    new_mesh.set_verts(new_verts2old_owners.nroots());
    push_ents(
        mesh,
        &mut new_mesh,
        VERT,
        &new_verts2old_owners,
        &old_owners2new_ents,
        opts.mode,
    )?;
    if periodic {
        push_matches(mesh, &mut new_mesh, VERT, &new_verts2old_owners, &old_owners2new_ents)?;
    }
    log::debug!(
        "rank {}: {} vertices after migration",
        comm.rank(),
        new_mesh.nverts()
    );

    check_globals(&new_mesh)?;
    *mesh = new_mesh;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::ThreadComm;
    use crate::algs::meshgen::build_from_elems2verts;
    use crate::mesh::GLOBAL_TAG;
    use crate::topology::ownership::Remotes;

    #[test]
    fn missing_globals_leave_mesh_untouched() {
        let comm = ThreadComm::solo();
        let mut mesh = build_from_elems2verts(comm.clone(), 2, &[0, 1, 2], 3).unwrap();
        mesh.remove_tag(1, GLOBAL_TAG);
        let dist = Dist::identity(comm, 1).unwrap();
        let err = migrate_mesh(&mut mesh, &dist, PartitionMode::ElemBased, false).unwrap_err();
        assert!(matches!(err, MeshError::MissingTag { dim: 1, .. }));
        assert_eq!(mesh.nents(1), 3);
    }

    #[test]
    fn stats_count_remote_pulls() {
        let got = ThreadComm::run(2, |comm| {
            // every element is pulled from rank 0
            let n = if comm.rank() == 0 { 3 } else { 2 };
            let owners = Remotes::new(vec![0; n], (0..n).collect()).unwrap();
            let dist = Dist::from_remotes(comm, &owners, 3).unwrap();
            migration_stats(&dist).unwrap()
        });
        for stats in got {
            assert_eq!(stats, MigrationStats { pulled: 5, remote: 2 });
        }
    }
}
