//! Communication patterns and the migration algorithms built on them.

pub mod communicator;
pub mod dist;
pub mod exchange;
pub mod meshgen;
pub mod migrate;
pub mod owners;
pub mod parallel;
pub mod periodic;
pub mod push;
pub mod reconnect;
pub mod wire;

pub use communicator::{Communicator, ThreadComm};
pub use dist::{Dist, DistBuilder};
pub use migrate::{MigrationStats, migrate_mesh, migrate_mesh_with, migration_stats};
