//! Mesh topology building blocks: element families, adjacency arrays,
//! ownership records and periodic matches.

pub mod adj;
pub mod family;
pub mod ownership;
pub mod periodic;

pub use adj::Adj;
pub use family::{Family, element_degree};
pub use ownership::{Remote, Remotes};
pub use periodic::Matches;
