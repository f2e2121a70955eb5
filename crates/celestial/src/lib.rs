//! Celestial-sphere data provider: star/constellation catalogs and their
//! conversion into background-render records.

pub mod catalog;
pub mod sphere;

pub use catalog::*;
pub use sphere::*;
