pub mod models;
pub mod normalize;

pub use models::{Fixture, FixtureStatus};
pub use normalize::{normalize, NormalizeOptions};
