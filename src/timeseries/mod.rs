pub mod plateau;
pub mod reconstruct;

pub use plateau::{find_trim_length, trim_plateau};
pub use reconstruct::TimeSeriesReconstructor;
