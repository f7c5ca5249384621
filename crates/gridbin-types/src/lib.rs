pub mod constants;
pub mod grid;
pub mod outline;

pub use constants::*;
pub use grid::*;
pub use outline::*;
