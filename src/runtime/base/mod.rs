pub mod debug;
pub mod memory;
pub mod reducer;

pub use debug::*;
pub use memory::*;
