pub mod readback;
pub mod syntax;
