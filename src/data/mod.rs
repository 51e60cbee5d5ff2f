//! Static lookup tables shared by the transpiler phases.

pub mod colors;
pub mod constants;
pub mod symbols;
