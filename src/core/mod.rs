//! Core conversion modules

pub mod latex2md;
