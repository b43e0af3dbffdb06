//! Service commands

pub mod serve;
