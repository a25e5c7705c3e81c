//! Editing-session side of the move-tree model: configuration, JSON
//! persistence of game records, the single-writer game session and the
//! synchronizer that turns dirty annotations into saved records.

pub mod config;
pub mod persistence;
pub mod session;
pub mod sync;
