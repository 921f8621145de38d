//! Wire types shared by the gallery API handlers and their clients.

pub mod api;
pub mod ids;
pub mod models;
