pub mod map;
pub mod routes;
pub mod server;

pub use map::{MapConfig, ProtomapsOptions, TileArchive};
pub use server::{ApiServer, AppState};
