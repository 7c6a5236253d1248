#![forbid(unsafe_code)]

mod cache;
mod jobs;
mod missing;
mod pushes;
mod repositories;

pub use cache::*;
pub use jobs::*;
pub use missing::*;
pub use pushes::*;
pub use repositories::*;
