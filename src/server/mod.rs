mod categories;
pub mod dto;
mod gallery;
mod images;
pub mod response;
mod router;
mod uploads;
mod users;

pub use router::{AppState, REQUEST_TIMEOUT_HEADER, create_router};
