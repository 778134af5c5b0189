//! Search, pagination and detail-page traversal

mod controller;
mod cursor;

pub use controller::{DetailLink, NavState, NavStep, NavigationController, StopReason};
pub use cursor::PageCursor;
