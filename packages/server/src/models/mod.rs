pub mod activity;
pub mod auth;
pub mod model;
pub mod shared;
pub mod source;
pub mod tag;
pub mod tagset;
pub mod ui;
