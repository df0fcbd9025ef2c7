pub mod activity;
pub mod auth;
pub mod eev;
pub mod model;
pub mod source;
pub mod tag;
pub mod tagset;
pub mod ui;
