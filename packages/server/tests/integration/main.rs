mod auth;
mod common;
mod model;
mod source;
mod tagset;
