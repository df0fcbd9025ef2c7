pub mod activities;
pub mod bot;
pub mod jobs;
pub mod mail;
pub mod sources;
pub mod tags;
pub mod tagsets;
pub mod users;
