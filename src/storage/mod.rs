pub mod db;
mod favs;
mod logs;
pub mod models;
mod soundboards;
mod sounds;
mod tables;
mod users;

pub use db::{Database, DatabaseError};
pub use tables::*;
