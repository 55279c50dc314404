pub mod actor;
pub mod agenda;
pub mod articles;
pub mod config;
pub mod error;
pub mod logger;
pub mod model;
pub mod personal;
pub mod postits;
pub mod pubs;
pub mod routes;
pub mod state;
pub mod stats;
pub mod ws;
