//! pharmyx-web — HTTP front end for the industry-affiliation paper search.
//! Exposes a single route, `POST /api/fetch-papers`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod router;
pub mod state;
