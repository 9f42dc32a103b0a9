// Interface adapters: HTTP surface, wire protocol and storage adapters.

pub mod clients;
pub mod handlers;
pub mod protocol;
pub mod routes;
pub mod state;
