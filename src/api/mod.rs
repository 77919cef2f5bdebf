pub mod handlers;
pub mod models;
pub mod response;
pub mod routes;
