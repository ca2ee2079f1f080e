mod db;
mod health;
mod routes;

pub use routes::create_router;
