pub mod event_window;
pub mod routes;
pub mod server;

pub use event_window::EventWindow;
pub use routes::RouteCatalog;
pub use server::ServerConfig;
