pub mod event_database;

pub use event_database::{
    create_shared_event_store, EventDatabase, EventStore, SharedEventStore,
};
