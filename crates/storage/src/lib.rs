pub mod db;

pub use db::{
    create_db, delete_session, get_session, list_sessions, save_session, DbPool, SessionSummary,
    StorageError,
};
