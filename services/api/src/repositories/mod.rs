//! Repositories for document store operations

pub mod user;

pub use user::UserRepository;
