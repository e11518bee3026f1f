pub mod app;
pub mod crypto;
pub mod events;
pub mod models;
pub mod queue;
pub mod selection;
pub mod storage;
pub mod store;
pub mod transfer;
pub mod tree_view;
pub mod ui;
