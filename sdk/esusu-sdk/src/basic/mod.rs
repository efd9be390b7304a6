pub mod actions;
pub mod adapter;
pub mod client;
pub mod preloader;
pub mod queries;
