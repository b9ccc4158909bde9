pub mod key_store;
pub mod token_service;
