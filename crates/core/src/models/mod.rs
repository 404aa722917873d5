pub mod catalog;
pub mod evolution;
pub mod price;
pub mod rate;
pub mod settings;
pub mod summary;
pub mod transaction;
