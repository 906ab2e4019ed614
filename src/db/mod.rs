pub mod catalog;
pub mod users;

pub use catalog::{CatalogUpdate, EventCatalog};
pub use users::UserStore;
