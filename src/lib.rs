pub mod bot;
pub mod config;
pub mod cookies;
pub mod datalayer;
pub mod errors;
pub mod headless;
pub mod markup;
pub mod page;
pub mod widget;

pub use config::ConsentConfig;
pub use errors::ConsentError;
pub use widget::{ConsentWidget, ModalState, WidgetServices};
