pub mod controller;
pub mod refresh;

pub use controller::SessionController;
pub use refresh::RefreshCoordinator;
