pub mod client;
pub mod relay;
pub mod settings;
pub mod transport;

pub use client::{SolveError, SolvingClient};
pub use relay::CaptchaRelay;
pub use settings::{Settings, SettingsStore};
pub use transport::{HttpTransport, SolverTransport};
