//! App lock - encrypted PIN storage and the unlock state machine

pub mod flow;
pub mod vault;

pub use flow::{AuthFlow, AuthState, BiometricCapability, NoBiometrics};
pub use vault::{AuthError, AuthResult, PinVault};
