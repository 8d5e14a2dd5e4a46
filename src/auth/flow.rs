//! App-lock state machine
//!
//! Loading → {SetupPin → ConfirmPin → AskBiometrics} | EnterPin →
//! Authenticated. Biometric unlock is an alternate path gated by a
//! capability query, and is only offered once a PIN exists.

use crate::auth::vault::{self, AuthError, AuthResult, PinVault};

/// Platform capability query for biometric hardware
pub trait BiometricCapability {
    fn is_available(&self) -> bool;
}

/// Capability stub for platforms without biometric hardware
#[derive(Debug, Default)]
pub struct NoBiometrics;

impl BiometricCapability for NoBiometrics {
    fn is_available(&self) -> bool {
        false
    }
}

/// The states of the app-lock flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Initial state before the vault has been inspected
    Loading,
    /// No PIN exists yet; waiting for the first entry
    SetupPin,
    /// First entry captured; waiting for the confirmation entry
    ConfirmPin,
    /// PIN stored; offering to enable biometric unlock
    AskBiometrics,
    /// A PIN exists; waiting for it
    EnterPin,
    Authenticated,
}

/// App-lock flow over a [`PinVault`] and a biometric capability
pub struct AuthFlow<B = NoBiometrics> {
    vault: PinVault,
    biometrics: B,
    state: AuthState,
    /// First entry held between SetupPin and ConfirmPin
    pending: Option<String>,
    /// Whether the user opted into biometric unlock
    biometrics_enabled: bool,
}

impl<B: BiometricCapability> AuthFlow<B> {
    pub fn new(vault: PinVault, biometrics: B) -> Self {
        Self {
            vault,
            biometrics,
            state: AuthState::Loading,
            pending: None,
            biometrics_enabled: false,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Leave Loading: setup when no PIN exists, entry otherwise
    pub fn start(&mut self) -> AuthResult<AuthState> {
        if self.state != AuthState::Loading {
            return Err(AuthError::InvalidTransition("start outside Loading"));
        }
        self.state = if self.vault.has_pin() {
            AuthState::EnterPin
        } else {
            AuthState::SetupPin
        };
        Ok(self.state)
    }

    /// Feed a PIN entry into the current state
    ///
    /// - SetupPin: rejects a badly formatted entry (state unchanged),
    ///   otherwise captures it and moves to ConfirmPin
    /// - ConfirmPin: stores the PIN on match (then AskBiometrics when the
    ///   platform has biometrics, Authenticated otherwise); returns to
    ///   SetupPin on mismatch or on a storage failure
    /// - EnterPin: authenticates on a correct PIN, stays otherwise
    pub fn submit_pin(&mut self, pin: &str) -> AuthResult<AuthState> {
        match self.state {
            AuthState::SetupPin => {
                vault::validate_pin(pin)?;
                self.pending = Some(pin.to_string());
                self.state = AuthState::ConfirmPin;
            }
            AuthState::ConfirmPin => {
                let first = self.pending.take().ok_or(AuthError::InvalidTransition(
                    "ConfirmPin without a pending entry",
                ))?;
                if first == pin {
                    if let Err(e) = self.vault.set_pin(pin) {
                        // Pending is already consumed; restart setup
                        self.state = AuthState::SetupPin;
                        return Err(e);
                    }
                    self.state = if self.biometrics.is_available() {
                        AuthState::AskBiometrics
                    } else {
                        AuthState::Authenticated
                    };
                } else {
                    tracing::debug!("PIN confirmation mismatch");
                    self.state = AuthState::SetupPin;
                }
            }
            AuthState::EnterPin => {
                if self.vault.verify_pin(pin)? {
                    self.state = AuthState::Authenticated;
                }
            }
            _ => return Err(AuthError::InvalidTransition("submit_pin in this state")),
        }
        Ok(self.state)
    }

    /// Answer the biometric offer
    pub fn choose_biometrics(&mut self, enable: bool) -> AuthResult<AuthState> {
        if self.state != AuthState::AskBiometrics {
            return Err(AuthError::InvalidTransition(
                "choose_biometrics outside AskBiometrics",
            ));
        }
        self.biometrics_enabled = enable && self.biometrics.is_available();
        self.state = AuthState::Authenticated;
        Ok(self.state)
    }

    /// Alternate unlock path; only valid while waiting for a PIN and when
    /// the platform reports biometric capability
    pub fn biometric_unlock(&mut self) -> AuthResult<AuthState> {
        if self.state != AuthState::EnterPin {
            return Err(AuthError::InvalidTransition(
                "biometric_unlock outside EnterPin",
            ));
        }
        if !self.biometrics.is_available() {
            return Err(AuthError::InvalidTransition("no biometric capability"));
        }
        self.state = AuthState::Authenticated;
        Ok(self.state)
    }

    pub fn biometrics_enabled(&self) -> bool {
        self.biometrics_enabled
    }
}
