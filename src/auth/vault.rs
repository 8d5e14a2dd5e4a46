//! PIN vault - encrypted-at-rest PIN storage
//!
//! The PIN is encrypted with ChaCha20-Poly1305 under a symmetric key kept
//! in a key file beside the PIN file; the key never leaves this module.
//! Verification decrypts the stored ciphertext and compares plaintext.

use std::path::{Path, PathBuf};

use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use thiserror::Error;

const KEY_FILE: &str = "vault.key";
const PIN_FILE: &str = "pin.enc";
const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Errors that can occur in the PIN vault
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Key or PIN file has the wrong size or fails authentication
    #[error("Vault corrupt: {0}")]
    Corrupt(String),

    /// Operation requires a stored PIN but none exists
    #[error("No PIN has been set")]
    PinNotSet,

    /// PIN fails the format rule (4+ ASCII digits)
    #[error("Invalid PIN: must be at least 4 digits")]
    InvalidPin,

    /// State machine received an event its current state does not accept
    #[error("Invalid transition: {0}")]
    InvalidTransition(&'static str),
}

/// Result type alias for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Encrypted PIN storage in a directory
pub struct PinVault {
    key_path: PathBuf,
    pin_path: PathBuf,
}

impl PinVault {
    /// Open (or create) a vault directory
    pub fn open(dir: &Path) -> AuthResult<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            key_path: dir.join(KEY_FILE),
            pin_path: dir.join(PIN_FILE),
        })
    }

    /// Whether a PIN has been stored
    pub fn has_pin(&self) -> bool {
        self.pin_path.exists()
    }

    /// Encrypt and store a PIN, replacing any previous one
    pub fn set_pin(&self, pin: &str) -> AuthResult<()> {
        validate_pin(pin)?;

        let cipher = ChaCha20Poly1305::new(&self.load_or_create_key()?);
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, pin.as_bytes())
            .map_err(|_| AuthError::Corrupt("encryption failed".to_string()))?;

        let mut blob = nonce.as_slice().to_vec();
        blob.extend_from_slice(&ciphertext);
        write_private(&self.pin_path, &blob)?;

        tracing::debug!("PIN stored");
        Ok(())
    }

    /// Decrypt the stored PIN and compare with the candidate
    pub fn verify_pin(&self, candidate: &str) -> AuthResult<bool> {
        if !self.has_pin() {
            return Err(AuthError::PinNotSet);
        }

        let blob = std::fs::read(&self.pin_path)?;
        if blob.len() <= NONCE_LEN {
            return Err(AuthError::Corrupt("PIN file too short".to_string()));
        }
        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);

        let cipher = ChaCha20Poly1305::new(&self.load_key()?);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| AuthError::Corrupt("PIN ciphertext fails authentication".to_string()))?;

        Ok(plaintext == candidate.as_bytes())
    }

    /// Remove the stored PIN and key
    pub fn clear(&self) -> AuthResult<()> {
        if self.pin_path.exists() {
            std::fs::remove_file(&self.pin_path)?;
        }
        if self.key_path.exists() {
            std::fs::remove_file(&self.key_path)?;
        }
        Ok(())
    }

    fn load_key(&self) -> AuthResult<Key> {
        let bytes = std::fs::read(&self.key_path)?;
        if bytes.len() != KEY_LEN {
            return Err(AuthError::Corrupt(format!(
                "key file is {} bytes, expected {KEY_LEN}",
                bytes.len()
            )));
        }
        Ok(*Key::from_slice(&bytes))
    }

    fn load_or_create_key(&self) -> AuthResult<Key> {
        if self.key_path.exists() {
            return self.load_key();
        }
        let key = ChaCha20Poly1305::generate_key(&mut OsRng);
        write_private(&self.key_path, key.as_slice())?;
        Ok(key)
    }
}

/// Check the PIN format rule (4+ ASCII digits)
pub(crate) fn validate_pin(pin: &str) -> AuthResult<()> {
    if pin.len() >= 4 && pin.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AuthError::InvalidPin)
    }
}

/// Write a file readable only by the owner where the platform supports it
///
/// The restrictive mode is applied at creation so the content is never
/// visible under wider permissions.
fn write_private(path: &Path, data: &[u8]) -> AuthResult<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(data)?;
    Ok(())
}
