//! Chiffrement du mot de passe JasperServer stocké dans la configuration
//!
//! The key is derived from the machine id, so an encrypted password only
//! decrypts on the machine that wrote it. Plain-text passwords are still
//! accepted when reading.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use anyhow::{Result, anyhow};
use base64::Engine;
use sha2::{Digest, Sha256};

/// Préfixe pour identifier les mots de passe chiffrés
pub const ENCRYPTED_PREFIX: &str = "encrypted:";

const KEY_SALT: &[u8] = b"jrclient-config-encryption-v1";
const NONCE_SALT: &[u8] = b"jrclient-nonce-v1";

/// Récupère l'identifiant de la machine
///
/// Linux: `/etc/machine-id` puis `/var/lib/dbus/machine-id`.
/// macOS: `ioreg -d2 -c IOPlatformExpertDevice`.
/// Windows: `wmic csproduct get UUID`.
fn get_machine_uuid() -> Result<String> {
    #[cfg(target_os = "linux")]
    {
        use std::fs;

        for path in ["/etc/machine-id", "/var/lib/dbus/machine-id"] {
            if let Ok(uuid) = fs::read_to_string(path) {
                let uuid = uuid.trim();
                if !uuid.is_empty() {
                    return Ok(uuid.to_string());
                }
            }
        }

        Err(anyhow!("Failed to read machine-id"))
    }

    #[cfg(target_os = "macos")]
    {
        use std::process::Command;

        let output = Command::new("ioreg")
            .args(["-d2", "-c", "IOPlatformExpertDevice"])
            .output()?;
        let output_str = String::from_utf8_lossy(&output.stdout);

        // "IOPlatformUUID" = "XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX"
        output_str
            .lines()
            .filter(|line| line.contains("IOPlatformUUID"))
            .find_map(|line| line.split('"').nth(3).map(str::to_string))
            .ok_or_else(|| anyhow!("Failed to extract IOPlatformUUID from ioreg"))
    }

    #[cfg(target_os = "windows")]
    {
        use std::process::Command;

        let output = Command::new("wmic")
            .args(["csproduct", "get", "UUID"])
            .output()?;
        let output_str = String::from_utf8_lossy(&output.stdout);

        output_str
            .lines()
            .nth(1)
            .map(|uuid| uuid.trim().to_string())
            .ok_or_else(|| anyhow!("Failed to extract UUID from wmic"))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        Err(anyhow!("Unsupported platform for machine UUID extraction"))
    }
}

/// Dérive une clé AES-256 à partir d'un secret
fn derive_key_from(secret: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(KEY_SALT);

    let mut key = [0u8; 32];
    key.copy_from_slice(&hasher.finalize());
    key
}

pub(crate) fn machine_key() -> Result<[u8; 32]> {
    Ok(derive_key_from(&get_machine_uuid()?))
}

/// Encrypts with an explicit key. Output: `encrypted:BASE64(nonce || ciphertext)`.
///
/// The nonce is derived from the password, so the same password always gives
/// the same output and the config file is not rewritten needlessly.
pub fn encrypt_with_key(key: &[u8; 32], password: &str) -> Result<String> {
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|e| anyhow!("Failed to create cipher: {}", e))?;

    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(NONCE_SALT);
    let nonce_hash = hasher.finalize();
    let nonce_bytes = &nonce_hash[..12];

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(nonce_bytes), password.as_bytes())
        .map_err(|e| anyhow!("Encryption failed: {}", e))?;

    let mut combined = Vec::with_capacity(12 + ciphertext.len());
    combined.extend_from_slice(nonce_bytes);
    combined.extend_from_slice(&ciphertext);

    Ok(format!(
        "{}{}",
        ENCRYPTED_PREFIX,
        base64::engine::general_purpose::STANDARD.encode(&combined)
    ))
}

/// Decrypts a value produced by [`encrypt_with_key`].
pub fn decrypt_with_key(key: &[u8; 32], encrypted: &str) -> Result<String> {
    let base64_data = encrypted
        .strip_prefix(ENCRYPTED_PREFIX)
        .ok_or_else(|| anyhow!("Invalid encrypted password format (missing prefix)"))?;

    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|e| anyhow!("Failed to create cipher: {}", e))?;

    let combined = base64::engine::general_purpose::STANDARD
        .decode(base64_data)
        .map_err(|e| anyhow!("Invalid base64: {}", e))?;

    if combined.len() < 12 {
        return Err(anyhow!("Invalid ciphertext (too short)"));
    }
    let (nonce, ciphertext) = combined.split_at(12);

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| anyhow!("Decryption failed (wrong machine or corrupted data): {}", e))?;

    String::from_utf8(plaintext).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
}

/// Chiffre un mot de passe avec la clé de la machine
pub fn encrypt_password(password: &str) -> Result<String> {
    encrypt_with_key(&machine_key()?, password)
}

/// Déchiffre un mot de passe avec la clé de la machine
pub fn decrypt_password(encrypted: &str) -> Result<String> {
    decrypt_with_key(&machine_key()?, encrypted)
}

pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENCRYPTED_PREFIX)
}

/// Obtient le mot de passe en clair, qu'il soit chiffré ou non
pub fn get_password(value: &str) -> Result<String> {
    if is_encrypted(value) {
        decrypt_password(value)
    } else {
        Ok(value.to_string())
    }
}
