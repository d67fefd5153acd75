//! Passphrase sealing for secrets that cannot go to the OS keyring.

use crate::auth::error::AuthError;
use argon2::{Algorithm, Argon2, Params, ParamsBuilder, Version};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, KeyInit},
};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    fn to_argon2(&self) -> Result<Params, AuthError> {
        let mut builder = ParamsBuilder::new();
        builder
            .m_cost(self.memory_kib)
            .t_cost(self.iterations)
            .p_cost(self.parallelism);
        builder.build().map_err(encryption_err)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedSecret {
    pub ciphertext: String,
    pub nonce: String,
    pub salt: String,
    pub kdf: KdfParams,
}

fn encryption_err(err: impl std::fmt::Display) -> AuthError {
    AuthError::Encryption(err.to_string())
}

fn derive_cipher(passphrase: &str, salt: &[u8], kdf: &KdfParams) -> Result<ChaCha20Poly1305, AuthError> {
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, kdf.to_argon2()?);
    let mut key = [0u8; 32];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(encryption_err)?;
    Ok(ChaCha20Poly1305::new(Key::from_slice(&key)))
}

pub fn seal(passphrase: &str, secret: &str) -> Result<SealedSecret, AuthError> {
    seal_with(passphrase, secret, KdfParams::default())
}

pub fn seal_with(passphrase: &str, secret: &str, kdf: KdfParams) -> Result<SealedSecret, AuthError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut nonce);

    let cipher = derive_cipher(passphrase, &salt, &kdf)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), secret.as_bytes())
        .map_err(encryption_err)?;

    Ok(SealedSecret {
        ciphertext: STANDARD.encode(ciphertext),
        nonce: STANDARD.encode(nonce),
        salt: STANDARD.encode(salt),
        kdf,
    })
}

pub fn open(passphrase: &str, sealed: &SealedSecret) -> Result<String, AuthError> {
    let salt = STANDARD.decode(&sealed.salt).map_err(encryption_err)?;
    let nonce = STANDARD.decode(&sealed.nonce).map_err(encryption_err)?;
    let ciphertext = STANDARD.decode(&sealed.ciphertext).map_err(encryption_err)?;
    if nonce.len() != NONCE_LEN {
        return Err(AuthError::Encryption("invalid nonce length".into()));
    }

    let cipher = derive_cipher(passphrase, &salt, &sealed.kdf)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
        .map_err(encryption_err)?;
    String::from_utf8(plaintext).map_err(encryption_err)
}
