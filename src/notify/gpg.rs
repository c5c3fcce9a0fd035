//! PGP encryption via an external `gpg` binary.
//!
//! Produces inline ASCII-armored ciphertext. The recipient's public key must
//! already be in the keyring of the user running the watcher.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{EncryptError, Encryptor};

pub struct GpgEncryptor {
    program: String,
}

impl GpgEncryptor {
    pub fn new() -> Self {
        Self {
            program: "gpg".to_string(),
        }
    }

    #[cfg(test)]
    fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

impl Default for GpgEncryptor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Encryptor for GpgEncryptor {
    async fn encrypt(&self, plaintext: &str, recipient: &str) -> Result<String, EncryptError> {
        let mut child = Command::new(&self.program)
            .args(["--batch", "--yes", "--encrypt", "--armor", "-r", recipient])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EncryptError(format!("failed to spawn {}: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EncryptError("gpg stdin unavailable".to_string()))?;
        stdin
            .write_all(plaintext.as_bytes())
            .await
            .map_err(|e| EncryptError(format!("failed to write plaintext: {e}")))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| EncryptError(format!("gpg did not finish: {e}")))?;

        if !output.status.success() {
            return Err(EncryptError(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
