use crate::domain::ports::TraSigner;
use crate::utils::error::{Result, WslpgError};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// 透過 `openssl smime` 產生 PKCS#7 簽章 (DER, base64)
#[derive(Debug, Clone)]
pub struct OpensslSigner {
    openssl_bin: String,
    cert: String,
    private_key: String,
}

impl OpensslSigner {
    pub fn new(openssl_bin: &str, cert: &str, private_key: &str) -> Self {
        Self {
            openssl_bin: openssl_bin.to_string(),
            cert: cert.to_string(),
            private_key: private_key.to_string(),
        }
    }

    fn args(&self) -> Vec<&str> {
        vec![
            "smime",
            "-sign",
            "-signer",
            &self.cert,
            "-inkey",
            &self.private_key,
            "-outform",
            "DER",
            "-nodetach",
        ]
    }
}

#[async_trait]
impl TraSigner for OpensslSigner {
    async fn sign(&self, tra: &str) -> Result<String> {
        tracing::debug!("Signing TRA with certificate {}", self.cert);

        let mut child = Command::new(&self.openssl_bin)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| WslpgError::SigningError {
                message: format!("cannot run '{}': {}", self.openssl_bin, e),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(tra.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(WslpgError::SigningError {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if output.stdout.is_empty() {
            return Err(WslpgError::SigningError {
                message: "openssl produced an empty signature".to_string(),
            });
        }

        Ok(STANDARD.encode(&output.stdout))
    }

    fn identity(&self) -> String {
        format!("{}|{}", self.cert, self.private_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_arguments() {
        let signer = OpensslSigner::new("openssl", "user.crt", "user.key");
        assert_eq!(
            signer.args(),
            vec![
                "smime", "-sign", "-signer", "user.crt", "-inkey", "user.key", "-outform", "DER",
                "-nodetach"
            ]
        );
        assert_eq!(signer.identity(), "user.crt|user.key");
    }

    #[tokio::test]
    async fn test_missing_binary_is_signing_error() {
        let signer = OpensslSigner::new("/nonexistent/openssl-bin", "user.crt", "user.key");
        let err = signer.sign("<loginTicketRequest/>").await.unwrap_err();
        assert!(matches!(err, WslpgError::SigningError { .. }));
    }
}
