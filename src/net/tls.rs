//! TLS termination for the HTTPS listener.

use axum_server::tls_rustls::RustlsConfig;

use crate::config::TlsConfig;

/// Load the rustls server configuration from PEM certificate and key.
pub async fn load_tls_config(config: &TlsConfig) -> Result<RustlsConfig, std::io::Error> {
    for (what, path) in [("Certificate", &config.cert_path), ("Private key", &config.key_path)] {
        if !path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} file not found: {}", what, path.display()),
            ));
        }
    }

    let rustls = RustlsConfig::from_pem_file(&config.cert_path, &config.key_path).await?;
    tracing::info!(cert = %config.cert_path.display(), "TLS configuration loaded");
    Ok(rustls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_certificate_is_reported() {
        let err = load_tls_config(&TlsConfig {
            cert_path: "/no/cert.pem".into(),
            key_path: "/no/key.pem".into(),
        })
        .await
        .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
        assert!(err.to_string().contains("/no/cert.pem"));
    }
}
