//! Loads the TLS trust material named by a profile.

use super::GatewayError;
use crate::http::TlsSettings;
use crate::profile::Trust;
use reqwest::{Certificate, Identity};
use std::fs;
use tracing::debug;

fn non_blank(path: &Option<String>) -> Option<&str> {
    path.as_deref().map(str::trim).filter(|path| !path.is_empty())
}

/// Reads the CA bundle and client key pair, or `None` when the profile names
/// neither.
pub fn load_trust(trust: &Trust) -> Result<Option<TlsSettings>, GatewayError> {
    let mut settings = TlsSettings::default();

    let cert = non_blank(&trust.client_certificate_path);
    let key = non_blank(&trust.client_key_path);
    if cert.is_some() || key.is_some() {
        let identity_error = |reason: String| GatewayError::ClientIdentity {
            cert: cert.unwrap_or_default().to_string(),
            key: key.unwrap_or_default().to_string(),
            reason,
        };
        let (cert, key) = match (cert, key) {
            (Some(cert), Some(key)) => (cert, key),
            _ => {
                return Err(identity_error(
                    "both a client certificate and a client key are required".to_string(),
                ))
            }
        };
        let mut pem = fs::read(cert).map_err(|e| identity_error(format!("{cert}: {e}")))?;
        pem.push(b'\n');
        pem.extend(fs::read(key).map_err(|e| identity_error(format!("{key}: {e}")))?);
        let identity = Identity::from_pem(&pem).map_err(|e| identity_error(e.to_string()))?;
        debug!(cert, key, "loaded client certificate");
        settings.identity = Some(identity);
    }

    if let Some(ca) = non_blank(&trust.ca_file_path) {
        let ca_error = |reason: String| GatewayError::CaCertificate {
            path: ca.to_string(),
            reason,
        };
        let pem = fs::read(ca).map_err(|e| ca_error(e.to_string()))?;
        let certificates = Certificate::from_pem_bundle(&pem).map_err(|e| ca_error(e.to_string()))?;
        if certificates.is_empty() {
            return Err(ca_error("no PEM certificates found".to_string()));
        }
        debug!(path = ca, count = certificates.len(), "loaded ca certificates");
        settings.root_certificates = certificates;
    }

    Ok((!settings.is_empty()).then_some(settings))
}
