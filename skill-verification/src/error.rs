use thiserror::Error;

/// Why a verification step failed.
///
/// These never cross the public boolean boundary of the authenticator; they
/// exist so each stage can log the precise failure kind.
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Certificate URL rejected by trust policy: {0}")]
    PolicyRejected(String),

    #[error("Certificate download failed: {0}")]
    Transport(String),

    #[error("Certificate could not be parsed: {0}")]
    Parse(String),

    #[error("Certificate not trusted: {0}")]
    Trust(String),

    #[error("Signature is not valid base64: {0}")]
    SignatureFormat(String),

    #[error("Signature does not match payload")]
    SignatureMismatch,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl VerificationError {
    /// Short stable label used as the `reason` field in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            VerificationError::PolicyRejected(_) => "policy_rejected",
            VerificationError::Transport(_) => "transport",
            VerificationError::Parse(_) => "parse",
            VerificationError::Trust(_) => "trust",
            VerificationError::SignatureFormat(_) => "signature_format",
            VerificationError::SignatureMismatch => "signature_mismatch",
            VerificationError::Configuration(_) => "configuration",
            VerificationError::Runtime(_) => "runtime",
        }
    }
}

pub type VerificationResult<T> = Result<T, VerificationError>;
