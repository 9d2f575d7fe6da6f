use thiserror::Error;

/// 服務端回傳的錯誤或事件 (codigo / descripcion)
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ServiceMessage {
    pub codigo: String,
    pub descripcion: String,
}

impl std::fmt::Display for ServiceMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.codigo, self.descripcion)
    }
}

#[derive(Error, Debug)]
pub enum WslpgError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("SOAP fault {code}: {message}")]
    SoapFault { code: String, message: String },

    #[error("{operation} rejected by service: {}", join_messages(.errors))]
    ServiceRejected {
        operation: String,
        errors: Vec<ServiceMessage>,
    },

    #[error("Response of {operation} is missing '{field}'")]
    MissingField { operation: String, field: String },

    #[error("Signing error: {message}")]
    SigningError { message: String },

    #[error("Authentication error: {message}")]
    AuthError { message: String },

    #[error("Scenario '{scenario}' failed: {message}")]
    ScenarioError { scenario: String, message: String },
}

fn join_messages(errors: &[ServiceMessage]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Protocol,
    Service,
    Configuration,
    Validation,
    Security,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// CLI 結束代碼
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl WslpgError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            WslpgError::HttpError(_) => ErrorCategory::Network,
            WslpgError::XmlError(_)
            | WslpgError::SoapFault { .. }
            | WslpgError::MissingField { .. } => ErrorCategory::Protocol,
            WslpgError::ServiceRejected { .. } | WslpgError::ScenarioError { .. } => {
                ErrorCategory::Service
            }
            WslpgError::ConfigError { .. }
            | WslpgError::ConfigValidationError { .. }
            | WslpgError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            WslpgError::ValidationError { .. } => ErrorCategory::Validation,
            WslpgError::SigningError { .. } | WslpgError::AuthError { .. } => {
                ErrorCategory::Security
            }
            WslpgError::IoError(_)
            | WslpgError::SerializationError(_)
            | WslpgError::CsvError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 網路錯誤通常可以重試
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Service | ErrorCategory::Validation => ErrorSeverity::High,
            ErrorCategory::Protocol | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Security | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            WslpgError::HttpError(_) => {
                "Check network connectivity and the service endpoint, then retry".to_string()
            }
            WslpgError::SoapFault { code, .. } if code.contains("alreadyAuthenticated") => {
                "A valid access ticket already exists; keep the cache directory between runs"
                    .to_string()
            }
            WslpgError::SoapFault { .. } => {
                "Inspect the request with RUST_LOG=wslpg_client=trace".to_string()
            }
            WslpgError::ServiceRejected { .. } => {
                "Review the request fields against the codes reported by the service".to_string()
            }
            WslpgError::ConfigError { .. }
            | WslpgError::ConfigValidationError { .. }
            | WslpgError::InvalidConfigValueError { .. } => {
                "Fix the configuration file and try again".to_string()
            }
            WslpgError::ValidationError { .. } => "Correct the request data".to_string(),
            WslpgError::SigningError { .. } => {
                "Check the certificate, the private key and that openssl is installed".to_string()
            }
            WslpgError::AuthError { .. } => {
                "Delete the cached access ticket and authenticate again".to_string()
            }
            WslpgError::MissingField { .. } | WslpgError::XmlError(_) => {
                "The service answered with an unexpected document; retry later".to_string()
            }
            WslpgError::ScenarioError { .. } => {
                "Compare the service response with the expected homologation values".to_string()
            }
            WslpgError::IoError(_) | WslpgError::SerializationError(_) | WslpgError::CsvError(_) => {
                "Check file permissions and available disk space".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            WslpgError::ServiceRejected { operation, errors } => {
                format!("{} was rejected ({} error(s))", operation, errors.len())
            }
            WslpgError::SoapFault { message, .. } => format!("Service fault: {}", message),
            WslpgError::HttpError(_) => "Could not reach the web service".to_string(),
            other => other.to_string(),
        }
    }

    /// 由服務端錯誤碼建立拒絕錯誤
    pub fn rejected(operation: &str, errors: Vec<ServiceMessage>) -> Self {
        WslpgError::ServiceRejected {
            operation: operation.to_string(),
            errors,
        }
    }

    pub fn missing(operation: &str, field: &str) -> Self {
        WslpgError::MissingField {
            operation: operation.to_string(),
            field: field.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WslpgError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_message_lists_codes() {
        let err = WslpgError::rejected(
            "liquidacionAutorizar",
            vec![
                ServiceMessage {
                    codigo: "1800".to_string(),
                    descripcion: "CUIT invalida".to_string(),
                },
                ServiceMessage {
                    codigo: "1804".to_string(),
                    descripcion: "Puerto inexistente".to_string(),
                },
            ],
        );

        let text = err.to_string();
        assert!(text.contains("1800: CUIT invalida"));
        assert!(text.contains("1804: Puerto inexistente"));
        assert_eq!(err.category(), ErrorCategory::Service);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(err.severity().exit_code(), 1);
    }

    #[test]
    fn test_already_authenticated_suggestion() {
        let err = WslpgError::SoapFault {
            code: "ns1:coe.alreadyAuthenticated".to_string(),
            message: "El CEE ya posee un TA valido".to_string(),
        };
        assert!(err.recovery_suggestion().contains("cache"));
        assert_eq!(err.category(), ErrorCategory::Protocol);
    }
}
