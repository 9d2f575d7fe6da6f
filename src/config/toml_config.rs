use crate::utils::error::{Result, WslpgError};
use crate::utils::validation::{
    validate_cuit, validate_path, validate_positive_number, validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const WSAA_HOMO_URL: &str = "https://wsaahomo.afip.gov.ar/ws/services/LoginCms";
pub const WSLPG_HOMO_URL: &str = "https://fwshomo.afip.gov.ar/wslpg/LpgService";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub auth: AuthConfig,
    pub wslpg: WslpgConfig,
    pub cache: Option<CacheConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub cuit: u64,
    pub cert: String,
    pub private_key: String,
    pub wsaa_url: Option<String>,
    pub service: Option<String>,
    pub ttl_seconds: Option<u64>,
    pub openssl_bin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WslpgConfig {
    pub url: Option<String>,
    pub cacert: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub dir: String,
}

impl Default for WslpgConfig {
    fn default() -> Self {
        Self {
            url: Some(WSLPG_HOMO_URL.to_string()),
            cacert: None,
            timeout_seconds: Some(60),
        }
    }
}

impl WslpgConfig {
    /// 服務端點；去掉結尾的 `?wsdl`
    pub fn endpoint(&self) -> &str {
        let url = self.url.as_deref().unwrap_or(WSLPG_HOMO_URL);
        url.strip_suffix("?wsdl")
            .or_else(|| url.strip_suffix("?WSDL"))
            .unwrap_or(url)
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(60)
    }
}

impl AuthConfig {
    pub fn wsaa_url(&self) -> &str {
        self.wsaa_url.as_deref().unwrap_or(WSAA_HOMO_URL)
    }

    pub fn service(&self) -> &str {
        self.service.as_deref().unwrap_or("wslpg")
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds.unwrap_or(2400)
    }

    pub fn openssl_bin(&self) -> &str {
        self.openssl_bin.as_deref().unwrap_or("openssl")
    }
}

impl ClientConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(WslpgError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| WslpgError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${WSLPG_CERT})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| WslpgError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn cache_dir(&self) -> &str {
        self.cache.as_ref().map(|c| c.dir.as_str()).unwrap_or("./cache")
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_cuit("auth.cuit", self.auth.cuit)?;
        validate_path("auth.cert", &self.auth.cert)?;
        validate_path("auth.private_key", &self.auth.private_key)?;
        validate_url("auth.wsaa_url", self.auth.wsaa_url())?;
        validate_range("auth.ttl_seconds", self.auth.ttl_seconds(), 60, 86_400)?;

        validate_url("wslpg.url", self.wslpg.endpoint())?;
        if let Some(cacert) = &self.wslpg.cacert {
            validate_path("wslpg.cacert", cacert)?;
        }
        validate_positive_number("wslpg.timeout_seconds", self.wslpg.timeout_seconds(), 1)?;

        validate_path("cache.dir", self.cache_dir())?;
        Ok(())
    }
}

impl Validate for ClientConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[auth]
cuit = 20267565393
cert = "reingart.crt"
private_key = "reingart.key"

[wslpg]
url = "https://fwshomo.afip.gov.ar/wslpg/LpgService?wsdl"

[cache]
dir = "./cache"
"#;

    #[test]
    fn test_parse_basic_config() {
        let config = ClientConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.auth.cuit, 20267565393);
        assert_eq!(config.auth.service(), "wslpg");
        assert_eq!(config.auth.ttl_seconds(), 2400);
        assert_eq!(config.auth.wsaa_url(), WSAA_HOMO_URL);
        assert_eq!(config.wslpg.endpoint(), WSLPG_HOMO_URL);
        assert_eq!(config.wslpg.timeout_seconds(), 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("WSLPG_TEST_CERT_PATH", "/etc/afip/test.crt");

        let content = r#"
[auth]
cuit = 20267565393
cert = "${WSLPG_TEST_CERT_PATH}"
private_key = "test.key"

[wslpg]
"#;

        let config = ClientConfig::from_toml_str(content).unwrap();
        assert_eq!(config.auth.cert, "/etc/afip/test.crt");
        assert_eq!(config.cache_dir(), "./cache");

        std::env::remove_var("WSLPG_TEST_CERT_PATH");
    }

    #[test]
    fn test_config_validation() {
        let mut config = ClientConfig::from_toml_str(BASIC).unwrap();
        config.auth.cuit = 20267565394;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::from_toml_str(BASIC).unwrap();
        config.wslpg.url = Some("invalid-url".to_string());
        assert!(config.validate().is_err());

        let mut config = ClientConfig::from_toml_str(BASIC).unwrap();
        config.auth.ttl_seconds = Some(5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = ClientConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.auth.private_key, "reingart.key");
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = ClientConfig::from_toml_str("[auth\ncuit = 1").unwrap_err();
        assert!(matches!(err, WslpgError::ConfigValidationError { .. }));
    }
}
