use crate::utils::error::{Result, WslpgError};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

const CUIT_WEIGHTS: [u32; 10] = [5, 4, 3, 2, 7, 6, 5, 4, 3, 2];

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(WslpgError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(WslpgError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(WslpgError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(WslpgError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(WslpgError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(WslpgError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(WslpgError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// CUIT 驗證：11 位數字，最後一位為 mod 11 檢查碼
pub fn validate_cuit(field_name: &str, cuit: u64) -> Result<()> {
    let digits: Vec<u32> = format!("{:011}", cuit)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();

    if digits.len() != 11 || digits[0] == 0 {
        return Err(WslpgError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: cuit.to_string(),
            reason: "CUIT must have 11 digits".to_string(),
        });
    }

    let sum: u32 = digits
        .iter()
        .zip(CUIT_WEIGHTS.iter())
        .map(|(d, w)| d * w)
        .sum();
    let expected = match 11 - (sum % 11) {
        11 => 0,
        10 => {
            return Err(WslpgError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: cuit.to_string(),
                reason: "CUIT prefix has no valid check digit".to_string(),
            })
        }
        d => d,
    };

    if digits[10] != expected {
        return Err(WslpgError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: cuit.to_string(),
            reason: format!("Check digit should be {}", expected),
        });
    }
    Ok(())
}

/// 只檢查長度，不檢查檢查碼 (測試環境常用虛擬 CUIT)
pub fn validate_cuit_format(field_name: &str, cuit: u64) -> Result<()> {
    validate_range(field_name, cuit, 10_000_000_000, 99_999_999_999)
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(WslpgError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// COE 為 12 位數字
pub fn validate_coe(field_name: &str, coe: &str) -> Result<()> {
    if coe.len() != 12 || !coe.chars().all(|c| c.is_ascii_digit()) {
        return Err(WslpgError::ValidationError {
            message: format!("{} must be a 12 digit COE, got '{}'", field_name, coe),
        });
    }
    Ok(())
}
