use std::fmt;

#[derive(Debug)]
pub enum AppError {
    /// A headset persona could not be resolved by its friendly name
    EntityNotResolved(String),
    DeviceNotFound(String),
    /// No device with this instance id is present any more
    InstanceNotFound(String),
    AmbiguousDevice { name: String, count: usize },
    PropertyUnavailable(String),
    PropertyReadFailed(String),
    InvalidTimestamp(String),
    DeviceStateFailed(String),
    PrivilegeRequired(String),
    ConfigError(String),
    Unsupported(String),
    IoError(std::io::Error),
    #[cfg(windows)]
    WindowsApiError(windows::core::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::EntityNotResolved(name) => write!(f, "Can not create '{}' entity", name),
            AppError::DeviceNotFound(name) => write!(f, "No device with friendly name '{}'", name),
            AppError::InstanceNotFound(id) => write!(f, "No device with instance id '{}'", id),
            AppError::AmbiguousDevice { name, count } => write!(
                f,
                "Friendly name '{}' matches {} devices, expected exactly one",
                name, count
            ),
            AppError::PropertyUnavailable(msg) => write!(f, "Property unavailable: {}", msg),
            AppError::PropertyReadFailed(msg) => write!(f, "Property read failed: {}", msg),
            AppError::InvalidTimestamp(msg) => write!(f, "Invalid timestamp: {}", msg),
            AppError::DeviceStateFailed(msg) => write!(f, "Device state change failed: {}", msg),
            AppError::PrivilegeRequired(msg) => write!(
                f,
                "{} (run with administrative rights)",
                msg
            ),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            AppError::IoError(e) => write!(f, "IO error: {}", e),
            #[cfg(windows)]
            AppError::WindowsApiError(e) => write!(f, "Windows API error: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::IoError(e) => Some(e),
            #[cfg(windows)]
            AppError::WindowsApiError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err)
    }
}

#[cfg(windows)]
impl From<windows::core::Error> for AppError {
    fn from(err: windows::core::Error) -> Self {
        AppError::WindowsApiError(err)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_not_resolved_mentions_name() {
        let err = AppError::EntityNotResolved("WH-1000XM4".to_string());
        assert!(err.to_string().contains("WH-1000XM4"));
    }

    #[test]
    fn test_privilege_hint() {
        let err = AppError::PrivilegeRequired("Access denied".to_string());
        assert!(err.to_string().contains("administrative rights"));
    }

    #[test]
    fn test_instance_not_found_wording() {
        let err = AppError::InstanceNotFound("BTHENUM\\DEV_0001".to_string());
        let msg = err.to_string();
        assert!(msg.contains("instance id"));
        assert!(!msg.contains("friendly name"));
    }

    #[test]
    fn test_unsupported_is_not_config_error() {
        let msg = AppError::Unsupported("Windows only".to_string()).to_string();
        assert!(!msg.contains("Configuration"));
    }

    #[test]
    fn test_io_error_conversion() {
        let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, AppError::IoError(_)));
    }
}
