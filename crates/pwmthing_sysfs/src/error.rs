use std::fmt::{Debug, Formatter};

use pwmthing_core::error::BuildError;

pub struct PwmError {
    pub message: String,
}

impl Debug for PwmError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        fmt.write_str(&self.message)
    }
}

impl From<&str> for PwmError {
    fn from(s: &str) -> Self {
        Self {
            message: s.to_string(),
        }
    }
}

impl From<String> for PwmError {
    fn from(s: String) -> Self {
        Self { message: s }
    }
}

impl From<sysfs_pwm::Error> for PwmError {
    fn from(err: sysfs_pwm::Error) -> Self {
        Self {
            message: format!("sysfs pwm error: {:?}", err),
        }
    }
}

impl From<PwmError> for BuildError {
    fn from(err: PwmError) -> Self {
        BuildError::from_string(err.message)
    }
}
