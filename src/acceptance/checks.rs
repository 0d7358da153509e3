use std::fmt;

use crate::terraform::StateFile;

/// One assertion against a state attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    /// The attribute exists and equals the value.
    Attr {
        address: String,
        key: String,
        value: String,
    },
    /// The attribute exists with any non-empty value.
    AttrSet { address: String, key: String },
    NoAttr { address: String, key: String },
}

pub fn check_attr(address: &str, key: &str, value: impl Into<String>) -> Check {
    Check::Attr {
        address: address.to_string(),
        key: key.to_string(),
        value: value.into(),
    }
}

pub fn check_attr_set(address: &str, key: &str) -> Check {
    Check::AttrSet {
        address: address.to_string(),
        key: key.to_string(),
    }
}

pub fn check_no_attr(address: &str, key: &str) -> Check {
    Check::NoAttr {
        address: address.to_string(),
        key: key.to_string(),
    }
}

impl Check {
    pub fn address(&self) -> &str {
        match self {
            Check::Attr { address, .. }
            | Check::AttrSet { address, .. }
            | Check::NoAttr { address, .. } => address,
        }
    }

    /// Runs the check, returning a description of the mismatch on failure.
    pub fn verify(&self, state: &StateFile) -> Result<(), String> {
        let resource = state
            .get(self.address())
            .ok_or_else(|| format!("{}: not found in state", self.address()))?;

        match self {
            Check::Attr { address, key, value } => match resource.attr(key) {
                Some(actual) if actual == value => Ok(()),
                Some(actual) => Err(format!(
                    "{address}: attribute '{key}' expected {value:?}, got {actual:?}"
                )),
                None => Err(format!(
                    "{address}: attribute '{key}' expected {value:?}, not set"
                )),
            },
            Check::AttrSet { address, key } => match resource.attr(key) {
                Some(actual) if !actual.is_empty() => Ok(()),
                _ => Err(format!("{address}: attribute '{key}' expected to be set")),
            },
            Check::NoAttr { address, key } => match resource.attr(key) {
                None => Ok(()),
                Some(actual) => Err(format!(
                    "{address}: attribute '{key}' expected to be unset, got {actual:?}"
                )),
            },
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::Attr { address, key, value } => write!(f, "{address} {key} = {value:?}"),
            Check::AttrSet { address, key } => write!(f, "{address} {key} is set"),
            Check::NoAttr { address, key } => write!(f, "{address} {key} is unset"),
        }
    }
}
