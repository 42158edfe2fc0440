use std::fmt;

use crate::error::EncodeError;

/// One typed argument of a message.
#[derive(Debug, Clone, PartialEq)]
pub enum OscArg {
    Int(i32),
    Float(f32),
    Str(String),
    Blob(Vec<u8>),
}

impl OscArg {
    /// The wire type tag for this argument.
    pub fn tag(&self) -> char {
        match self {
            OscArg::Int(_) => 'i',
            OscArg::Float(_) => 'f',
            OscArg::Str(_) => 's',
            OscArg::Blob(_) => 'b',
        }
    }

    /// The integer value, if this argument is an `Int`.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            OscArg::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The string value, if this argument is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OscArg::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for OscArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OscArg::Int(v) => write!(f, "{v}"),
            OscArg::Float(v) => write!(f, "{v}"),
            OscArg::Str(v) => write!(f, "{v}"),
            OscArg::Blob(v) => write!(f, "<blob {} bytes>", v.len()),
        }
    }
}

/// One typed, address-patterned unit of application data.
#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    /// `/`-separated address pattern, e.g. `/led/0/state`.
    pub address: String,
    /// Arguments in encode order.
    pub args: Vec<OscArg>,
}

impl OscMessage {
    /// Create a message, validating the address pattern.
    pub fn new(address: impl Into<String>, args: Vec<OscArg>) -> Result<Self, EncodeError> {
        let address = address.into();
        if !is_valid_address(&address) {
            return Err(EncodeError::InvalidAddress(address));
        }
        Ok(Self { address, args })
    }

    /// Parse a text command like `/led/0/state 1 3.5 hello` into a message.
    ///
    /// Tokens after the address become arguments: integer literals become
    /// `Int`, other numeric literals become `Float`, anything else becomes
    /// `Str` (surrounding double quotes are stripped).
    pub fn from_command(command: &str) -> Result<Self, EncodeError> {
        let mut tokens = command.split_whitespace();
        let address = tokens.next().unwrap_or_default().to_string();
        if !is_valid_address(&address) {
            return Err(EncodeError::InvalidAddress(address));
        }

        let args = tokens
            .map(|token| {
                if let Ok(i) = token.parse::<i32>() {
                    OscArg::Int(i)
                } else if let Ok(f) = token.parse::<f32>() {
                    OscArg::Float(f)
                } else {
                    OscArg::Str(token.trim_matches('"').to_string())
                }
            })
            .collect();

        Ok(Self { address, args })
    }
}

impl fmt::Display for OscMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

pub(crate) fn is_valid_address(address: &str) -> bool {
    address.len() > 1 && address.starts_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_with_mixed_args() {
        let msg = OscMessage::from_command("/appled/0/state 1 3.5 on").unwrap();
        assert_eq!(msg.address, "/appled/0/state");
        assert_eq!(
            msg.args,
            vec![
                OscArg::Int(1),
                OscArg::Float(3.5),
                OscArg::Str("on".to_string())
            ]
        );
    }

    #[test]
    fn command_with_no_args() {
        let msg = OscMessage::from_command("/system/info").unwrap();
        assert_eq!(msg.address, "/system/info");
        assert!(msg.args.is_empty());
    }

    #[test]
    fn quoted_token_becomes_string() {
        let msg = OscMessage::from_command("/system/name \"Board1\"").unwrap();
        assert_eq!(msg.args, vec![OscArg::Str("Board1".to_string())]);
    }

    #[test]
    fn rejects_non_slash_command() {
        assert!(matches!(
            OscMessage::from_command("led on"),
            Err(EncodeError::InvalidAddress(_))
        ));
        assert!(matches!(
            OscMessage::from_command(""),
            Err(EncodeError::InvalidAddress(_))
        ));
    }

    #[test]
    fn display_joins_address_and_args() {
        let msg = OscMessage::new(
            "/analogin/3/value",
            vec![OscArg::Int(512), OscArg::Str("ok".to_string())],
        )
        .unwrap();
        assert_eq!(msg.to_string(), "/analogin/3/value 512 ok");
    }
}
