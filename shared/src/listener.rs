use serde::Deserialize;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ListenerError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Empty listener host")]
    EmptyHost,
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ListenerError> {
        if self.host.is_empty() {
            return Err(ListenerError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ListenerError::InvalidPort);
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 8000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_validation() {
        let listener = Listener::default();
        assert!(listener.validate().is_ok());
        assert_eq!(listener.addr(), "127.0.0.1:8000");

        let listener = Listener {
            host: "0.0.0.0".into(),
            port: 0,
        };
        assert_eq!(listener.validate(), Err(ListenerError::InvalidPort));

        let listener = Listener {
            host: "".into(),
            port: 80,
        };
        assert_eq!(listener.validate(), Err(ListenerError::EmptyHost));
    }

    #[test]
    fn test_listener_deserialization() {
        let listener: Listener = serde_yaml::from_str("{host: 0.0.0.0, port: 3000}").unwrap();
        assert_eq!(listener.port, 3000);
        assert!(serde_yaml::from_str::<Listener>("{host: 0.0.0.0, port: nope}").is_err());
    }
}
