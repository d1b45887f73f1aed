//! Trust client configuration.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{StsError, StsResult};

/// Connection settings for one trust authority endpoint.
///
/// Used both to connect a client and, through [`key`](Self::key), to pick
/// its sub-pool.
#[derive(Clone, PartialEq, Eq)]
pub struct StsClientConfig {
    endpoint_address: String,
    service_name: String,
    port_name: String,
    username: Option<String>,
    password: Option<String>,
    properties: BTreeMap<String, String>,
}

impl StsClientConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> StsClientConfigBuilder {
        StsClientConfigBuilder::default()
    }

    /// Returns the endpoint address.
    #[must_use]
    pub fn endpoint_address(&self) -> &str {
        &self.endpoint_address
    }

    /// Returns the WSDL service name.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Returns the WSDL port name.
    #[must_use]
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns the password.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Returns an authority-specific property.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Returns the pool key: `service|port|endpoint|user`.
    ///
    /// The password is deliberately not part of the key, so keys can be
    /// logged.
    #[must_use]
    pub fn key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.service_name,
            self.port_name,
            self.endpoint_address,
            self.username.as_deref().unwrap_or_default()
        )
    }
}

impl fmt::Debug for StsClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StsClientConfig")
            .field("endpoint_address", &self.endpoint_address)
            .field("service_name", &self.service_name)
            .field("port_name", &self.port_name)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`StsClientConfig`].
#[derive(Default)]
pub struct StsClientConfigBuilder {
    endpoint_address: Option<String>,
    service_name: Option<String>,
    port_name: Option<String>,
    username: Option<String>,
    password: Option<String>,
    properties: BTreeMap<String, String>,
}

impl StsClientConfigBuilder {
    /// Sets the endpoint address (required).
    #[must_use]
    pub fn endpoint_address(mut self, address: impl Into<String>) -> Self {
        self.endpoint_address = Some(address.into());
        self
    }

    /// Sets the WSDL service name.
    #[must_use]
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Sets the WSDL port name.
    #[must_use]
    pub fn port_name(mut self, name: impl Into<String>) -> Self {
        self.port_name = Some(name.into());
        self
    }

    /// Sets username/password credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Adds an authority-specific property.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Fails if the endpoint address is missing or blank, or a key
    /// component contains the `|` separator.
    pub fn build(self) -> StsResult<StsClientConfig> {
        let endpoint_address = self
            .endpoint_address
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| StsError::Configuration("endpoint_address is required".to_string()))?;

        let config = StsClientConfig {
            endpoint_address,
            service_name: self.service_name.unwrap_or_else(|| "SecurityTokenService".to_string()),
            port_name: self.port_name.unwrap_or_else(|| "SecurityTokenServicePort".to_string()),
            username: self.username,
            password: self.password,
            properties: self.properties,
        };

        let key_parts = [
            Some(config.endpoint_address.as_str()),
            Some(config.service_name.as_str()),
            Some(config.port_name.as_str()),
            config.username.as_deref(),
        ];
        if key_parts.into_iter().flatten().any(|part| part.contains('|')) {
            return Err(StsError::Configuration(
                "endpoint, service, port and username must not contain '|'".to_string(),
            ));
        }
        Ok(config)
    }
}
