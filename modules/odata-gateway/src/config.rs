//! Gateway configuration.
//!
//! Built once at startup from the layered application config and then shared
//! read-only; nothing here changes while the server runs.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::secret::SecretString;

/// Configuration errors detected by [`GatewayConfig::validate`].
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("backend.base_url '{url}' is invalid: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("backend.api_key is not set")]
    MissingApiKey,
    #[error("backend.timeout_secs must be greater than zero")]
    ZeroTimeout,
    #[error(
        "cors: allowed_origins=['*'] cannot be combined with allow_credentials=true; \
         list explicit origins when credentials are enabled"
    )]
    WildcardOriginWithCredentials,
    #[error("basic_auth.username must not be empty")]
    EmptyBasicAuthUser,
    #[error("metadata.key_property '{0}' is not one of metadata.properties")]
    UnknownKeyProperty(String),
    #[error("metadata.properties must not be empty")]
    NoProperties,
}

/// Root configuration of the gateway module.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    pub backend: BackendConfig,
    pub cors: CorsConfig,
    /// Gateway-level basic auth on `/odata` routes; disabled when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuthConfig>,
    pub metadata: MetadataConfig,
    /// Upper bound for a `$batch` request body.
    pub max_batch_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            cors: CorsConfig::default(),
            basic_auth: None,
            metadata: MetadataConfig::default(),
            max_batch_body_bytes: 8_388_608, // 8 MiB
        }
    }
}

impl GatewayConfig {
    /// # Errors
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend.validate()?;

        if self.cors.has_wildcard_origin() && self.cors.allow_credentials {
            return Err(ConfigError::WildcardOriginWithCredentials);
        }

        if let Some(auth) = &self.basic_auth {
            if auth.username.is_empty() {
                return Err(ConfigError::EmptyBasicAuthUser);
            }
        }

        self.metadata.validate()
    }
}

/// The PostgREST-style backend every entity set is read from.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Base URL; the entity set name is appended as the last path segment.
    pub base_url: String,
    /// Sent as both the `apikey` header and the bearer token.
    pub api_key: SecretString,
    /// Per-request timeout for backend calls.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/".to_owned(),
            api_key: SecretString::default(),
            timeout_secs: 10,
        }
    }
}

impl BackendConfig {
    /// # Errors
    /// Returns [`ConfigError`] for an unusable base URL, an empty API key or a zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parsed_base_url()?;
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// # Errors
    /// Returns [`ConfigError::InvalidBaseUrl`] unless the URL is an absolute
    /// `http`/`https` URL that can have path segments appended.
    pub fn parsed_base_url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason,
        };
        let url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        if url.cannot_be_a_base() {
            return Err(invalid("URL cannot be a base".to_owned()));
        }
        Ok(url)
    }
}

/// CORS allow-list. `"*"` in any list allows everything for that list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        let any = || vec!["*".to_owned()];
        Self {
            allowed_origins: any(),
            allowed_methods: any(),
            allowed_headers: any(),
            allow_credentials: false,
            max_age_seconds: 0,
        }
    }
}

impl CorsConfig {
    #[must_use]
    pub fn has_wildcard_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BasicAuthConfig {
    pub username: String,
    pub password: SecretString,
}

/// Shape of the entity type advertised by `$metadata`.
///
/// Property names are emitted through the same casing rule the data endpoints
/// apply to result rows.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataConfig {
    /// Appended to the entity set name to form the schema namespace.
    pub namespace_suffix: String,
    pub key_property: String,
    pub properties: Vec<PropertyConfig>,
}

impl MetadataConfig {
    /// # Errors
    /// Returns [`ConfigError`] if there are no properties or the key is not among them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.properties.is_empty() {
            return Err(ConfigError::NoProperties);
        }
        let key = odata_batch::normalize_key(&self.key_property);
        if !self
            .properties
            .iter()
            .any(|p| odata_batch::normalize_key(&p.name) == key)
        {
            return Err(ConfigError::UnknownKeyProperty(self.key_property.clone()));
        }
        Ok(())
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        use EdmType::{Boolean, Int64, String as Str};

        let props: [(&str, EdmType, bool); 29] = [
            ("Year", Int64, false),
            ("Month", Int64, true),
            ("DayofMonth", Int64, true),
            ("DayOfWeek", Int64, true),
            ("DepTime", Str, true),
            ("CRSDepTime", Int64, true),
            ("ArrTime", Str, true),
            ("CRSArrTime", Int64, true),
            ("UniqueCarrier", Str, true),
            ("FlightNum", Int64, true),
            ("TailNum", Str, true),
            ("ActualElapsedTime", Str, true),
            ("CRSElapsedTime", Int64, true),
            ("AirTime", Str, true),
            ("ArrDelay", Str, true),
            ("DepDelay", Str, true),
            ("Origin", Str, true),
            ("Dest", Str, true),
            ("Distance", Int64, true),
            ("TaxiIn", Str, true),
            ("TaxiOut", Str, true),
            ("Cancelled", Str, true),
            ("CancellationCode", Str, true),
            ("Diverted", Boolean, true),
            ("CarrierDelay", Str, true),
            ("WeatherDelay", Str, true),
            ("NASDelay", Str, true),
            ("SecurityDelay", Str, true),
            ("LateAircraftDelay", Str, true),
        ];

        Self {
            namespace_suffix: "_schema".to_owned(),
            key_property: "Year".to_owned(),
            properties: props
                .into_iter()
                .map(|(name, edm_type, nullable)| PropertyConfig {
                    name: name.to_owned(),
                    edm_type,
                    nullable,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PropertyConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub edm_type: EdmType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

/// EDM primitive types a property may be declared with.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum EdmType {
    #[serde(rename = "Edm.String")]
    String,
    #[serde(rename = "Edm.Int32")]
    Int32,
    #[serde(rename = "Edm.Int64")]
    Int64,
    #[serde(rename = "Edm.Double")]
    Double,
    #[serde(rename = "Edm.Decimal")]
    Decimal,
    #[serde(rename = "Edm.Boolean")]
    Boolean,
    #[serde(rename = "Edm.DateTime")]
    DateTime,
    #[serde(rename = "Edm.DateTimeOffset")]
    DateTimeOffset,
    #[serde(rename = "Edm.Guid")]
    Guid,
}

impl EdmType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "Edm.String",
            Self::Int32 => "Edm.Int32",
            Self::Int64 => "Edm.Int64",
            Self::Double => "Edm.Double",
            Self::Decimal => "Edm.Decimal",
            Self::Boolean => "Edm.Boolean",
            Self::DateTime => "Edm.DateTime",
            Self::DateTimeOffset => "Edm.DateTimeOffset",
            Self::Guid => "Edm.Guid",
        }
    }
}
