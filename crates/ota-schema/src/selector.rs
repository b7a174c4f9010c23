//! Request selectors: the normalized form of a device's query parameters.
//!
//! Parsing is deliberately lenient here. A [`SelectorSet`] records what the
//! client asked for; deciding whether the request is valid belongs to the
//! query builder, which has to order its checks (size policy first, then
//! validation) before anything reaches the record store.

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Query key selecting the device architecture.
pub const KEY_CPU_ARCH: &str = "cpuarch";
/// Query key selecting the deployment ring.
pub const KEY_ENV: &str = "os";
/// Query key selecting the response shape.
pub const KEY_PAYLOAD_TYPE: &str = "payloadtype";
/// Prefix marking a device-capability selector (`attr<name>=<env>`).
pub const ATTR_PREFIX: &str = "attr";
/// Ring used when the request names none.
pub const DEFAULT_ENV: &str = "prod";

/// Shape of the response body a device asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PayloadType {
    /// Gzip tar bundle of every fresh binary plus the manifest.
    #[default]
    FullPayload,
    /// Manifest JSON only; no binaries are fetched.
    MetadataOnly,
}

impl PayloadType {
    /// Lower-cased wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullPayload => "fullpayload",
            Self::MetadataOnly => "metadataonly",
        }
    }
}

impl std::fmt::Display for PayloadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PayloadType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fullpayload" => Ok(Self::FullPayload),
            "metadataonly" => Ok(Self::MetadataOnly),
            _ => Err(SchemaError::UnknownPayloadType(s.to_string())),
        }
    }
}

/// A non-reserved selector: either a device attribute or an explicit app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selector {
    /// `attr<name>=<env>`: builds flagged with `deviceAttr.<name> = true`.
    Attr {
        /// Attribute name with the `attr` prefix removed
        name: String,
        /// Ring to match
        env: String,
    },
    /// `<app>=<env>`: a specific app in a specific ring.
    App {
        /// App id
        app: String,
        /// Ring to match
        env: String,
    },
}

/// Canonical selector set derived from one request.
///
/// All keys and values are lower-cased. `cpu_arch` and `payload_type` hold
/// the raw strings the client sent; see the module docs for why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorSet {
    /// Architecture selector, mandatory for a valid request
    pub cpu_arch: Option<String>,
    /// Ring for the OS image clause
    pub env: String,
    /// Requested payload type, unvalidated
    pub payload_type: String,
    /// Attribute and app selectors in query order
    pub extra: Vec<Selector>,
}

impl Default for SelectorSet {
    fn default() -> Self {
        Self {
            cpu_arch: None,
            env: DEFAULT_ENV.to_string(),
            payload_type: PayloadType::default().as_str().to_string(),
            extra: Vec::new(),
        }
    }
}

impl SelectorSet {
    /// Classify `(key, value)` parameters into a selector set.
    ///
    /// Keys and values are lower-cased; the first occurrence of a key wins.
    pub fn from_params<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut set = Self::default();
        let mut seen = std::collections::HashSet::new();
        let mut env = None;
        let mut payload_type = None;

        for (key, value) in params {
            let key = key.as_ref().to_ascii_lowercase();
            let value = value.as_ref().to_ascii_lowercase();
            if !seen.insert(key.clone()) {
                continue;
            }

            match key.as_str() {
                KEY_CPU_ARCH => set.cpu_arch = Some(value),
                KEY_ENV => env = Some(value),
                KEY_PAYLOAD_TYPE => payload_type = Some(value),
                _ => match key.strip_prefix(ATTR_PREFIX) {
                    Some(name) => set.extra.push(Selector::Attr {
                        name: name.to_string(),
                        env: value,
                    }),
                    None => set.extra.push(Selector::App { app: key, env: value }),
                },
            }
        }

        if let Some(env) = env {
            set.env = env;
        }
        if let Some(payload_type) = payload_type {
            set.payload_type = payload_type;
        }
        set
    }

    /// Whether the client asked for a full bundle.
    pub fn wants_full_payload(&self) -> bool {
        self.payload_type == PayloadType::FullPayload.as_str()
    }
}
