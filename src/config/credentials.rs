use std::env;
use std::fmt;

use super::{ConfigError, IndexProvider};

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const PINECONE_API_KEY: &str = "PINECONE_API_KEY";
pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";

/// Provider secrets, read once at startup and held for the process lifetime
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub openai_api_key: String,
    /// Absent only when the local LanceDB store is the index provider
    pub pinecone_api_key: Option<String>,
    pub google_api_key: String,
}

impl Credentials {
    #[inline]
    pub fn from_env(provider: IndexProvider) -> Result<Self, ConfigError> {
        Self::from_lookup(provider, |name| env::var(name).ok())
    }

    /// Resolve every key through `lookup`; blank values count as missing
    #[inline]
    pub fn from_lookup<F>(provider: IndexProvider, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::MissingCredential(name))
        };

        let openai_api_key = require(OPENAI_API_KEY)?;
        let pinecone_api_key = match provider {
            IndexProvider::Pinecone => Some(require(PINECONE_API_KEY)?),
            IndexProvider::LanceDb => None,
        };
        let google_api_key = require(GOOGLE_API_KEY)?;

        Ok(Self {
            openai_api_key,
            pinecone_api_key,
            google_api_key,
        })
    }

    #[inline]
    pub fn pinecone_api_key(&self) -> Result<&str, ConfigError> {
        self.pinecone_api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential(PINECONE_API_KEY))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &"<redacted>")
            .field(
                "pinecone_api_key",
                &self.pinecone_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("google_api_key", &"<redacted>")
            .finish()
    }
}
