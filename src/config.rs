use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::{env, fmt, time::Duration};

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub store: StoreConfig,
}

/// Connection settings for the backing S3-compatible store.
///
/// Built once at startup and handed to both the S3 client and the gateway
/// service; nothing reads the process environment after this is parsed.
#[derive(Clone)]
pub struct StoreConfig {
    pub endpoint: String,
    pub port: u16,
    pub use_tls: bool,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
    pub timeout: Duration,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "HTTP file gateway for an S3-compatible object store")]
pub struct Args {
    /// Host to bind to (overrides GATEWAY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides GATEWAY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Maximum accepted request body in bytes (overrides GATEWAY_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();
        Self::from_lookup(args, |name| env::var(name).ok())
    }

    /// Merge CLI args with values resolved through `lookup`.
    pub fn from_lookup<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("missing required environment variable {}", name))
        };

        let store = StoreConfig {
            endpoint: required("STORE_ENDPOINT")?,
            port: parse_var(&lookup, "STORE_PORT")?
                .ok_or_else(|| anyhow!("missing required environment variable STORE_PORT"))?,
            use_tls: lookup("STORE_USE_TLS").as_deref() == Some("true"),
            access_key: required("STORE_ACCESS_KEY")?,
            secret_key: required("STORE_SECRET_KEY")?,
            bucket: required("STORE_BUCKET")?,
            region: lookup("STORE_REGION")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REGION.into()),
            timeout: Duration::from_secs(
                parse_var(&lookup, "STORE_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        };

        let env_host = lookup("GATEWAY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let env_port = parse_var(&lookup, "GATEWAY_PORT")?.unwrap_or(3000);
        let env_max_upload =
            parse_var(&lookup, "GATEWAY_MAX_UPLOAD_BYTES")?.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
            store,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl StoreConfig {
    /// Base URL the S3 client talks to, e.g. `http://localhost:9000`.
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.endpoint, self.port)
    }

    /// Plain access URL advertised in listings.
    ///
    /// Always `http`, regardless of `use_tls`; the key is not percent-encoded.
    pub fn public_object_url(&self, key: &str) -> String {
        format!(
            "http://{}:{}/{}/{}",
            self.endpoint, self.port, self.bucket, key
        )
    }
}

// Keeps the secret key out of startup logs.
impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("endpoint", &self.endpoint)
            .field("port", &self.port)
            .field("use_tls", &self.use_tls)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        None => Ok(None),
    }
}
