use crate::FitLogError;
use secrecy::SecretString;

pub const DEFAULT_PHOTO_BUCKET: &str = "progress-photos";
pub const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 3600;
pub const DEFAULT_VAPID_SUBJECT: &str = "mailto:admin@example.com";

#[derive(Clone, Debug)]
pub struct Config {
    pub base_url: String,
    /// Project key sent as `apikey` (anon key for clients, service role key for jobs).
    pub api_key: SecretString,
    /// Signed-in user's token; requests fall back to `api_key` when absent.
    pub access_token: Option<SecretString>,
    pub photo_bucket: String,
    pub signed_url_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, FitLogError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function instead of the process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, FitLogError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let base_url = get("SUPABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| FitLogError::Config("SUPABASE_URL missing".into()))?;
        let api_key = get("SUPABASE_SERVICE_ROLE_KEY")
            .or_else(|| get("SUPABASE_ANON_KEY"))
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                FitLogError::Config(
                    "SUPABASE_SERVICE_ROLE_KEY or SUPABASE_ANON_KEY missing".into(),
                )
            })?;
        let access_token = get("SUPABASE_ACCESS_TOKEN")
            .filter(|v| !v.trim().is_empty())
            .map(|t| SecretString::new(t.into()));
        let photo_bucket =
            get("FITLOG_PHOTO_BUCKET").unwrap_or_else(|| DEFAULT_PHOTO_BUCKET.into());
        let signed_url_ttl_secs = match get("FITLOG_SIGNED_URL_TTL_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                FitLogError::Config(format!("FITLOG_SIGNED_URL_TTL_SECS is not a number: {raw}"))
            })?,
            None => DEFAULT_SIGNED_URL_TTL_SECS,
        };
        Ok(Self {
            base_url,
            api_key: SecretString::new(api_key.into()),
            access_token,
            photo_bucket,
            signed_url_ttl_secs,
        })
    }
}

/// VAPID credentials for Web Push. Keys are base64url encoded as produced by
/// the usual `web-push generate-vapid-keys` tooling.
#[derive(Clone, Debug)]
pub struct VapidConfig {
    pub public_key: String,
    pub private_key: SecretString,
    pub subject: String,
}

impl VapidConfig {
    /// `Ok(None)` when the keys are not configured; push delivery is then skipped.
    pub fn from_env() -> Result<Option<Self>, FitLogError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    pub fn from_env_with<F>(mut get: F) -> Result<Option<Self>, FitLogError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let public = get("VAPID_PUBLIC_KEY").filter(|v| !v.trim().is_empty());
        let private = get("VAPID_PRIVATE_KEY").filter(|v| !v.trim().is_empty());
        let (public_key, private_key) = match (public, private) {
            (Some(public), Some(private)) => (public, private),
            (None, None) => return Ok(None),
            _ => {
                return Err(FitLogError::Config(
                    "VAPID_PUBLIC_KEY and VAPID_PRIVATE_KEY must be set together".into(),
                ));
            }
        };
        let subject = get("VAPID_SUBJECT").unwrap_or_else(|| DEFAULT_VAPID_SUBJECT.into());
        Ok(Some(Self {
            public_key,
            private_key: SecretString::new(private_key.into()),
            subject,
        }))
    }
}
