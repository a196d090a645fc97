use reqwest::Url;

use crate::config::{BlobConfig, ServerConfig};

/// Path segment under which local uploads are stored and served.
pub const UPLOADS_PREFIX: &str = "uploads";

/// Renders stored locators as client-fetchable URLs.
///
/// A locator is canonical-remote when it is an absolute URL on one of the
/// object-storage hosts; those pass through untouched. Everything else is a
/// local file: relative paths, Windows-style paths, and absolute URLs carrying
/// an old self-referential origin are reduced to `uploads/<name>` and then
/// served from the current origin.
///
/// A `public_base_url` may carry a path prefix (`https://example.com/gallery`);
/// URLs rendered under it are mapped back to the same stored form.
#[derive(Debug, Clone, Default)]
pub struct LocatorRenderer {
    public_base_url: Option<String>,
    base_path: String,
    remote_hosts: Vec<String>,
}

impl LocatorRenderer {
    #[must_use]
    pub fn new(public_base_url: Option<&str>, remote_hosts: Vec<String>) -> Self {
        let public_base_url = public_base_url.map(|u| u.trim_end_matches('/').to_string());
        let base_path = public_base_url
            .as_deref()
            .and_then(|u| Url::parse(u).ok())
            .map(|u| u.path().trim_matches('/').to_string())
            .unwrap_or_default();

        Self {
            public_base_url,
            base_path,
            remote_hosts: remote_hosts
                .into_iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
        }
    }

    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        let mut remote_hosts = Vec::new();
        if let BlobConfig::Remote {
            public_url,
            extra_hosts,
            ..
        } = &config.blob
        {
            if let Some(host) = Url::parse(public_url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
            {
                remote_hosts.push(host);
            }
            remote_hosts.extend(extra_hosts.iter().cloned());
        }
        Self::new(config.public_base_url.as_deref(), remote_hosts)
    }

    #[must_use]
    pub fn is_canonical_remote(&self, locator: &str) -> bool {
        match Url::parse(locator.trim()) {
            Ok(url) => url.host_str().is_some_and(|host| {
                let host = host.to_ascii_lowercase();
                self.remote_hosts.contains(&host)
            }),
            Err(_) => false,
        }
    }

    /// The form a locator is stored in: remote URLs as-is, local files as `uploads/<name>`.
    #[must_use]
    pub fn canonical(&self, locator: &str) -> String {
        let locator = locator.trim();
        if self.is_canonical_remote(locator) {
            locator.to_string()
        } else {
            local_path(locator, &self.base_path)
        }
    }

    #[must_use]
    pub fn render(&self, locator: &str) -> String {
        let locator = locator.trim();
        if self.is_canonical_remote(locator) {
            return locator.to_string();
        }

        let path = encode_path(&local_path(locator, &self.base_path));
        match &self.public_base_url {
            Some(base) => format!("{base}/{path}"),
            None => format!("/{path}"),
        }
    }

    /// Stored forms a client-supplied image URL may correspond to, most literal first.
    #[must_use]
    pub fn delete_candidates(&self, raw: &str) -> Vec<String> {
        let raw = raw.trim();
        let decoded = urlencoding::decode(raw)
            .map(|d| d.trim().to_string())
            .unwrap_or_else(|_| raw.to_string());

        let mut candidates = vec![decoded.clone()];
        let mut forms = vec![self.canonical(&decoded)];
        // A rendered URL sent as-is keeps escapes such as %23 that decoding would turn into syntax.
        if raw != decoded && is_absolute_url(raw) {
            forms.push(self.canonical(raw));
        }
        for form in forms {
            if !candidates.contains(&form) {
                candidates.push(form);
            }
        }
        candidates
    }
}

fn is_absolute_url(value: &str) -> bool {
    Url::parse(value).is_ok_and(|url| url.host_str().is_some())
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn local_path(locator: &str, base_path: &str) -> String {
    if locator.contains('\\') {
        let name = locator.rsplit('\\').next().unwrap_or(locator);
        return format!("{UPLOADS_PREFIX}/{name}");
    }

    let path = match Url::parse(locator) {
        Ok(url) if url.host_str().is_some() => urlencoding::decode(url.path())
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| url.path().to_string()),
        _ => locator.to_string(),
    };

    let mut path = path.trim_start_matches('/');
    if !base_path.is_empty() {
        if let Some(rest) = path
            .strip_prefix(base_path)
            .and_then(|rest| rest.strip_prefix('/'))
        {
            path = rest;
        }
    }
    let name = path
        .strip_prefix(UPLOADS_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path);
    format!("{UPLOADS_PREFIX}/{name}")
}
