use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

/// Public origin of the web front-end, used to build installable links.
#[derive(Debug, Clone)]
pub struct PublicSite {
    pub base_url: Url,
}

impl PublicSite {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    fn join(&self, path: &str) -> Result<Url, url::ParseError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(path)
    }

    pub fn alert_page(&self, token: Uuid) -> Result<Url, url::ParseError> {
        self.join(&format!("public/{token}/"))
    }

    /// Web app manifest that installs the one-tap alert page for `token`.
    pub fn web_app_manifest(&self, token: Uuid) -> Result<Value, url::ParseError> {
        let start_url = self.alert_page(token)?;
        let icon_192 = self.join("icons/icon-192.png")?;
        let icon_512 = self.join("icons/icon-512.png")?;
        Ok(json!({
            "name": "ResQ Emergency Alert",
            "short_name": "ResQ",
            "start_url": start_url.as_str(),
            "scope": start_url.as_str(),
            "display": "standalone",
            "background_color": "#ffffff",
            "theme_color": "#d32f2f",
            "icons": [
                { "src": icon_192.as_str(), "sizes": "192x192", "type": "image/png" },
                { "src": icon_512.as_str(), "sizes": "512x512", "type": "image/png" },
            ],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_url_is_scoped_to_token() {
        let site = PublicSite::new(Url::parse("https://app.example.com/base").unwrap());
        let token = Uuid::nil();
        let manifest = site.web_app_manifest(token).unwrap();
        assert_eq!(
            manifest["start_url"],
            format!("https://app.example.com/base/public/{token}/")
        );
        assert_eq!(manifest["display"], "standalone");
        assert_eq!(manifest["icons"].as_array().map(Vec::len), Some(2));
    }
}
