// robots.txt permission gate and site information lookup

use crate::fetcher::Fetcher;
use serde::{Deserialize, Serialize};
use texting_robots::Robot;
use tracing::{info, warn};
use url::Url;

/// Facts about a site's crawl-control files, for reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteInfo {
    pub robots_exists: bool,
    pub llms_exists: bool,
    pub sitemap_urls: Vec<String>,
}

/// Wraps a robots.txt predicate. Without a parsed policy every URL is permitted.
pub struct PolitenessGate {
    robot: Option<Robot>,
    robots_exists: bool,
}

impl PolitenessGate {
    /// A gate that permits everything and knows nothing about the site.
    pub fn permissive() -> Self {
        Self {
            robot: None,
            robots_exists: false,
        }
    }

    /// Parses a robots.txt body for `user_agent`. A body that fails to parse yields a permissive gate.
    pub fn from_robots_txt(user_agent: &str, contents: &str) -> Self {
        let robot = match Robot::new(user_agent, contents.as_bytes()) {
            Ok(robot) => Some(robot),
            Err(e) => {
                warn!("Could not parse robots.txt: {}", e);
                None
            }
        };

        Self {
            robot,
            robots_exists: true,
        }
    }

    /// Fetches `/robots.txt` from the seed's origin.
    pub async fn load(fetcher: &Fetcher, base_url: &str, user_agent: &str) -> Self {
        let Some(robots_url) = robots_url(base_url) else {
            return Self::permissive();
        };

        info!("Checking robots.txt at {}", robots_url);
        match fetcher.fetch_text(&robots_url).await {
            Some(contents) => {
                info!("robots.txt found");
                Self::from_robots_txt(user_agent, &contents)
            }
            None => {
                warn!("No usable robots.txt at {}", robots_url);
                Self::permissive()
            }
        }
    }

    pub fn can_fetch(&self, url: &str) -> bool {
        match self.robot {
            Some(ref robot) => robot.allowed(url),
            None => true,
        }
    }

    pub fn robots_exists(&self) -> bool {
        self.robots_exists
    }

    /// `Sitemap:` entries declared in robots.txt.
    pub fn declared_sitemaps(&self) -> Vec<String> {
        self.robot
            .as_ref()
            .map(|robot| robot.sitemaps.clone())
            .unwrap_or_default()
    }

    /// Site facts for the report: robots/llms.txt presence plus candidate sitemaps.
    pub async fn site_info(&self, fetcher: &Fetcher, base_url: &str) -> SiteInfo {
        let mut sitemap_urls = self.declared_sitemaps();
        if let Ok(base) = Url::parse(base_url)
            && let Ok(default_sitemap) = base.join("/sitemap.xml")
        {
            sitemap_urls.push(default_sitemap.to_string());
        }
        sitemap_urls.sort();
        sitemap_urls.dedup();

        let llms_exists = match Url::parse(base_url).and_then(|u| u.join("/llms.txt")) {
            Ok(llms_url) => fetcher.fetch_text(llms_url.as_str()).await.is_some(),
            Err(_) => false,
        };

        SiteInfo {
            robots_exists: self.robots_exists,
            llms_exists,
            sitemap_urls,
        }
    }
}

pub fn robots_url(base_url: &str) -> Option<String> {
    Url::parse(base_url)
        .ok()?
        .join("/robots.txt")
        .ok()
        .map(|u| u.to_string())
}
