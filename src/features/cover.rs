//! High-resolution cover resolution
//!
//! The embedded player shows artwork through a Meting proxy at whatever
//! size the proxy picked. This module swaps in a direct NetEase CDN URL at
//! full size, trying in order:
//! 1. A URL already resolved for this track
//! 2. A URL built from the picture id (see `api::Crypto`)
//! 3. Following the proxy's redirect to the CDN
//! 4. Asking Meting for the song's artwork
//!
//! Failures leave the current image alone.

pub mod url;

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::rc::Rc;

use anyhow::Result;
use tracing::debug;

use crate::api::{MetingClient, build_asset_url, build_meting_url};
use crate::error::WidgetError;
use crate::host::CoverSurface;
use crate::settings::CoverSettings;

pub use url::{ProxyPic, extract_css_url, is_asset_url, parse_proxy_pic, upgrade_resolution};

/// Network side of cover resolution
pub trait CoverFetcher {
    /// Load an image and report the address it finally came from
    fn resolve_image(&self, url: &str) -> impl Future<Output = Result<String>>;
    /// Query song metadata and return its artwork URL, if it has one
    fn song_pic(&self, url: &str) -> impl Future<Output = Result<Option<String>>>;
}

impl CoverFetcher for MetingClient {
    async fn resolve_image(&self, url: &str) -> Result<String> {
        MetingClient::resolve_image(self, url).await
    }

    async fn song_pic(&self, url: &str) -> Result<Option<String>> {
        MetingClient::song_pic(self, url).await
    }
}

/// One cover to resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverRequest {
    /// Cache key: the song id when known, otherwise the picture id
    pub key: String,
    /// The proxy URL currently shown
    pub proxy_url: String,
    pub pic_id: Option<String>,
    pub song_id: Option<String>,
}

impl CoverRequest {
    /// Build a request for a proxy URL, or `None` if it isn't one
    pub fn from_proxy_url(
        proxy_url: &str,
        song_id: Option<String>,
        settings: &CoverSettings,
    ) -> Option<Self> {
        let ProxyPic { pic_id } = parse_proxy_pic(proxy_url, &settings.proxy_hosts)?;
        let song_id = song_id.filter(|id| !id.trim().is_empty());
        let key = song_id.clone().or_else(|| pic_id.clone())?;
        Some(Self {
            key,
            proxy_url: proxy_url.trim().to_string(),
            pic_id,
            song_id,
        })
    }
}

/// How a resolution ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Served from the cache (`None` if an earlier lookup came up empty)
    Cached(Option<String>),
    /// Another resolution for the key is running
    InFlight,
    /// Built from the picture id
    Direct(String),
    /// Followed the proxy to the CDN
    Redirected(String),
    /// Found through a metadata lookup
    LookedUp(String),
    Unresolved,
}

#[derive(Debug, Default)]
struct CoverState {
    /// `None` marks a key whose lookup found nothing
    cache: HashMap<String, Option<String>>,
    in_flight: HashSet<String>,
    /// Keys whose diagnostics were already logged
    logged: HashSet<String>,
}

/// Removes a key from the in-flight set however the resolution ends
struct InFlightGuard {
    state: Rc<RefCell<CoverState>>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.state.borrow_mut().in_flight.remove(&self.key);
    }
}

enum Claim {
    Cached(Option<String>),
    Busy,
    Claimed(InFlightGuard),
}

/// Cover resolver with a per-key cache and in-flight de-duplication
#[derive(Clone)]
pub struct CoverResolver<F> {
    fetcher: F,
    settings: Rc<CoverSettings>,
    debug: bool,
    state: Rc<RefCell<CoverState>>,
}

impl<F: CoverFetcher> CoverResolver<F> {
    pub fn new(fetcher: F, settings: CoverSettings, debug: bool) -> Self {
        Self {
            fetcher,
            settings: Rc::new(settings),
            debug,
            state: Rc::new(RefCell::new(CoverState::default())),
        }
    }

    pub fn settings(&self) -> &CoverSettings {
        &self.settings
    }

    /// Cached URL for `key`; `Some(None)` if the key is known to have none
    pub fn cached(&self, key: &str) -> Option<Option<String>> {
        self.state.borrow().cache.get(key).cloned()
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.state.borrow().in_flight.contains(key)
    }

    /// Upgrade whatever the surface shows right now and work out whether a
    /// full resolution is worth running.
    pub fn prepare(
        &self,
        surface: &impl CoverSurface,
        song_id: Option<String>,
    ) -> Option<CoverRequest> {
        let target = &self.settings.target_size;

        if let Some(src) = surface.image_src() {
            let upgraded = upgrade_resolution(&src, target);
            if !upgraded.is_empty() && upgraded != src {
                surface.set_image_src(&upgraded);
            }
        }

        let raw = extract_css_url(&surface.background_image()?)?;
        let upgraded = upgrade_resolution(&raw, target);
        if !upgraded.is_empty() && upgraded != raw {
            surface.set_background_image(&upgraded);
        }

        CoverRequest::from_proxy_url(&raw, song_id, &self.settings)
    }

    /// Resolve a cover and apply it to `surface`
    pub async fn resolve(
        &self,
        request: &CoverRequest,
        surface: &impl CoverSurface,
    ) -> Resolution {
        self.log_once(request);

        let _guard = match self.claim(&request.key) {
            Claim::Cached(url) => {
                if let Some(url) = &url {
                    apply(surface, url);
                }
                return Resolution::Cached(url);
            }
            Claim::Busy => return Resolution::InFlight,
            Claim::Claimed(guard) => guard,
        };

        if let Some(url) = request
            .pic_id
            .as_deref()
            .and_then(|id| build_asset_url(&self.settings.asset_host, id, &self.settings.target_size))
        {
            self.store(&request.key, Some(url.clone()));
            apply(surface, &url);
            return Resolution::Direct(url);
        }

        if let Some(url) = self.follow_proxy(request).await {
            self.store(&request.key, Some(url.clone()));
            apply(surface, &url);
            return Resolution::Redirected(url);
        }

        match self.lookup(request).await {
            Some(Some(url)) => {
                self.store(&request.key, Some(url.clone()));
                apply(surface, &url);
                Resolution::LookedUp(url)
            }
            Some(None) => {
                // Remember the miss so repeated mutations don't refetch
                self.store(&request.key, None);
                Resolution::Unresolved
            }
            None => Resolution::Unresolved,
        }
    }

    fn claim(&self, key: &str) -> Claim {
        let mut state = self.state.borrow_mut();
        if let Some(url) = state.cache.get(key) {
            return Claim::Cached(url.clone());
        }
        if !state.in_flight.insert(key.to_string()) {
            return Claim::Busy;
        }
        Claim::Claimed(InFlightGuard {
            state: self.state.clone(),
            key: key.to_string(),
        })
    }

    fn store(&self, key: &str, url: Option<String>) {
        self.state.borrow_mut().cache.insert(key.to_string(), url);
    }

    async fn follow_proxy(&self, request: &CoverRequest) -> Option<String> {
        let busted = url::with_cache_buster(
            &request.proxy_url,
            chrono::Utc::now().timestamp_millis(),
        );
        match self.fetcher.resolve_image(&busted).await {
            Ok(final_url) => {
                let upgraded = upgrade_resolution(&final_url, &self.settings.target_size);
                if is_asset_url(&upgraded) {
                    Some(upgraded)
                } else {
                    debug!("Proxy for {} resolved off-CDN: {}", request.key, final_url);
                    None
                }
            }
            Err(e) => {
                debug!("Proxy image for {}: {}", request.key, WidgetError::from(e));
                None
            }
        }
    }

    /// `None` if the lookup couldn't run or failed, `Some(None)` if it
    /// succeeded without artwork
    async fn lookup(&self, request: &CoverRequest) -> Option<Option<String>> {
        let song_id = request.song_id.as_deref()?;
        let template = self.settings.meting_api.as_deref()?;
        let url = build_meting_url(template, &self.settings.server, "song", song_id)?;

        match self.fetcher.song_pic(&url).await {
            Ok(pic) => Some(
                pic.map(|pic| upgrade_resolution(&pic, &self.settings.target_size))
                    .filter(|pic| !pic.is_empty()),
            ),
            Err(e) => {
                debug!("Metadata lookup for song {}: {}", song_id, WidgetError::from(e));
                None
            }
        }
    }

    fn log_once(&self, request: &CoverRequest) {
        if !self.debug || !self.state.borrow_mut().logged.insert(request.key.clone()) {
            return;
        }
        debug!(
            "Cover raw={} song_id={:?} pic_id={:?} key={}",
            request.proxy_url, request.song_id, request.pic_id, request.key
        );
    }
}

fn apply(surface: &impl CoverSurface, url: &str) {
    if surface.is_attached() {
        surface.set_background_image(url);
    } else {
        debug!("Cover surface detached, dropping {}", url);
    }
}
