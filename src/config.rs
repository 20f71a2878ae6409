use std::sync::Arc;

use url::Url;

use crate::{Error, EventBus, MessagingExtension, ReevaluationPolicy, Result, RuleEngine};

/// Configuration for [`MessagingExtension`].
#[derive(Debug, Clone)]
pub struct MessagingConfig {
    pub(crate) app_id: String,
    pub(crate) surface_paths: Vec<String>,
    pub(crate) reevaluation_policy: ReevaluationPolicy,
}

impl MessagingConfig {
    /// URI scheme of app surfaces.
    pub const SURFACE_SCHEME: &'static str = "mobileapp";

    /// Create a configuration requesting propositions for the app-wide surface of `app_id`.
    ///
    /// ```
    /// # use inapp_messaging::MessagingConfig;
    /// let config = MessagingConfig::from_app_id("com.example.app");
    /// assert_eq!(config.surfaces().unwrap(), vec!["mobileapp://com.example.app"]);
    /// ```
    pub fn from_app_id(app_id: impl Into<String>) -> MessagingConfig {
        MessagingConfig {
            app_id: app_id.into(),
            surface_paths: Vec::new(),
            reevaluation_policy: ReevaluationPolicy::default(),
        }
    }

    /// Also request propositions for the surface at `path` under the app surface.
    ///
    /// ```
    /// # use inapp_messaging::MessagingConfig;
    /// let config = MessagingConfig::from_app_id("com.example.app").with_surface("feeds/promos");
    /// assert_eq!(
    ///     config.surfaces().unwrap(),
    ///     vec!["mobileapp://com.example.app", "mobileapp://com.example.app/feeds/promos"],
    /// );
    /// ```
    pub fn with_surface(mut self, path: impl Into<String>) -> MessagingConfig {
        self.surface_paths.push(path.into());
        self
    }

    /// Choose what happens to pending re-evaluations when a refresh fails.
    ///
    /// Defaults to [`ReevaluationPolicy::OnSuccess`].
    pub fn with_reevaluation_policy(mut self, policy: ReevaluationPolicy) -> MessagingConfig {
        self.reevaluation_policy = policy;
        self
    }

    /// Resolve every configured surface to its full URI.
    ///
    /// # Errors
    ///
    /// - [`Error::NoSurfaces`] if the app id is empty.
    /// - [`Error::InvalidSurface`] if a surface does not form a valid URI.
    pub fn surfaces(&self) -> Result<Vec<String>> {
        let app_id = self.app_id.trim();
        if app_id.is_empty() {
            return Err(Error::NoSurfaces);
        }

        let base = Url::parse(&format!("{}://{}", Self::SURFACE_SCHEME, app_id))
            .map_err(Error::InvalidSurface)?;

        let mut surfaces = vec![base.as_str().trim_end_matches('/').to_owned()];
        for path in &self.surface_paths {
            let path = path.trim_matches('/');
            if path.is_empty() {
                log::warn!(target: "messaging", "ignoring empty surface path");
                continue;
            }
            let surface = Url::parse(&format!("{}/{}", surfaces[0], path))
                .map_err(Error::InvalidSurface)?;
            if !surfaces.iter().any(|known| known == surface.as_str()) {
                surfaces.push(surface.as_str().to_owned());
            }
        }
        Ok(surfaces)
    }

    /// Create a new [`MessagingExtension`] using this configuration and the host collaborators.
    ///
    /// # Errors
    ///
    /// Fails if surfaces cannot be resolved, see [`MessagingConfig::surfaces`].
    pub fn to_extension(
        self,
        event_bus: Arc<dyn EventBus + Send + Sync>,
        rule_engine: Arc<dyn RuleEngine + Send + Sync>,
    ) -> Result<Arc<MessagingExtension>> {
        MessagingExtension::new(self, event_bus, rule_engine)
    }
}
