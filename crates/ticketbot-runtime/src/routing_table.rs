//! Static user-email to tracker-project routing.

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("invalid user-jira pair '{0}': expected email=PROJECT")]
    MalformedPair(String),
    #[error("user-jira pair '{0}' has no email domain and no default email domain is configured")]
    MissingDomain(String),
    #[error("email '{email}' is routed to both {first} and {second}")]
    ConflictingRoute {
        email: String,
        first: String,
        second: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Read-only mapping from lower-cased user email to tracker project key.
pub struct RoutingTable {
    routes: BTreeMap<String, String>,
}

impl RoutingTable {
    /// Parses `email=PROJECT` pairs separated by commas.
    ///
    /// Bare usernames are completed with `default_email_domain`. Blank
    /// segments are ignored so trailing commas are accepted.
    pub fn parse(raw: &str, default_email_domain: Option<&str>) -> Result<Self, RoutingError> {
        let domain = default_email_domain
            .map(|value| value.trim().trim_start_matches('@'))
            .filter(|value| !value.is_empty());
        let mut routes: BTreeMap<String, String> = BTreeMap::new();
        for segment in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let Some((user, project)) = segment.split_once('=') else {
                return Err(RoutingError::MalformedPair(segment.to_string()));
            };
            let (user, project) = (user.trim(), project.trim());
            if user.is_empty() || project.is_empty() || project.contains('=') {
                return Err(RoutingError::MalformedPair(segment.to_string()));
            }
            let email = if user.contains('@') {
                user.to_ascii_lowercase()
            } else {
                let Some(domain) = domain else {
                    return Err(RoutingError::MissingDomain(segment.to_string()));
                };
                format!("{user}@{domain}").to_ascii_lowercase()
            };
            if let Some(existing) = routes.get(&email) {
                if existing != project {
                    return Err(RoutingError::ConflictingRoute {
                        email,
                        first: existing.clone(),
                        second: project.to_string(),
                    });
                }
            }
            routes.insert(email, project.to_string());
        }
        Ok(Self { routes })
    }

    pub fn project_for_email(&self, email: &str) -> Option<&str> {
        self.routes
            .get(&email.trim().to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
