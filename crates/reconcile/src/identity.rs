//! Resource identity: the immutable coordinates of a remote resource.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;

/// A resource path template such as
/// `/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.Compute/galleries/{name}`.
///
/// Placeholders are filled from caller arguments. The last placeholder is the
/// resource's own name; everything before it is the collection scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathTemplate(pub &'static str);

impl PathTemplate {
    /// Placeholder names in order of appearance.
    pub fn placeholders(&self) -> Vec<&'static str> {
        self.0
            .split('/')
            .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
            .collect()
    }

    /// Name of the placeholder that holds the resource's own name.
    #[must_use]
    pub fn name_field(&self) -> Option<&'static str> {
        self.0
            .rsplit('/')
            .next()
            .and_then(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
    }

    /// Render the full resource identity.
    ///
    /// # Errors
    ///
    /// Returns a validation error if any placeholder is missing or blank.
    pub fn render<'a>(
        &self,
        api_version: &str,
        lookup: impl Fn(&str) -> Option<&'a str>,
    ) -> Result<ResourceIdentity> {
        Ok(ResourceIdentity {
            path: self.fill(self.0, &lookup)?,
            api_version: api_version.to_string(),
        })
    }

    /// Render the collection that contains the resource.
    ///
    /// # Errors
    ///
    /// Returns a validation error if any scope placeholder is missing or blank.
    pub fn render_collection<'a>(
        &self,
        api_version: &str,
        lookup: impl Fn(&str) -> Option<&'a str>,
    ) -> Result<CollectionRef> {
        let scope = match self.name_field() {
            Some(_) => self.0.rsplit_once('/').map_or(self.0, |(scope, _)| scope),
            None => self.0,
        };
        Ok(CollectionRef {
            path: self.fill(scope, &lookup)?,
            api_version: api_version.to_string(),
        })
    }

    fn fill<'a>(
        &self,
        template: &str,
        lookup: &impl Fn(&str) -> Option<&'a str>,
    ) -> Result<String> {
        let mut path = String::with_capacity(template.len());
        for segment in template.split('/').filter(|s| !s.is_empty()) {
            path.push('/');
            match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(field) => {
                    let value = lookup(field)
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .ok_or_else(|| Error::validation(field, "required path segment is missing"))?;
                    if value.contains('/') {
                        return Err(Error::validation(field, "path segment must not contain '/'"));
                    }
                    path.push_str(value);
                }
                None => path.push_str(segment),
            }
        }
        Ok(path)
    }
}

/// Fully resolved coordinates of one remote resource.
///
/// Built once per invocation and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceIdentity {
    path: String,
    api_version: String,
}

impl ResourceIdentity {
    /// Resource path relative to the API endpoint.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// API version used for every call against this resource.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Last path segment, the resource's own name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// A collection scope to list resources from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionRef {
    path: String,
    api_version: String,
}

impl CollectionRef {
    /// Collection path relative to the API endpoint.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// API version used for listing.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_version
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}
