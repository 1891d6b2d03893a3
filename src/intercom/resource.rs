//! Intercom resources and the methods they support

use crate::{ConnectorError, ConnectorResult};
use std::fmt;
use std::str::FromStr;

/// An Intercom resource that can be queried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Users,
    /// Leads live under the `contacts` endpoint
    Leads,
    Contacts,
    Companies,
    Admins,
    Teams,
    Tags,
    Segments,
    Conversations,
    Notes,
    Events,
}

impl Resource {
    /// Every resource, in a stable order
    pub const ALL: [Resource; 11] = [
        Resource::Users,
        Resource::Leads,
        Resource::Contacts,
        Resource::Companies,
        Resource::Admins,
        Resource::Teams,
        Resource::Tags,
        Resource::Segments,
        Resource::Conversations,
        Resource::Notes,
        Resource::Events,
    ];

    /// Name used in configuration (`intercom_obj`)
    pub fn name(&self) -> &'static str {
        match self {
            Resource::Users => "users",
            Resource::Leads => "leads",
            Resource::Contacts => "contacts",
            Resource::Companies => "companies",
            Resource::Admins => "admins",
            Resource::Teams => "teams",
            Resource::Tags => "tags",
            Resource::Segments => "segments",
            Resource::Conversations => "conversations",
            Resource::Notes => "notes",
            Resource::Events => "events",
        }
    }

    /// URL path segment, which is also the key holding list results
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Leads => "contacts",
            other => other.name(),
        }
    }

    /// Check if `method` can be called on this resource
    pub fn supports(&self, method: Method) -> bool {
        match method {
            Method::All => !matches!(self, Resource::Notes | Resource::Events),
            Method::FindAll => true,
            Method::Find => !matches!(self, Resource::Events),
            Method::Scroll => matches!(
                self,
                Resource::Users | Resource::Leads | Resource::Contacts | Resource::Companies
            ),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Resource {
    type Err = ConnectorError;

    fn from_str(s: &str) -> ConnectorResult<Self> {
        Resource::ALL
            .iter()
            .copied()
            .find(|r| r.name() == s)
            .ok_or_else(|| ConnectorError::lookup(format!("unknown Intercom resource '{}'", s)))
    }
}

/// A method callable on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Every object, following pagination
    All,
    /// One object, by `id` or by lookup arguments
    Find,
    /// Objects matching the arguments, following pagination
    FindAll,
    /// Every object through the scroll API
    Scroll,
}

impl Method {
    /// Name used in configuration (`intercom_method`)
    pub fn name(&self) -> &'static str {
        match self {
            Method::All => "all",
            Method::Find => "find",
            Method::FindAll => "find_all",
            Method::Scroll => "scroll",
        }
    }

    /// Resolve a method on a resource, failing with `Lookup` if unsupported
    pub fn resolve(resource: &str, method: &str) -> ConnectorResult<(Resource, Method)> {
        let resource: Resource = resource.parse()?;
        let method: Method = method.parse()?;
        if !resource.supports(method) {
            return Err(ConnectorError::lookup(format!(
                "resource '{}' has no method '{}'",
                resource, method
            )));
        }
        Ok((resource, method))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Method {
    type Err = ConnectorError;

    fn from_str(s: &str) -> ConnectorResult<Self> {
        match s {
            "all" => Ok(Method::All),
            "find" => Ok(Method::Find),
            "find_all" => Ok(Method::FindAll),
            "scroll" => Ok(Method::Scroll),
            other => Err(ConnectorError::lookup(format!(
                "unknown Intercom method '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_round_trip_names() {
        for resource in Resource::ALL {
            assert_eq!(resource.name().parse::<Resource>().unwrap(), resource);
        }
        assert!(matches!(
            "widgets".parse::<Resource>(),
            Err(ConnectorError::Lookup(_))
        ));
    }

    #[test]
    fn test_leads_use_contacts_endpoint() {
        assert_eq!(Resource::Leads.path(), "contacts");
        assert_eq!(Resource::Users.path(), "users");
    }

    #[test]
    fn test_method_resolution() {
        assert_eq!(
            Method::resolve("users", "all").unwrap(),
            (Resource::Users, Method::All)
        );
        assert_eq!(
            Method::resolve("companies", "scroll").unwrap(),
            (Resource::Companies, Method::Scroll)
        );

        assert!(matches!(
            Method::resolve("tags", "scroll"),
            Err(ConnectorError::Lookup(_))
        ));
        assert!(matches!(
            Method::resolve("users", "delete"),
            Err(ConnectorError::Lookup(_))
        ));
        assert!(Method::resolve("events", "find").is_err());
        assert!(Method::resolve("events", "find_all").is_ok());
    }
}
