//! Typed resource families.
//!
//! The set of supported resources is closed: [`ResourceKind`] enumerates them and each
//! has a wrapper type generated by `resource_type!`. Wrappers add convenience methods
//! but always go through the generic [`ResourceCollection`] primitives.

use crate::collection::{ListQuery, ResourceCollection};
use crate::response::Response;
use crate::transport::Transport;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use triton_core::{Error, QueryParams};

/// Resource families exposed by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Instance sizes
    Packages,
    /// Compute instances
    Machines,
    /// SSH keys of the account
    Keys,
    /// Machine images
    Images,
    /// Datacenters of the cloud
    Datacenters,
    /// Networks visible to the account
    Networks,
    /// Firewall rules
    FirewallRules,
    /// Sub-users of the account
    Users,
}

impl ResourceKind {
    /// Path segment under the account prefix.
    #[must_use]
    pub const fn segment(&self) -> &'static str {
        match self {
            Self::Packages => "packages",
            Self::Machines => "machines",
            Self::Keys => "keys",
            Self::Images => "images",
            Self::Datacenters => "datacenters",
            Self::Networks => "networks",
            Self::FirewallRules => "fwrules",
            Self::Users => "users",
        }
    }

    /// Returns all resource kinds.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Packages,
            Self::Machines,
            Self::Keys,
            Self::Images,
            Self::Datacenters,
            Self::Networks,
            Self::FirewallRules,
            Self::Users,
        ]
    }

    /// Bind a generic collection to this kind.
    #[must_use]
    pub fn collection(&self, transport: Arc<dyn Transport>) -> ResourceCollection {
        ResourceCollection::new(self.segment(), transport)
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "packages" => Ok(Self::Packages),
            "machines" | "instances" => Ok(Self::Machines),
            "keys" => Ok(Self::Keys),
            "images" => Ok(Self::Images),
            "datacenters" => Ok(Self::Datacenters),
            "networks" => Ok(Self::Networks),
            "fwrules" | "firewall_rules" => Ok(Self::FirewallRules),
            "users" => Ok(Self::Users),
            _ => Err(Error::InvalidRequest(format!("Unknown resource kind: {s}"))),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segment())
    }
}

/// Macro to generate a typed wrapper around [`ResourceCollection`].
macro_rules! resource_type {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            inner: ResourceCollection,
        }

        impl $name {
            /// Resource family of this wrapper.
            pub const KIND: ResourceKind = $kind;

            /// Bind to a transport.
            #[must_use]
            pub fn new(transport: Arc<dyn Transport>) -> Self {
                Self {
                    inner: Self::KIND.collection(transport),
                }
            }

            /// The underlying generic collection.
            #[must_use]
            pub const fn collection(&self) -> &ResourceCollection {
                &self.inner
            }

            /// List all items, optionally filtered.
            ///
            /// # Errors
            ///
            /// Propagates transport failures.
            pub async fn all(&self, query: &ListQuery) -> Result<Response> {
                self.inner.all(query).await
            }

            /// Fetch one item.
            ///
            /// # Errors
            ///
            /// Fails on an invalid identifier or a transport failure.
            pub async fn read(&self, id: impl AsRef<str>) -> Result<Response> {
                self.inner.read(id).await
            }

            /// Create an item.
            ///
            /// # Errors
            ///
            /// Fails on unserializable attributes or a transport failure.
            pub async fn create<B>(&self, attrs: &B) -> Result<Response>
            where
                B: Serialize + ?Sized,
            {
                self.inner.create(attrs).await
            }

            /// Update an item.
            ///
            /// # Errors
            ///
            /// Fails on invalid input or a transport failure.
            pub async fn update<B>(&self, id: impl AsRef<str>, attrs: &B) -> Result<Response>
            where
                B: Serialize + ?Sized,
            {
                self.inner.update(id, attrs).await
            }

            /// Delete an item.
            ///
            /// # Errors
            ///
            /// Fails on an invalid identifier or a transport failure.
            pub async fn delete(&self, id: impl AsRef<str>) -> Result<Response> {
                self.inner.delete(id).await
            }
        }
    };
}

resource_type!(
    /// Packages (instance sizes). Items can be read by name or id.
    Packages,
    ResourceKind::Packages
);

resource_type!(
    /// Compute instances.
    Machines,
    ResourceKind::Machines
);

resource_type!(
    /// SSH public keys registered with the account.
    Keys,
    ResourceKind::Keys
);

resource_type!(
    /// Machine images.
    Images,
    ResourceKind::Images
);

resource_type!(
    /// Datacenters; the listing maps names to URLs.
    Datacenters,
    ResourceKind::Datacenters
);

resource_type!(
    /// Networks.
    Networks,
    ResourceKind::Networks
);

resource_type!(
    /// Firewall rules.
    FirewallRules,
    ResourceKind::FirewallRules
);

resource_type!(
    /// Account sub-users.
    Users,
    ResourceKind::Users
);

impl Machines {
    /// Boot a stopped machine.
    ///
    /// # Errors
    ///
    /// Fails on an invalid identifier or a transport failure.
    pub async fn start(&self, id: impl AsRef<str>) -> Result<Response> {
        self.inner.action(id, "start", &QueryParams::new()).await
    }

    /// Shut a machine down.
    ///
    /// # Errors
    ///
    /// Fails on an invalid identifier or a transport failure.
    pub async fn stop(&self, id: impl AsRef<str>) -> Result<Response> {
        self.inner.action(id, "stop", &QueryParams::new()).await
    }

    /// Reboot a machine.
    ///
    /// # Errors
    ///
    /// Fails on an invalid identifier or a transport failure.
    pub async fn reboot(&self, id: impl AsRef<str>) -> Result<Response> {
        self.inner.action(id, "reboot", &QueryParams::new()).await
    }

    /// Move a machine to another package.
    ///
    /// # Errors
    ///
    /// Fails on an invalid identifier or a transport failure.
    pub async fn resize(&self, id: impl AsRef<str>, package: &str) -> Result<Response> {
        let params = QueryParams::new().with("package", package);
        self.inner.action(id, "resize", &params).await
    }

    /// Change a machine's alias.
    ///
    /// # Errors
    ///
    /// Fails on an invalid identifier or a transport failure.
    pub async fn rename(&self, id: impl AsRef<str>, name: &str) -> Result<Response> {
        let params = QueryParams::new().with("name", name);
        self.inner.action(id, "rename", &params).await
    }

    /// Turn the machine's firewall on.
    ///
    /// # Errors
    ///
    /// Fails on an invalid identifier or a transport failure.
    pub async fn enable_firewall(&self, id: impl AsRef<str>) -> Result<Response> {
        self.inner
            .action(id, "enable_firewall", &QueryParams::new())
            .await
    }

    /// Turn the machine's firewall off.
    ///
    /// # Errors
    ///
    /// Fails on an invalid identifier or a transport failure.
    pub async fn disable_firewall(&self, id: impl AsRef<str>) -> Result<Response> {
        self.inner
            .action(id, "disable_firewall", &QueryParams::new())
            .await
    }

    /// Tags of one machine. `PUT` replaces the full tag set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] for a bad `id`.
    pub fn tags(&self, id: impl AsRef<str>) -> Result<ResourceCollection> {
        self.inner.nested(id, "tags")
    }

    /// Metadata of one machine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] for a bad `id`.
    pub fn metadata(&self, id: impl AsRef<str>) -> Result<ResourceCollection> {
        self.inner.nested(id, "metadata")
    }

    /// Snapshots of one machine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] for a bad `id`.
    pub fn snapshots(&self, id: impl AsRef<str>) -> Result<ResourceCollection> {
        self.inner.nested(id, "snapshots")
    }
}

impl FirewallRules {
    /// Enable a rule.
    ///
    /// # Errors
    ///
    /// Fails on an invalid identifier or a transport failure.
    pub async fn enable(&self, id: impl AsRef<str>) -> Result<Response> {
        self.inner.invoke(id, "enable").await
    }

    /// Disable a rule.
    ///
    /// # Errors
    ///
    /// Fails on an invalid identifier or a transport failure.
    pub async fn disable(&self, id: impl AsRef<str>) -> Result<Response> {
        self.inner.invoke(id, "disable").await
    }
}
