//! A conversion session: configuration plus the transport and resolver
//! every fetch goes through.
//!
//! Cloning a `Session` is cheap (two `Arc`s and the config) and clones share
//! the same HTTP connection pool, so batch workers each take their own clone.

use crate::config::ConversionConfig;
use crate::error::Html2MdError;
use crate::pipeline::fetch::{HttpTransport, ReqwestTransport};
use crate::pipeline::resolve::{HostResolver, SystemResolver};
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct Session {
    config: ConversionConfig,
    transport: Arc<dyn HttpTransport>,
    resolver: Arc<dyn HostResolver>,
}

impl Session {
    /// Build a session with the reqwest transport and the system resolver.
    pub fn new(config: ConversionConfig) -> Result<Self, Html2MdError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self {
            config,
            transport: Arc::new(transport),
            resolver: Arc::new(SystemResolver),
        })
    }

    /// Build a session from explicit parts. Tests use this to substitute
    /// scripted transports and resolvers.
    pub fn with_parts(
        config: ConversionConfig,
        transport: Arc<dyn HttpTransport>,
        resolver: Arc<dyn HostResolver>,
    ) -> Self {
        Self {
            config,
            transport,
            resolver,
        }
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn transport(&self) -> &dyn HttpTransport {
        self.transport.as_ref()
    }

    pub fn resolver(&self) -> &dyn HostResolver {
        self.resolver.as_ref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("transport", &"<dyn HttpTransport>")
            .field("resolver", &"<dyn HostResolver>")
            .finish()
    }
}
