//! Key scheme flags.

use anyhow::bail;
use clap::Args;
use ferry_replica::{KeyBytes, KeyLayout, KeyScheme};

/// Selects the key scheme a store is read with.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemeArgs {
    /// Key layout of the store: byte-prefix, ascii-number-first or ascii-hash-first.
    #[arg(long, env = "FERRY_LAYOUT")]
    pub layout: Option<KeyLayout>,
    /// Namespace prepended to every block key, as `0x` hex or plain ASCII.
    #[arg(long, env = "FERRY_NAMESPACE")]
    pub namespace: Option<KeyBytes>,
}

impl SchemeArgs {
    /// Builds the scheme, filling unset flags from `base`.
    pub fn resolve(&self, base: Option<&KeyScheme>) -> anyhow::Result<KeyScheme> {
        let Some(layout) = self.layout.or(base.map(|scheme| scheme.layout)) else {
            bail!("a key layout is required: pass --layout or a config file with a [scheme] table");
        };
        let namespace = self
            .namespace
            .clone()
            .or_else(|| base.map(|scheme| scheme.namespace.clone()))
            .unwrap_or_default();
        Ok(KeyScheme { layout, namespace })
    }
}
