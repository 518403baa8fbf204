//! CLI flags shared across subcommands.

mod globals;
pub use globals::GlobalArgs;

mod scheme;
pub use scheme::SchemeArgs;

mod run;
pub use run::RunArgs;
