//! CLI command implementations.
//!
//! Each submodule owns one `Commands` variant:
//!
//! | Module     | Commands handled |
//! |------------|------------------|
//! | `install`  | `Install`        |
//! | `releases` | `Releases`       |
//! | `clean`    | `Clean`          |

pub mod clean;
pub mod install;
pub mod releases;

pub use clean::cmd_clean;
pub use install::cmd_install;
pub use releases::cmd_releases;

use super::Cli;
use ingot::errors::InstallError;
use ingot::ingot_config::{IngotToml, Paths};

/// Load the config file and resolve the installation root for a command.
pub(crate) fn load_environment(cli: &Cli) -> Result<(IngotToml, Paths), InstallError> {
    let config = match (&cli.config, &cli.root) {
        (Some(path), _) => IngotToml::load(path)?,
        (None, Some(root)) => IngotToml::load_or_default(root)?,
        (None, None) => match dirs::home_dir() {
            Some(home) => IngotToml::load_or_default(&home.join("php"))?,
            None => IngotToml::default(),
        },
    };
    let paths = Paths::resolve(cli.root.as_deref(), &config)?;
    Ok((config, paths))
}
