use clap::Subcommand;

use super::config::ConfigArgs;
use super::connect::ConnectArgs;
use super::swap::SwapArgs;

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Connect the wallet on the attached page
    Connect(ConnectArgs),

    /// Swap tokens on the attached page
    Swap(SwapArgs),

    /// Report whether the wallet on the attached page is connected
    Status,

    /// Inspect domflow configuration
    Config(ConfigArgs),
}
