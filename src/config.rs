use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_VM_JSON: &str = "/etc/ravello/vm.json";
pub const DEFAULT_API_URL: &str = "https://cloud.ravellosystems.com/api/v1";
pub const DEFAULT_INTERFACE: &str = "eth0";
pub const DEFAULT_BMC_PATH: &str = "/usr/local/bin/ravellobmc.py";
pub const DEFAULT_IP_PATH: &str = "/usr/sbin/ip";
pub const DEFAULT_PKILL_PATH: &str = "/usr/bin/pkill";

/// Start one emulated BMC per VM of the current Ravello application.
#[derive(Parser, Debug)]
#[command(name = "ravellobmc-wrap", version)]
pub struct Cli {
    /// Ephemeral token used against the Ravello API
    pub token: Option<String>,

    /// Ignored, like any argument after the token
    #[arg(num_args = 1.., trailing_var_arg = true, hide = true)]
    pub extra: Vec<String>,

    /// Local VM identity file carrying the application id
    #[arg(long, env = "RAVELLO_VM_JSON", default_value = DEFAULT_VM_JSON)]
    pub vm_json: PathBuf,

    /// Base URL of the Ravello REST API
    #[arg(long, env = "RAVELLO_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Interface that receives the IPMI addresses
    #[arg(long, env = "RAVELLO_BMC_INTERFACE", default_value = DEFAULT_INTERFACE)]
    pub interface: String,

    /// Path of the BMC emulator
    #[arg(long, env = "RAVELLO_BMC_PATH", default_value = DEFAULT_BMC_PATH)]
    pub bmc_path: PathBuf,

    /// Path of the ip(8) binary
    #[arg(long, default_value = DEFAULT_IP_PATH)]
    pub ip_path: PathBuf,

    /// Path of the pkill(1) binary
    #[arg(long, default_value = DEFAULT_PKILL_PATH)]
    pub pkill_path: PathBuf,

    /// Pass --debug to every BMC emulator
    #[arg(long)]
    pub bmc_debug: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) token: String,
    pub(crate) vm_json: PathBuf,
    pub(crate) api_url: String,
    pub(crate) interface: String,
    pub(crate) bmc_path: PathBuf,
    pub(crate) ip_path: PathBuf,
    pub(crate) pkill_path: PathBuf,
    pub(crate) bmc_debug: bool,
}

impl Config {
    /// Build the run configuration; `None` when no token was given.
    pub fn from_cli(cli: Cli) -> Option<Self> {
        let token = cli.token.filter(|t| !t.is_empty())?;

        Some(Config {
            token,
            vm_json: cli.vm_json,
            api_url: cli.api_url,
            interface: cli.interface,
            bmc_path: cli.bmc_path,
            ip_path: cli.ip_path,
            pkill_path: cli.pkill_path,
            bmc_debug: cli.bmc_debug,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            token: String::new(),
            vm_json: PathBuf::from(DEFAULT_VM_JSON),
            api_url: DEFAULT_API_URL.to_string(),
            interface: DEFAULT_INTERFACE.to_string(),
            bmc_path: PathBuf::from(DEFAULT_BMC_PATH),
            ip_path: PathBuf::from(DEFAULT_IP_PATH),
            pkill_path: PathBuf::from(DEFAULT_PKILL_PATH),
            bmc_debug: false,
        }
    }
}
