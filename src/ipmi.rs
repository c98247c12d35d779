use tracing::{debug, instrument, trace};

use crate::ravello::Application;

const ADDR_KEY: &str = "ipmiaddr:";
const PASSWORD_KEY: &str = "ipmipw:";

/// IPMI settings embedded in a VM description, one `key:value` per line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IpmiSettings {
    pub(crate) address: String,
    pub(crate) password: String,
}

impl IpmiSettings {
    /// Scan a free-text description for `ipmiaddr:` and `ipmipw:` lines.
    /// Markers must start the line; a repeated key takes the last line's value.
    pub fn parse(description: &str) -> Self {
        let mut settings = IpmiSettings::default();

        for line in description.lines() {
            if line.starts_with(ADDR_KEY) {
                settings.address = value_after_colon(line);
            } else if line.starts_with(PASSWORD_KEY) {
                settings.password = value_after_colon(line);
            }
        }

        settings
    }

    pub fn is_complete(&self) -> bool {
        !self.address.is_empty() && !self.password.is_empty()
    }
}

fn value_after_colon(line: &str) -> String {
    line.split_once(':')
        .map(|(_, value)| value.trim().to_string())
        .unwrap_or_default()
}

/// One emulated BMC to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BmcTarget {
    pub(crate) app_name: String,
    pub(crate) vm_name: String,
    pub(crate) address: String,
    pub(crate) password: String,
}

/// Pick the VMs that carry complete IPMI settings, ordered by VM name.
#[instrument(skip(app), fields(app = %app.name))]
pub fn plan_targets(app: &Application) -> Vec<BmcTarget> {
    let mut vms: Vec<_> = app.vms().iter().collect();
    vms.sort_by(|a, b| a.name.cmp(&b.name));

    let mut targets = Vec::new();
    for vm in vms {
        let Some(description) = vm.description.as_deref() else {
            trace!("VM {} has no description", vm.name);
            continue;
        };

        let settings = IpmiSettings::parse(description);
        if !settings.is_complete() {
            debug!("Skipping VM {}: no IPMI settings in description", vm.name);
            continue;
        }

        targets.push(BmcTarget {
            app_name: app.name.clone(),
            vm_name: vm.name.clone(),
            address: settings.address,
            password: settings.password,
        });
    }

    targets
}
