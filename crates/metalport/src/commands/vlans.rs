//! VLAN command handlers.

use std::sync::Arc;

use tabled::Tabled;

use metalport_core::{ClientConfig, MetalService, NewVlan, Vlan, VlanId, VlanManager, VlanScope};

use crate::cli::{GlobalOpts, VlanArgs, VlanCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct VlanRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "VXLAN")]
    vxlan: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&Vlan> for VlanRow {
    fn from(v: &Vlan) -> Self {
        Self {
            id: v.id.to_string(),
            vxlan: v.vxlan.map(|t| t.to_string()).unwrap_or_default(),
            location: v.location.as_ref().map(ToString::to_string).unwrap_or_default(),
            description: v.description.clone().unwrap_or_default(),
        }
    }
}

fn vlan_detail(v: &Vlan) -> String {
    let opt = |s: Option<String>| s.unwrap_or_else(|| "-".into());
    output::detail(&[
        ("ID", v.id.to_string()),
        ("VXLAN", opt(v.vxlan.map(|t| t.to_string()))),
        ("Location", opt(v.location.as_ref().map(ToString::to_string))),
        ("Project", opt(v.project_id.clone())),
        ("Description", opt(v.description.clone())),
        ("Created", opt(v.created_at.map(|t| t.to_rfc3339()))),
    ])
}

fn require_scope(config: &ClientConfig) -> Result<VlanScope, CliError> {
    config.vlan_scope().ok_or_else(|| CliError::Validation {
        field: "project".into(),
        reason: "a project is required (--project or the profile's `project`)".into(),
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    service: Arc<MetalService>,
    config: &ClientConfig,
    args: VlanArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let manager = VlanManager::new(service.clone(), service);

    match args.command {
        VlanCommand::List => {
            let scope = require_scope(config)?;
            let vlans = manager.list(&scope).await?;
            let out = output::render_list(
                &global.output,
                &vlans,
                |v| VlanRow::from(v),
                |v| v.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        VlanCommand::Show { id } => {
            let vlan = manager
                .get(&VlanId::from(id.as_str()))
                .await?
                .ok_or_else(|| CliError::NotFound {
                    resource_type: "virtual network".into(),
                    identifier: id,
                })?;
            let out = output::render_single(&global.output, &vlan, vlan_detail, |v| {
                v.id.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        VlanCommand::Create {
            description,
            facility,
            vxlan,
        } => {
            let scope = require_scope(config)?;
            // A facility VLAN has no metro, whatever the profile says.
            let metro = if facility.is_some() { None } else { scope.metro };
            let vlan = manager
                .create(NewVlan {
                    project_id: scope.project_id,
                    description,
                    metro,
                    facility,
                    vxlan,
                })
                .await?;
            output::status(&format!("VLAN {} created", vlan.id), global.quiet);
            let out = output::render_single(&global.output, &vlan, vlan_detail, |v| {
                v.id.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        VlanCommand::Delete { id } => {
            if !util::confirm(
                &format!("Detach VLAN {id} from every port and delete it?"),
                "vlan delete",
                global.yes,
            )? {
                return Ok(());
            }
            let detached = manager.delete(&VlanId::from(id.as_str())).await?;
            output::status(
                &format!("VLAN {id} deleted (detached from {} port(s))", detached.len()),
                global.quiet,
            );
            let out = output::render_list(
                &global.output,
                &detached,
                |p| DetachedRow { port: p.to_string() },
                ToString::to_string,
            );
            if !detached.is_empty() {
                output::print_output(&out, global.quiet);
            }
            Ok(())
        }
    }
}

#[derive(Tabled)]
struct DetachedRow {
    #[tabled(rename = "Detached from port")]
    port: String,
}
