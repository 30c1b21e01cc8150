//! Port command handlers.

use std::sync::Arc;

use tabled::Tabled;
use tokio_util::sync::CancellationToken;

use metalport_core::plan::PlannedStep;
use metalport_core::{
    Action, ClientConfig, DesiredPortConfig, MetalService, Plan, Port, PortDeclaration, PortId,
    ReconcileOptions, Reconciler, ResetReport, snapshot,
};

use crate::cli::{
    DeclarationArgs, GlobalOpts, OutputFormat, PortArgs, PortCommand, ReleaseArgs,
};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "Stage")]
    stage: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "VLAN")]
    vlan: String,
}

impl From<&PlannedStep> for StepRow {
    fn from(step: &PlannedStep) -> Self {
        let (action, vlan) = describe(&step.action);
        Self {
            stage: step.stage.to_string(),
            action: action.into(),
            vlan: vlan.unwrap_or_default(),
        }
    }
}

fn describe(action: &Action) -> (&'static str, Option<String>) {
    match action {
        Action::ClearNativeVlan => ("clear native VLAN", None),
        Action::DetachVlan(v) => ("detach", Some(v.to_string())),
        Action::Disbond => ("disbond", None),
        Action::ConvertToLayer2 => ("convert to layer2", None),
        Action::Bond => ("bond", None),
        Action::ConvertToLayer3 => ("convert to layer3", None),
        Action::AttachVlan(v) => ("attach", Some(v.to_string())),
        Action::SetNativeVlan(v) => ("set native VLAN", Some(v.to_string())),
    }
}

fn port_detail(p: &Port) -> String {
    let vlans = if p.vlans.is_empty() {
        "-".to_owned()
    } else {
        p.vlans
            .iter()
            .map(|v| match v.vxlan {
                Some(tag) => format!("{} (vxlan {tag})", v.id),
                None => v.id.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    };
    let opt = |s: Option<String>| s.unwrap_or_else(|| "-".into());

    output::detail(&[
        ("ID", p.id.to_string()),
        ("Name", p.name.clone()),
        ("Type", p.port_type.to_string()),
        ("Network", opt(p.network_type.map(|t| t.to_string()))),
        ("Bonded", p.bonded.to_string()),
        ("Layer2", opt(p.layer2_flag().map(|l2| l2.to_string()))),
        ("Native VLAN", opt(p.native_vlan.as_ref().map(ToString::to_string))),
        ("VLANs", vlans),
        ("Bond", opt(p.bond.as_ref().map(|b| format!("{} ({})", b.name, b.id)))),
        ("MAC", opt(p.mac.as_ref().map(ToString::to_string))),
    ])
}

fn print_port(port: &Port, global: &GlobalOpts) {
    let out = output::render_single(&global.output, port, port_detail, |p| p.id.to_string());
    output::print_output(&out, global.quiet);
}

// ── Declarations ────────────────────────────────────────────────────

fn declaration(args: DeclarationArgs) -> Result<PortDeclaration, CliError> {
    if let Some(path) = args.file {
        let raw = std::fs::read_to_string(&path)?;
        return Ok(toml::from_str(&raw)?);
    }
    let bonded = args.bonded.ok_or_else(|| CliError::Validation {
        field: "bonded".into(),
        reason: "--bonded is required without --file".into(),
    })?;
    Ok(PortDeclaration {
        bonded,
        layer2: args.layer2,
        native_vlan_id: args.native_vlan,
        vlan_ids: args.vlan,
        vxlan_ids: args.vxlan,
        reset_on_delete: args.reset_on_delete,
    })
}

fn desired(args: DeclarationArgs) -> Result<DesiredPortConfig, CliError> {
    Ok(DesiredPortConfig::try_from(declaration(args)?)?)
}

fn release_policy(args: ReleaseArgs) -> Result<DesiredPortConfig, CliError> {
    let declaration: PortDeclaration = match args.file {
        Some(path) => toml::from_str(&std::fs::read_to_string(&path)?)?,
        None => PortDeclaration {
            reset_on_delete: args.reset_on_delete,
            ..PortDeclaration::default()
        },
    };
    Ok(DesiredPortConfig::try_from(declaration)?)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    service: Arc<MetalService>,
    config: &ClientConfig,
    cancel: CancellationToken,
    args: PortArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let reconciler = Reconciler::with_options(
        service.clone(),
        ReconcileOptions {
            timeout: Some(config.reconcile_timeout),
            vlan_scope: config.vlan_scope(),
            cancel,
        },
    );

    match args.command {
        PortCommand::Show { port_id } => {
            let snap = snapshot::fetch(&*service, &PortId::from(port_id)).await?;
            print_port(&snap.port, global);
            Ok(())
        }

        PortCommand::Plan {
            port_id,
            declaration,
        } => {
            let plan: Plan = reconciler
                .plan(&PortId::from(port_id), desired(declaration)?)
                .await?;
            if plan.is_empty() {
                output::status("Port already matches the declaration", global.quiet);
            }
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain if plan.is_empty() => String::new(),
                OutputFormat::Table | OutputFormat::Plain => output::render_list(
                    &global.output,
                    &plan.steps,
                    |s| StepRow::from(s),
                    |s| s.stage.to_string(),
                ),
                _ => output::render_single(&global.output, &plan, |_| String::new(), |_| {
                    String::new()
                }),
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PortCommand::Apply {
            port_id,
            declaration,
        } => {
            let port = reconciler
                .converge(&PortId::from(port_id), desired(declaration)?)
                .await?;
            output::status("Port converged", global.quiet);
            print_port(&port, global);
            Ok(())
        }

        PortCommand::Reset { port_id } => {
            if !util::confirm(
                &format!("Reset port {port_id} to bonded layer3 and detach all VLANs?"),
                "port reset",
                global.yes,
            )? {
                return Ok(());
            }
            let report = reconciler.reset_to_defaults(&PortId::from(port_id)).await?;
            print_reset(&report, global);
            Ok(())
        }

        PortCommand::Release { port_id, release } => {
            let desired = release_policy(release)?;
            if desired.reset_on_delete
                && !util::confirm(
                    &format!("Release port {port_id} and reset it to bonded layer3 with no VLANs?"),
                    "port release",
                    global.yes,
                )?
            {
                return Ok(());
            }
            match reconciler.release(&PortId::from(port_id), &desired).await? {
                Some(report) => print_reset(&report, global),
                None => output::status("Port released; left as it is", global.quiet),
            }
            Ok(())
        }
    }
}

fn print_reset(report: &ResetReport, global: &GlobalOpts) {
    match (&report.port, report.warnings.len()) {
        (None, _) => output::status("Port no longer accessible; nothing to reset", global.quiet),
        (Some(_), 0) => output::status("Port reset to defaults", global.quiet),
        (Some(_), n) => output::status(
            &format!("Port reset finished with {n} warning(s)"),
            global.quiet,
        ),
    }
    let out = output::render_single(
        &global.output,
        report,
        |r| r.port.as_ref().map(port_detail).unwrap_or_default(),
        |r| r.port.as_ref().map(|p| p.id.to_string()).unwrap_or_default(),
    );
    output::print_output(&out, global.quiet);
}
