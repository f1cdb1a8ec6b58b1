//! List, plan and verification output formatting
//!
//! Column-aligned rendering for `hostapp list`, `hostapp plan` and
//! `hostapp verify`.

use crossterm::style::Stylize;
use hostapp_schema::{Manifest, PlanItem, VerificationReport};

use super::output::{Output, format_check};

/// Print column headers for app tables
pub fn print_list_header(output: &Output) {
    let layout = &output.theme().layout;
    output.line("");
    let header = format!(
        "  {:<iw$} {:<vw$} {}",
        "id",
        "version",
        "name",
        iw = layout.id_width,
        vw = layout.version_width,
    );
    output.line(&header.dark_grey().to_string());
}

/// Print a single app row
pub fn print_list_row(output: &Output, app: &Manifest) {
    let theme = output.theme();
    let id = format!("{:<width$}", app.pid.as_str(), width = theme.layout.id_width);
    let version = format!(
        "{:<width$}",
        app.version.as_str(),
        width = theme.layout.version_width
    );
    output.line(&format!(
        "  {} {} {}",
        id.with(theme.colors.app_id),
        version.with(theme.colors.version),
        app.name.as_str().with(theme.colors.secondary)
    ));
}

/// Print footer for app tables
pub fn print_list_footer(output: &Output, count: usize) {
    output.line("");
    let plural = if count == 1 { "" } else { "s" };
    output.line(&format!("  {count} app{plural}").dark_grey().to_string());
}

/// Print a cascade plan, one action per line.
pub fn print_plan(output: &Output, plan: &[PlanItem]) {
    let theme = output.theme();
    for item in plan {
        let action = match item {
            PlanItem::Install(_) => format!("{:<7}", "install").with(theme.colors.success),
            PlanItem::Remove(_) => format!("{:<7}", "remove").with(theme.colors.warning),
        };
        output.line(&format!(
            "    {action} {}",
            item.app_id().as_str().with(theme.colors.app_id)
        ));
    }
}

/// Print every app's checks, failures highlighted.
pub fn print_verification(output: &Output, report: &VerificationReport) {
    let theme = output.theme();
    for app in report.iter() {
        let icon = if app.passed() {
            theme.icons.success.with(theme.colors.success)
        } else {
            theme.icons.error.with(theme.colors.error)
        };
        output.line(&format!(
            "  {icon} {}",
            app.app.as_str().with(theme.colors.app_id)
        ));
        for check in &app.checks {
            output.line(&format!("      {}", format_check(check, theme)));
        }
    }
}
