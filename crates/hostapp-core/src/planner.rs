//! Cascade planning for install and remove.
//!
//! Removing an app takes every installed app that depends on it (directly or
//! transitively) with it. Installing an app pulls in every app dependency that
//! is not installed yet. The planner only computes these lists; executing them
//! is up to the caller, in the order given by [`execution_order`].

use std::collections::{HashMap, HashSet};

use hostapp_schema::{AppId, Manifest, Operation, PlanItem};

use crate::error::{AppError, Result};

/// Compute the extra actions implied by applying `op` to `id`.
///
/// Items are listed in discovery order: each direct dependent (or dependency)
/// is followed by its own cascade. Every app appears at most once, and cycles
/// in the dependency graph terminate.
///
/// # Errors
///
/// [`AppError::NotFound`] when installing an app the catalog does not list.
/// A transitive dependency missing from the catalog ends that branch with a
/// warning instead; the install itself will report it.
pub fn plan_cascade(
    id: &str,
    op: Operation,
    installed: &[Manifest],
    available: &[Manifest],
) -> Result<Vec<PlanItem>> {
    let mut visited = HashSet::from([id.to_string()]);
    let mut plan = Vec::new();
    match op {
        Operation::Remove => cascade_remove(id, installed, &mut visited, &mut plan),
        Operation::Install => {
            let target = available
                .iter()
                .find(|m| m.pid == id)
                .ok_or_else(|| AppError::NotFound(AppId::new(id)))?;
            cascade_install(target, installed, available, &mut visited, &mut plan);
        }
    }
    Ok(plan)
}

fn cascade_remove(
    id: &str,
    installed: &[Manifest],
    visited: &mut HashSet<String>,
    plan: &mut Vec<PlanItem>,
) {
    for dependent in installed.iter().filter(|m| m.depends_on_app(id)) {
        if !visited.insert(dependent.pid.to_string()) {
            continue;
        }
        plan.push(PlanItem::Remove(dependent.clone()));
        cascade_remove(&dependent.pid, installed, visited, plan);
    }
}

fn cascade_install(
    target: &Manifest,
    installed: &[Manifest],
    available: &[Manifest],
    visited: &mut HashSet<String>,
    plan: &mut Vec<PlanItem>,
) {
    for dep in target.app_dependencies() {
        if installed.iter().any(|m| m.pid == *dep) || !visited.insert(dep.to_string()) {
            continue;
        }
        plan.push(PlanItem::Install(dep.clone()));
        match available.iter().find(|m| m.pid == *dep) {
            Some(next) => cascade_install(next, installed, available, visited, plan),
            None => tracing::warn!("{} depends on {dep}, which the catalog does not list", target.pid),
        }
    }
}

/// Reorder a cascade plan so that it can be executed front to back.
///
/// Removals put every dependent before the apps it depends on, so each
/// removal finds no remaining dependents. Installs put every dependency before
/// the apps that need it. Only edges between apps in `plan` matter; install
/// items are resolved through `available`. Apps caught in a cycle keep their
/// discovery order relative to each other.
pub fn execution_order(plan: Vec<PlanItem>, available: &[Manifest]) -> Vec<PlanItem> {
    // (app, its app dependencies), in discovery order.
    let graph: Vec<(String, Vec<String>)> = plan
        .iter()
        .map(|item| {
            let manifest = match item {
                PlanItem::Remove(manifest) => Some(manifest),
                PlanItem::Install(id) => available.iter().find(|m| m.pid == *id),
            };
            let edges = manifest
                .map(|m| m.app_dependencies().map(ToString::to_string).collect())
                .unwrap_or_default();
            (item.app_id().to_string(), edges)
        })
        .collect();

    let mut visited = HashSet::new();
    let mut order = Vec::with_capacity(plan.len());
    for (item, (id, _)) in plan.iter().zip(&graph) {
        match item {
            PlanItem::Install(_) => dependencies_first(id, &graph, &mut visited, &mut order),
            PlanItem::Remove(_) => dependents_first(id, &graph, &mut visited, &mut order),
        }
    }

    let mut items: HashMap<String, PlanItem> = plan
        .into_iter()
        .map(|item| (item.app_id().to_string(), item))
        .collect();
    order.into_iter().filter_map(|id| items.remove(id)).collect()
}

fn dependencies_first<'a>(
    id: &'a str,
    graph: &'a [(String, Vec<String>)],
    visited: &mut HashSet<&'a str>,
    order: &mut Vec<&'a str>,
) {
    if !visited.insert(id) {
        return;
    }
    let edges = graph.iter().find(|(app, _)| app == id).map(|(_, e)| e);
    for dep in edges.into_iter().flatten() {
        if let Some((app, _)) = graph.iter().find(|(app, _)| app == dep) {
            dependencies_first(app, graph, visited, order);
        }
    }
    order.push(id);
}

fn dependents_first<'a>(
    id: &'a str,
    graph: &'a [(String, Vec<String>)],
    visited: &mut HashSet<&'a str>,
    order: &mut Vec<&'a str>,
) {
    if !visited.insert(id) {
        return;
    }
    for (dependent, edges) in graph {
        if edges.iter().any(|d| d == id) {
            dependents_first(dependent, graph, visited, order);
        }
    }
    order.push(id);
}
