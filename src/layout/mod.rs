//! Layout engine module.
//!
//! This module turns a finished [`TopologyGraph`] into a purely geometric
//! model: device cells on a row-major grid, chassis port slots, alias and
//! info labels, and orthogonal connection routes. It has no failure mode
//! and knows nothing about any output markup; renderers serialise the
//! rectangles, points and labels it produces.
//!
//! Layout is deterministic and single-pass. Each device is first laid out
//! in its own local coordinates, then the grid pitch is widened, if needed,
//! so that no two device footprints overlap, and finally every node is
//! translated onto its cell.

pub mod chassis;
pub mod geometry;
pub mod labels;
pub mod routing;

use log::debug;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::config::LayoutConfig;
use crate::topology::{Device, DeviceId, Endpoint, TopologyGraph};

// Re-export key types for easier access
pub use chassis::{ports_per_row, stack_threshold, ChassisLayout, PortSlot, SlotKind};
pub use geometry::{Label, Orientation, Point, Rect};
pub use labels::AliasLabel;
pub use routing::{ConnectionRoute, ConnectionWaypoint, WaypointKind};

/// One device placed on the grid, in absolute coordinates
#[derive(Debug, Clone, Serialize)]
pub struct LayoutNode {
    pub device: DeviceId,
    pub name: String,
    pub row: usize,
    pub col: usize,
    /// Top-left corner of the chassis
    pub position: Point,
    pub chassis: Rect,
    pub ports_per_row: usize,
    pub rows: usize,
    pub pages: usize,
    pub physical_count: usize,
    pub is_stack: bool,
    pub ports: Vec<PortSlot>,
    pub alias_labels: Vec<AliasLabel>,
    pub info_label: Label,
    /// Everything drawn for this device, waypoints included
    pub footprint: Rect,
}

impl LayoutNode {
    /// Slot of a canonical interface name, case-insensitively
    pub fn slot(&self, interface: &str) -> Option<&PortSlot> {
        self.ports
            .iter()
            .find(|s| s.interface.eq_ignore_ascii_case(interface))
    }
}

/// Effective grid spacing after footprint fitting
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GridSpec {
    pub columns: usize,
    pub pitch_x: f64,
    pub pitch_y: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LayoutModel {
    pub nodes: Vec<LayoutNode>,
    pub routes: Vec<ConnectionRoute>,
    /// Encloses every node and route; zero for an empty graph
    pub canvas: Rect,
    pub grid: GridSpec,
}

impl LayoutModel {
    pub fn node(&self, device: DeviceId) -> Option<&LayoutNode> {
        self.nodes.iter().find(|n| n.device == device)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A node before grid placement, relative to its own chassis origin
struct LocalNode {
    chassis: ChassisLayout,
    alias_labels: Vec<AliasLabel>,
    info_label: Label,
    footprint: Rect,
}

fn linked_interfaces(graph: &TopologyGraph, id: DeviceId) -> HashSet<String> {
    graph
        .links_of(id)
        .flat_map(|l| [&l.a, &l.b])
        .filter(|e| e.device == id)
        .map(|e| e.interface.to_lowercase())
        .collect()
}

fn layout_local(device: &Device, linked: &HashSet<String>, cfg: &LayoutConfig) -> LocalNode {
    let chassis = chassis::layout_chassis(device, linked, cfg);

    let alias_labels: Vec<AliasLabel> = chassis
        .slots
        .iter()
        .filter_map(|slot| {
            let alias = device.interface(&slot.interface)?.alias.as_deref()?;
            labels::alias_label(slot, alias, cfg)
        })
        .collect();
    let info_label = labels::info_label(device, &chassis, cfg);

    let mut footprint = Rect::new(0.0, 0.0, chassis.width, chassis.height).union(&info_label.rect);
    for slot in &chassis.slots {
        if let Some(rect) = slot.rect {
            footprint = footprint.union(&rect);
        }
        if linked.contains(&slot.interface.to_lowercase()) {
            footprint = footprint.include(slot.orientation.extend(slot.anchor, cfg.waypoint_offset));
        }
    }
    for alias in &alias_labels {
        footprint = footprint.union(&alias.bounds());
    }

    LocalNode {
        chassis,
        alias_labels,
        info_label,
        footprint,
    }
}

/// Pitch along one axis: the configured margin, or wider when the largest
/// extents on both sides of the origin would not fit in it.
fn fitted_pitch(margin: f64, before: f64, after: f64, gap: f64) -> f64 {
    if before + after <= margin {
        margin
    } else {
        before + after + gap
    }
}

/// Compute the full geometric model for a topology graph.
///
/// Devices are placed in graph insertion order, `devices_per_row` per row.
/// With the default configuration the first row starts at `(200, 100)` and
/// cells are 450 units apart horizontally, growing only when a device
/// footprint would reach into its neighbour's cell.
///
/// # Arguments
/// * `graph` - The finished topology
/// * `cfg` - Layout constants
///
/// # Returns
/// * A [`LayoutModel`]; an empty graph yields `LayoutModel::default()`
pub fn compute_layout(graph: &TopologyGraph, cfg: &LayoutConfig) -> LayoutModel {
    if graph.is_empty() {
        return LayoutModel::default();
    }

    let locals: Vec<LocalNode> = graph
        .devices
        .iter()
        .map(|d| layout_local(d, &linked_interfaces(graph, d.id), cfg))
        .collect();

    let extent = |f: fn(&Rect) -> f64| locals.iter().map(|n| f(&n.footprint)).fold(0.0_f64, f64::max);
    let left = extent(|r| -r.x);
    let right = extent(|r| r.right());
    let up = extent(|r| -r.y);
    let down = extent(|r| r.bottom());

    let columns = cfg.devices_per_row.max(1);
    let grid = GridSpec {
        columns,
        pitch_x: fitted_pitch(cfg.grid_margin_x, left, right, cfg.grid_min_gap),
        pitch_y: fitted_pitch(cfg.grid_margin_y, up, down, cfg.grid_min_gap),
    };
    debug!(
        "Grid: {} columns, pitch {}x{} (margins {}x{})",
        grid.columns, grid.pitch_x, grid.pitch_y, cfg.grid_margin_x, cfg.grid_margin_y
    );

    let nodes: Vec<LayoutNode> = graph
        .devices
        .iter()
        .zip(locals)
        .enumerate()
        .map(|(i, (device, local))| {
            let (row, col) = (i / columns, i % columns);
            let position = Point::new(
                cfg.start_x + col as f64 * grid.pitch_x,
                cfg.start_y + row as f64 * grid.pitch_y,
            );
            let (dx, dy) = (position.x, position.y);
            LayoutNode {
                device: device.id,
                name: device.name.clone(),
                row,
                col,
                position,
                chassis: Rect::new(dx, dy, local.chassis.width, local.chassis.height),
                ports_per_row: local.chassis.ports_per_row,
                rows: local.chassis.rows,
                pages: local.chassis.pages,
                physical_count: local.chassis.physical_count,
                is_stack: local.chassis.is_stack,
                ports: local.chassis.slots.iter().map(|s| s.translate(dx, dy)).collect(),
                alias_labels: local.alias_labels.iter().map(|a| a.translate(dx, dy)).collect(),
                info_label: local.info_label.translate(dx, dy),
                footprint: local.footprint.translate(dx, dy),
            }
        })
        .collect();

    let by_device: HashMap<DeviceId, &LayoutNode> = nodes.iter().map(|n| (n.device, n)).collect();
    let routes: Vec<ConnectionRoute> = graph
        .links
        .iter()
        .enumerate()
        .filter_map(|(i, link)| {
            let from = anchor_slot(by_device.get(&link.a.device)?, &link.a);
            let to = anchor_slot(by_device.get(&link.b.device)?, &link.b);
            Some(routing::route(
                i,
                link.a.clone(),
                &from,
                link.b.clone(),
                &to,
                link.vlan.as_deref(),
                cfg,
            ))
        })
        .collect();

    let mut canvas = nodes[0].footprint;
    for node in &nodes {
        canvas = canvas.union(&node.footprint);
    }
    for route in &routes {
        canvas = canvas.union(&route.bounds());
    }

    LayoutModel {
        nodes,
        routes,
        canvas,
        grid,
    }
}

/// Slot an endpoint attaches to; falls back to the chassis right-centre
fn anchor_slot(node: &LayoutNode, endpoint: &Endpoint) -> PortSlot {
    match node.slot(&endpoint.interface) {
        Some(slot) => slot.clone(),
        None => PortSlot {
            interface: endpoint.interface.clone(),
            kind: SlotKind::Edge,
            label: String::new(),
            rect: None,
            anchor: Point::new(node.chassis.right(), node.chassis.center().y),
            orientation: Orientation::Right,
            page: 0,
            row: 0,
        },
    }
}
