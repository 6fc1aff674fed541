//! Per-device chassis sub-layout.
//!
//! Coordinates here are local to the chassis: `(0, 0)` is its top-left
//! corner. The caller translates the result onto the grid.

use serde::Serialize;
use std::collections::HashSet;

use super::geometry::{Orientation, Point, Rect};
use crate::config::{LayoutConfig, StackBase};
use crate::topology::{Device, Interface};
use crate::utils::natural_cmp;

/// Ports per row for a device showing `count` chassis ports
pub fn ports_per_row(count: usize, cfg: &LayoutConfig) -> usize {
    if count as f64 > cfg.max_physical_ports_for_chassis_display as f64 / 1.5 {
        cfg.ports_per_row_large
    } else {
        cfg.ports_per_row_normal
    }
}

/// Physical port count above which a device is drawn as a stack.
///
/// `per_row(base) * factor + offset`, with `base` choosing the normal or
/// large per-row capacity.
pub fn stack_threshold(cfg: &LayoutConfig) -> f64 {
    let per_row = match cfg.stack_detection_base {
        StackBase::Normal => cfg.ports_per_row_normal,
        StackBase::Large => cfg.ports_per_row_large,
    };
    per_row as f64 * cfg.stack_detection_factor + cfg.stack_detection_offset
}

pub fn is_stack(physical_count: usize, cfg: &LayoutConfig) -> bool {
    physical_count as f64 > stack_threshold(cfg)
}

/// Port counts per row; two rows are balanced, more rows fill to capacity
fn row_distribution(count: usize, per_row: usize) -> Vec<usize> {
    if count == 0 {
        return Vec::new();
    }
    let per_row = per_row.max(1);
    let rows = count.div_ceil(per_row);
    if rows == 2 {
        let first = count.div_ceil(2);
        return vec![first, count - first];
    }
    let mut remaining = count;
    let mut dist = Vec::with_capacity(rows);
    while remaining > 0 {
        let n = remaining.min(per_row);
        dist.push(n);
        remaining -= n;
    }
    dist
}

fn row_width(ports: usize, cfg: &LayoutConfig) -> f64 {
    ports as f64 * cfg.port_width + ports.saturating_sub(1) as f64 * cfg.port_horizontal_spacing
}

fn page_height(rows: usize, cfg: &LayoutConfig) -> f64 {
    rows as f64 * cfg.port_height
        + rows.saturating_sub(1) as f64 * cfg.port_vertical_spacing
        + cfg.port_row_offset_y
        + cfg.chassis_padding_y
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    /// Square in the port grid
    Grid,
    /// Management port square beside the right edge
    Management,
    /// Bare anchor on the right edge for a linked non-chassis interface
    Edge,
}

/// Where one interface is drawn and where its connections attach
#[derive(Debug, Clone, Serialize)]
pub struct PortSlot {
    /// Canonical interface name
    pub interface: String,
    pub kind: SlotKind,
    /// Text inside the square
    pub label: String,
    pub rect: Option<Rect>,
    pub anchor: Point,
    pub orientation: Orientation,
    pub page: usize,
    pub row: usize,
}

impl PortSlot {
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            rect: self.rect.map(|r| r.translate(dx, dy)),
            anchor: self.anchor.translate(dx, dy),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChassisLayout {
    pub width: f64,
    pub height: f64,
    pub ports_per_row: usize,
    pub rows: usize,
    pub pages: usize,
    /// Every chassis-class interface, drawn or not
    pub physical_count: usize,
    pub is_stack: bool,
    pub slots: Vec<PortSlot>,
}

/// Lay out `device`'s ports. `linked` holds lowercase canonical names of its
/// interfaces that carry a link.
pub fn layout_chassis(device: &Device, linked: &HashSet<String>, cfg: &LayoutConfig) -> ChassisLayout {
    let is_linked = |iface: &Interface| linked.contains(&iface.canonical.to_lowercase());

    let mut grid: Vec<&Interface> = device
        .interfaces
        .iter()
        .filter(|i| i.class.is_chassis_port() && !i.is_management())
        .filter(|i| !(i.is_down() && i.alias.is_none()) || is_linked(i))
        .collect();
    grid.sort_by(|a, b| natural_cmp(&a.canonical, &b.canonical));

    let mut management: Vec<&Interface> = device
        .interfaces
        .iter()
        .filter(|i| i.is_management() && (i.class.is_chassis_port() || is_linked(i)))
        .collect();
    management.sort_by(|a, b| natural_cmp(&a.canonical, &b.canonical));

    let mut edge: Vec<&Interface> = device
        .interfaces
        .iter()
        .filter(|i| !i.class.is_chassis_port() && !i.is_management() && is_linked(i))
        .collect();
    edge.sort_by(|a, b| natural_cmp(&a.canonical, &b.canonical));

    let physical_count = device.interfaces.iter().filter(|i| i.class.is_chassis_port()).count();
    let page_size = cfg.max_physical_ports_for_chassis_display.max(1);
    let per_row = ports_per_row(grid.len().min(page_size), cfg);

    let pages: Vec<Vec<usize>> = grid
        .chunks(page_size)
        .map(|page| row_distribution(page.len(), per_row))
        .collect();

    let (width, height) = if grid.is_empty() {
        (cfg.min_chassis_width, cfg.default_chassis_height_no_ports)
    } else {
        let widest = pages.iter().flatten().copied().max().unwrap_or(0);
        let content: f64 = pages.iter().map(|rows| page_height(rows.len(), cfg)).sum::<f64>()
            + pages.len().saturating_sub(1) as f64 * cfg.chassis_page_gap;
        (
            cfg.min_chassis_width.max(row_width(widest, cfg) + 2.0 * cfg.chassis_padding_x),
            cfg.min_chassis_height.max(content),
        )
    };

    let mut slots = Vec::with_capacity(grid.len() + management.len() + edge.len());
    let mut ports = grid.iter();
    let mut page_top = 0.0;
    for (page, rows) in pages.iter().enumerate() {
        for (row, &count) in rows.iter().enumerate() {
            let start_x = (width - row_width(count, cfg)) / 2.0;
            let y = page_top + cfg.port_row_offset_y + row as f64 * (cfg.port_height + cfg.port_vertical_spacing);
            for col in 0..count {
                let Some(iface) = ports.next() else {
                    break;
                };
                let x = start_x + col as f64 * (cfg.port_width + cfg.port_horizontal_spacing);
                let rect = Rect::new(x, y, cfg.port_width, cfg.port_height);
                let (anchor, orientation) = if row % 2 == 0 {
                    (Point::new(rect.center().x, rect.y), Orientation::Up)
                } else {
                    (Point::new(rect.center().x, rect.bottom()), Orientation::Down)
                };
                slots.push(PortSlot {
                    interface: iface.canonical.clone(),
                    kind: SlotKind::Grid,
                    label: (slots.len() + 1).to_string(),
                    rect: Some(rect),
                    anchor,
                    orientation,
                    page,
                    row,
                });
            }
        }
        page_top += page_height(rows.len(), cfg) + cfg.chassis_page_gap;
    }

    let side_count = management.len() + edge.len();
    for (i, iface) in management.iter().chain(edge.iter()).enumerate() {
        let y = height * (i + 1) as f64 / (side_count + 1) as f64;
        let (kind, label, rect, anchor) = if i < management.len() {
            let rect = Rect::new(
                width + cfg.port_horizontal_spacing,
                y - cfg.port_height / 2.0,
                cfg.port_width,
                cfg.port_height,
            );
            (SlotKind::Management, "M".to_string(), Some(rect), Point::new(rect.right(), y))
        } else {
            (SlotKind::Edge, String::new(), None, Point::new(width, y))
        };
        slots.push(PortSlot {
            interface: iface.canonical.clone(),
            kind,
            label,
            rect,
            anchor,
            orientation: Orientation::Right,
            page: 0,
            row: 0,
        });
    }

    ChassisLayout {
        width,
        height,
        ports_per_row: per_row,
        rows: pages.iter().map(Vec::len).sum(),
        pages: pages.len(),
        physical_count,
        is_stack: is_stack(physical_count, cfg),
        slots,
    }
}
