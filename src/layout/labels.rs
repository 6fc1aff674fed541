//! Alias and device info labels.
//!
//! Text is measured with a fixed per-character advance derived from the line
//! height, so the geometry does not depend on any font machinery.

use serde::Serialize;

use super::chassis::{ChassisLayout, PortSlot, SlotKind};
use super::geometry::{Label, Orientation, Point, Rect};
use crate::config::LayoutConfig;
use crate::topology::{Device, Interface};
use crate::utils::natural_cmp;

const ROTATED_ADVANCE: f64 = 0.65;
const HORIZONTAL_ADVANCE: f64 = 0.7;
const ELLIPSIS: char = '…';

/// Cut `text` to at most `max_chars` characters, ending in an ellipsis
fn truncate(text: &str, max_chars: usize) -> (String, bool) {
    if text.chars().count() <= max_chars {
        return (text.to_string(), false);
    }
    let keep = max_chars.saturating_sub(1);
    let mut cut: String = text.chars().take(keep).collect();
    cut.push(ELLIPSIS);
    (cut, true)
}

fn chars_fitting(length: f64, advance: f64, cfg: &LayoutConfig) -> usize {
    let per_char = cfg.label_line_height * advance;
    if per_char <= 0.0 {
        return usize::MAX;
    }
    (((length - 2.0 * cfg.label_padding) / per_char).floor().max(1.0)) as usize
}

/// Text beside a port, joined to it by a short line
#[derive(Debug, Clone, Serialize)]
pub struct AliasLabel {
    pub interface: String,
    pub line: [Point; 2],
    pub label: Label,
}

impl AliasLabel {
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            interface: self.interface.clone(),
            line: [self.line[0].translate(dx, dy), self.line[1].translate(dx, dy)],
            label: self.label.translate(dx, dy),
        }
    }

    pub fn bounds(&self) -> Rect {
        self.label.rect.include(self.line[0]).include(self.line[1])
    }
}

/// Alias label for a grid or management port; edge anchors carry none
pub fn alias_label(slot: &PortSlot, alias: &str, cfg: &LayoutConfig) -> Option<AliasLabel> {
    let alias = alias.trim();
    let rect = slot.rect?;
    if alias.is_empty() || slot.kind == SlotKind::Edge {
        return None;
    }

    let rotated = slot.orientation.is_vertical();
    let advance = if rotated { ROTATED_ADVANCE } else { HORIZONTAL_ADVANCE };
    let max_chars = chars_fitting(cfg.alias_label_max_height, advance, cfg);
    let mut truncated = false;
    let lines: Vec<String> = alias
        .lines()
        .map(|line| {
            let (text, cut) = truncate(line.trim(), max_chars);
            truncated |= cut;
            text
        })
        .collect();
    let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as f64;
    let along = (longest * cfg.label_line_height * advance + 2.0 * cfg.label_padding)
        .clamp(cfg.alias_label_min_height, cfg.alias_label_max_height);
    let across = lines.len() as f64 * cfg.label_line_height + 2.0 * cfg.label_padding;

    let (start, end, label_rect) = match slot.orientation {
        Orientation::Up => {
            let start = Point::new(slot.anchor.x, rect.y);
            let end = start.translate(0.0, -cfg.alias_line_extension);
            let r = Rect::new(
                end.x + cfg.alias_label_x_offset,
                end.y - along - cfg.alias_label_offset,
                across,
                along,
            );
            (start, end, r)
        }
        Orientation::Down => {
            let start = Point::new(slot.anchor.x, rect.bottom());
            let end = start.translate(0.0, cfg.alias_line_extension);
            let r = Rect::new(
                end.x + cfg.alias_label_x_offset,
                end.y + cfg.alias_label_offset,
                across,
                along,
            );
            (start, end, r)
        }
        Orientation::Right | Orientation::Left => {
            let start = Point::new(rect.right(), rect.center().y);
            let end = slot.orientation.extend(start, cfg.alias_line_extension);
            let width = along.max(30.0_f64.min(cfg.alias_label_max_height));
            let x = match slot.orientation {
                Orientation::Left => end.x - cfg.alias_label_offset - width,
                _ => end.x + cfg.alias_label_offset,
            };
            (start, end, Rect::new(x, end.y - across / 2.0, width, across))
        }
    };

    Some(AliasLabel {
        interface: slot.interface.clone(),
        line: [start, end],
        label: Label {
            rect: label_rect,
            lines,
            truncated,
            rotated,
        },
    })
}

fn status_text(iface: &Interface) -> &'static str {
    match (iface.admin_up, iface.oper_up) {
        (Some(false), _) => "admin down",
        (_, Some(true)) => "up",
        (_, Some(false)) => "down",
        _ => "unknown",
    }
}

fn describe(iface: &Interface) -> String {
    match &iface.alias {
        Some(alias) => format!("{} [{}] ({})", iface.canonical, alias, status_text(iface)),
        None => format!("{} ({})", iface.canonical, status_text(iface)),
    }
}

/// Cap a list to what fits in `max_height`; overflow becomes one summary line
fn capped_list(items: Vec<String>, max_height: f64, line_step: f64) -> (Vec<String>, bool) {
    let capacity = ((max_height / line_step).floor() as usize).max(1);
    if items.len() <= capacity {
        return (items, false);
    }
    let keep = capacity - 1;
    let hidden = items.len() - keep;
    let mut shown: Vec<String> = items.into_iter().take(keep).collect();
    shown.push(format!("{} (+{} more)", ELLIPSIS, hidden));
    (shown, true)
}

/// Device summary to the left of the chassis, in chassis-local coordinates
pub fn info_label(device: &Device, chassis: &ChassisLayout, cfg: &LayoutConfig) -> Label {
    let step = cfg.label_line_height + 3.0;

    let mut header = vec![if chassis.is_stack {
        format!("{} (STACK)", device.name)
    } else {
        device.name.clone()
    }];
    header.push(format!("IP: {}", device.address.as_deref().unwrap_or("N/A")));
    header.push(match device.status {
        Some(status) => format!("Status: {}", status),
        None => "Status: not probed".to_string(),
    });
    if let Some(platform) = device.platform {
        header.push(format!("Platform: {}", platform));
    }
    if chassis.pages > 1 {
        header.push(format!("Ports shown on {} pages", chassis.pages));
    }

    let mut physical: Vec<&Interface> = device.interfaces.iter().filter(|i| i.class.is_chassis_port()).collect();
    physical.sort_by(|a, b| natural_cmp(&a.canonical, &b.canonical));
    let mut other: Vec<&Interface> = device.interfaces.iter().filter(|i| !i.class.is_chassis_port()).collect();
    other.sort_by(|a, b| natural_cmp(&a.canonical, &b.canonical));

    let (physical_lines, physical_cut) = capped_list(
        physical.iter().map(|i| describe(i)).collect(),
        cfg.physical_port_list_max_height,
        step,
    );
    let (other_lines, other_cut) = capped_list(
        other.iter().map(|i| describe(i)).collect(),
        cfg.logical_if_list_max_height,
        step,
    );

    let list_height = |shown: usize, max: f64| max.min((shown as f64 * step).max(20.0)) + 25.0;
    let natural_height = header.len() as f64 * step
        + 10.0
        + list_height(physical_lines.len(), cfg.physical_port_list_max_height)
        + list_height(other_lines.len(), cfg.logical_if_list_max_height)
        + 20.0;
    let height = natural_height.min(cfg.info_label_max_height);
    let width = (chassis.width * 0.65).clamp(cfg.info_label_min_width, cfg.info_label_max_width);

    let mut lines = header;
    lines.push(format!("Physical ports ({}):", physical.len()));
    lines.extend(physical_lines);
    lines.push(format!("Other interfaces ({}):", other.len()));
    lines.extend(other_lines);

    let max_chars = chars_fitting(width, ROTATED_ADVANCE, cfg);
    let mut truncated = physical_cut || other_cut || natural_height > cfg.info_label_max_height;
    let lines = lines
        .into_iter()
        .map(|line| {
            let (text, cut) = truncate(&line, max_chars);
            truncated |= cut;
            text
        })
        .collect();

    Label {
        rect: Rect::new(
            -width - cfg.info_label_margin,
            chassis.height / 2.0 - height / 2.0,
            width,
            height,
        ),
        lines,
        truncated,
        rotated: false,
    }
}
