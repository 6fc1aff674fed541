//! Standalone SVG rendering of a [`LayoutModel`].
//!
//! Only computed geometry is serialised here; nothing is measured or moved.

use std::fmt::{self, Write};

use crate::discovery::DeviceStatus;
use crate::layout::{Label, LayoutModel, LayoutNode, Point, Rect, SlotKind};
use crate::topology::TopologyGraph;

const CANVAS_MARGIN: f64 = 20.0;
const FONT_SIZE: f64 = 9.0;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn points(path: &[Point]) -> String {
    path.iter()
        .map(|p| format!("{:.1},{:.1}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

fn rect(out: &mut String, r: &Rect, class: &str) -> fmt::Result {
    writeln!(
        out,
        r#"  <rect class="{}" x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}"/>"#,
        class, r.x, r.y, r.width, r.height
    )
}

fn label(out: &mut String, label: &Label, class: &str, line_height: f64) -> fmt::Result {
    rect(out, &label.rect, class)?;
    let r = &label.rect;
    if label.rotated {
        // Text runs bottom-to-top along the left edge of the box
        let (x, y) = (r.x + line_height * 0.8, r.bottom() - 2.0);
        write!(
            out,
            r#"  <text class="{}-text" transform="translate({:.1},{:.1}) rotate(-90)">"#,
            class, x, y
        )?;
        for (i, line) in label.lines.iter().enumerate() {
            write!(out, r#"<tspan x="0" y="{:.1}">{}</tspan>"#, i as f64 * line_height, escape(line))?;
        }
    } else {
        write!(out, r#"  <text class="{}-text">"#, class)?;
        for (i, line) in label.lines.iter().enumerate() {
            write!(
                out,
                r#"<tspan x="{:.1}" y="{:.1}">{}</tspan>"#,
                r.x + 2.0,
                r.y + (i + 1) as f64 * line_height,
                escape(line)
            )?;
        }
    }
    writeln!(out, "</text>")
}

fn node_class(graph: &TopologyGraph, node: &LayoutNode) -> &'static str {
    match graph.device(node.device) {
        Some(d) if d.is_stub() => "chassis stub",
        Some(d) => match d.status {
            Some(DeviceStatus::Partial) => "chassis partial",
            _ => "chassis",
        },
        None => "chassis",
    }
}

fn node(out: &mut String, graph: &TopologyGraph, node: &LayoutNode, line_height: f64) -> fmt::Result {
    writeln!(out, r#" <g class="device" id="device-{}">"#, node.device.0)?;
    rect(out, &node.chassis, node_class(graph, node))?;
    writeln!(
        out,
        r#"  <text class="name" x="{:.1}" y="{:.1}">{}</text>"#,
        node.chassis.x,
        node.chassis.bottom() + line_height + 2.0,
        escape(&node.name)
    )?;
    for slot in &node.ports {
        let Some(r) = slot.rect else {
            continue;
        };
        let class = match slot.kind {
            SlotKind::Management => "port mgmt",
            _ => "port",
        };
        rect(out, &r, class)?;
        let c = r.center();
        writeln!(
            out,
            r#"  <text class="port-text" x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
            c.x,
            c.y + FONT_SIZE / 3.0,
            escape(&slot.label)
        )?;
    }
    for alias in &node.alias_labels {
        writeln!(
            out,
            r#"  <line class="alias-line" x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}"/>"#,
            alias.line[0].x, alias.line[0].y, alias.line[1].x, alias.line[1].y
        )?;
        label(out, &alias.label, "alias", line_height)?;
    }
    label(out, &node.info_label, "info", line_height)?;
    writeln!(out, " </g>")
}

/// Render the model as an SVG document
pub fn render_svg(graph: &TopologyGraph, model: &LayoutModel, line_height: f64) -> Result<String, fmt::Error> {
    let canvas = model.canvas;
    let (x, y) = (canvas.x - CANVAS_MARGIN, canvas.y - CANVAS_MARGIN);
    let (w, h) = (canvas.width + 2.0 * CANVAS_MARGIN, canvas.height + 2.0 * CANVAS_MARGIN);

    let mut out = String::new();
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{:.1} {:.1} {:.1} {:.1}" width="{:.0}" height="{:.0}">"#,
        x, y, w, h, w, h
    )?;
    writeln!(
        out,
        "<style>\
         .chassis{{fill:#e8eef4;stroke:#2b4a6f}}.stub{{stroke-dasharray:4 2;fill:#f4f4f4}}\
         .partial{{fill:#fff4d6}}.port{{fill:#fff;stroke:#333}}.mgmt{{fill:#dfe}}\
         .link{{fill:none;stroke:#1565c0;stroke-width:1.5}}.alias-line{{stroke:#777}}\
         .alias,.info,.vlan{{fill:#fff;stroke:#bbb}}text{{font-family:monospace;font-size:{}px}}\
         </style>",
        FONT_SIZE
    )?;

    writeln!(out, r#"<g class="links">"#)?;
    for route in &model.routes {
        writeln!(
            out,
            r#"  <polyline class="link" id="link-{}" points="{}"/>"#,
            route.link,
            points(&route.path)
        )?;
        if let Some(vlan) = &route.vlan_label {
            label(&mut out, vlan, "vlan", line_height)?;
        }
    }
    writeln!(out, "</g>")?;

    for n in &model.nodes {
        node(&mut out, graph, n, line_height)?;
    }
    writeln!(out, "</svg>")?;
    Ok(out)
}
