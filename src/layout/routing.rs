//! Connection routing between port anchors.

use serde::Serialize;

use super::chassis::PortSlot;
use super::geometry::{Label, Orientation, Point, Rect};
use crate::config::LayoutConfig;
use crate::topology::Endpoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointKind {
    SourceExit,
    Elbow,
    TargetExit,
}

/// Intermediate point of one route. Refers to its link by index only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConnectionWaypoint {
    pub link: usize,
    pub kind: WaypointKind,
    pub point: Point,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionRoute {
    /// Index into `TopologyGraph::links`
    pub link: usize,
    pub source: Endpoint,
    pub target: Endpoint,
    /// Anchor, exit, elbow, exit, anchor
    pub path: Vec<Point>,
    pub waypoints: Vec<ConnectionWaypoint>,
    pub vlan_label: Option<Label>,
}

impl ConnectionRoute {
    pub fn bounds(&self) -> Rect {
        let mut rect = self.path.first().map(|p| Rect::at(*p)).unwrap_or_default();
        for p in &self.path {
            rect = rect.include(*p);
        }
        match &self.vlan_label {
            Some(label) => rect.union(&label.rect),
            None => rect,
        }
    }
}

/// Orthogonal corner joining two exit points
fn elbow(from: Point, from_dir: Orientation, to: Point, to_dir: Orientation) -> Point {
    match (from_dir.is_vertical(), to_dir.is_vertical()) {
        (true, true) => Point::new(to.x, from.y),
        (false, false) => Point::new(from.x, to.y),
        (true, false) => Point::new(from.x, to.y),
        (false, true) => Point::new(to.x, from.y),
    }
}

/// Route one link between two placed port slots
pub fn route(
    link: usize,
    source: Endpoint,
    from: &PortSlot,
    target: Endpoint,
    to: &PortSlot,
    vlan: Option<&str>,
    cfg: &LayoutConfig,
) -> ConnectionRoute {
    let exit_a = from.orientation.extend(from.anchor, cfg.waypoint_offset);
    let exit_b = to.orientation.extend(to.anchor, cfg.waypoint_offset);
    let corner = elbow(exit_a, from.orientation, exit_b, to.orientation);

    let vlan_label = vlan.map(str::trim).filter(|v| !v.is_empty()).map(|v| {
        let text = format!("VLAN {}", v);
        let width = text.chars().count() as f64 * cfg.label_line_height * 0.65 + 2.0 * cfg.label_padding;
        let height = cfg.label_line_height + 2.0 * cfg.label_padding;
        Label {
            rect: Rect::centered(exit_a.midpoint(exit_b), width, height),
            lines: vec![text],
            truncated: false,
            rotated: false,
        }
    });

    let waypoint = |kind, point| ConnectionWaypoint { link, kind, point };
    ConnectionRoute {
        link,
        source,
        target,
        path: vec![from.anchor, exit_a, corner, exit_b, to.anchor],
        waypoints: vec![
            waypoint(WaypointKind::SourceExit, exit_a),
            waypoint(WaypointKind::Elbow, corner),
            waypoint(WaypointKind::TargetExit, exit_b),
        ],
        vlan_label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::chassis::SlotKind;
    use crate::topology::DeviceId;

    fn slot(anchor: Point, orientation: Orientation) -> PortSlot {
        PortSlot {
            interface: "Gi1/0/1".to_string(),
            kind: SlotKind::Grid,
            label: "1".to_string(),
            rect: None,
            anchor,
            orientation,
            page: 0,
            row: 0,
        }
    }

    fn ep(device: usize) -> Endpoint {
        Endpoint {
            device: DeviceId(device),
            interface: "Gi1/0/1".to_string(),
        }
    }

    #[test]
    fn test_up_to_up_route() {
        let cfg = LayoutConfig::default();
        let a = slot(Point::new(215.0, 107.0), Orientation::Up);
        let b = slot(Point::new(665.0, 107.0), Orientation::Up);
        let r = route(0, ep(0), &a, ep(1), &b, Some("10"), &cfg);

        assert_eq!(r.path.len(), 5);
        assert_eq!(r.path[1], Point::new(215.0, 87.0));
        assert_eq!(r.path[3], Point::new(665.0, 87.0));
        assert_eq!(r.waypoints[1].point, Point::new(665.0, 87.0));
        let label = r.vlan_label.unwrap();
        assert_eq!(label.lines, vec!["VLAN 10".to_string()]);
        assert_eq!(label.rect.center(), Point::new(440.0, 87.0));
    }

    #[test]
    fn test_mixed_orientation_elbow() {
        let cfg = LayoutConfig::default();
        let a = slot(Point::new(100.0, 50.0), Orientation::Right);
        let b = slot(Point::new(300.0, 200.0), Orientation::Down);
        let r = route(3, ep(0), &a, ep(1), &b, None, &cfg);
        assert_eq!(r.path[1], Point::new(120.0, 50.0));
        assert_eq!(r.path[2], Point::new(300.0, 50.0));
        assert_eq!(r.path[3], Point::new(300.0, 220.0));
        assert!(r.vlan_label.is_none());
        assert!(r.waypoints.iter().all(|w| w.link == 3));
        assert_eq!(r.bounds(), Rect::new(100.0, 50.0, 200.0, 170.0));
    }
}
