//! Merging of near-duplicate detections

use lookout_raster::Rect;

use crate::matcher::Detection;

/// Relative edge tolerance for two rectangles to be considered the same hit
pub const DEFAULT_EPS: f64 = 0.5;

/// True when every edge of `a` is within `eps * (min w + min h) / 2` of the
/// corresponding edge of `b`
pub fn similar(a: &Rect, b: &Rect, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) as f64 + a.height.min(b.height) as f64) * 0.5;
    let close = |p: i64, q: i64| ((p - q).abs() as f64) <= delta;
    close(a.x as i64, b.x as i64)
        && close(a.y as i64, b.y as i64)
        && close(a.right() as i64, b.right() as i64)
        && close(a.bottom() as i64, b.bottom() as i64)
}

struct Group {
    seed: Rect,
    members: Vec<Rect>,
    score: f32,
}

impl Group {
    fn average(&self) -> Rect {
        let n = self.members.len() as f64;
        let mean = |f: fn(&Rect) -> f64| (self.members.iter().map(f).sum::<f64>() / n).round();
        Rect::new(
            mean(|r| r.x as f64) as i32,
            mean(|r| r.y as f64) as i32,
            mean(|r| r.width as f64) as u32,
            mean(|r| r.height as f64) as u32,
        )
    }
}

/// Collapse detections into groups, keeping singletons.
///
/// Each detection joins the first group whose seed (first member) it is
/// similar to. A group is reported as the rounded mean rectangle of its
/// members with the best member score, in order of group creation.
pub fn group_detections(detections: &[Detection], eps: f64) -> Vec<Detection> {
    let mut groups: Vec<Group> = Vec::new();

    for det in detections {
        match groups.iter_mut().find(|g| similar(&g.seed, &det.rect, eps)) {
            Some(group) => {
                group.members.push(det.rect);
                group.score = group.score.max(det.score);
            }
            None => groups.push(Group {
                seed: det.rect,
                members: vec![det.rect],
                score: det.score,
            }),
        }
    }

    groups
        .iter()
        .map(|g| Detection {
            rect: g.average(),
            score: g.score,
        })
        .collect()
}
