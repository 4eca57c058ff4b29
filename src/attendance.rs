use crate::models::{AttendanceEvent, AttendanceSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Present,
    Late,
    LeftEarly,
    Absent,
    Ncns,
}

impl Category {
    /// Case-insensitive match on the raw `type` text.
    pub fn classify(kind: &str) -> Option<Self> {
        match kind.to_lowercase().as_str() {
            "present" => Some(Category::Present),
            "late" => Some(Category::Late),
            "left early" => Some(Category::LeftEarly),
            "absent" => Some(Category::Absent),
            "ncns" => Some(Category::Ncns),
            _ => None,
        }
    }
}

/// Tallies events that carry a type. Unrecognized types count toward
/// `total` only.
pub fn summarize(events: &[AttendanceEvent]) -> AttendanceSummary {
    let mut summary = AttendanceSummary::default();
    for kind in events.iter().filter_map(|event| event.kind.as_deref()) {
        summary.total += 1;
        match Category::classify(kind) {
            Some(Category::Present) => summary.present += 1,
            Some(Category::Late) => summary.late += 1,
            Some(Category::LeftEarly) => summary.left_early += 1,
            Some(Category::Absent) => summary.absent += 1,
            Some(Category::Ncns) => summary.ncns += 1,
            None => {}
        }
    }
    summary
}
