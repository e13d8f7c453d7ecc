//! Grouping of MS2 scans by precursor isolation window.

pub mod surrogate;

use std::collections::HashMap;

use tracing::debug;

use diaquery::{
    IsolationWindow,
    Scan,
};

pub use surrogate::{
    WindowSurrogate,
    build_window_surrogate,
};

/// The scans acquired under one isolation window, in acquisition (RT) order.
#[derive(Debug, Clone)]
pub struct WindowScans<'a> {
    pub window: IsolationWindow,
    pub scans: Vec<&'a Scan>,
}

/// Partitions MS2 scans by the isolation windows they were acquired with.
///
/// Frames carrying several mobility-resolved windows are listed under every
/// one of them. Scans without a mobility dimension are keyed by the m/z range
/// of their window only. Scans without isolation information cannot be
/// attributed and are dropped.
///
/// Windows are compared by exact value and returned sorted by m/z.
pub fn classify_isolation_windows<'a>(
    scans: impl IntoIterator<Item = &'a Scan>,
) -> Vec<WindowScans<'a>> {
    let mut positions: HashMap<IsolationWindow, usize> = HashMap::new();
    let mut groups: Vec<WindowScans<'a>> = Vec::new();
    let mut unattributed = 0usize;

    for scan in scans {
        if scan.isolation_windows.is_empty() {
            unattributed += 1;
            continue;
        }
        for window in &scan.isolation_windows {
            let key = if scan.has_mobility() {
                *window
            } else {
                IsolationWindow::new(window.mz_range, None)
            };
            let pos = *positions.entry(key).or_insert_with(|| {
                groups.push(WindowScans {
                    window: key,
                    scans: Vec::new(),
                });
                groups.len() - 1
            });
            let group = &mut groups[pos];
            // A frame listing the same window twice is still one acquisition.
            if group.scans.last().map(|s| s.index) != Some(scan.index) {
                group.scans.push(scan);
            }
        }
    }

    if unattributed > 0 {
        debug!(
            "{} MS2 scans carry no isolation window and were skipped",
            unattributed
        );
    }
    groups.sort_by(|a, b| a.window.cmp(&b.window));
    groups
}
