// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sorting a mixer's spectra into scans by scan type.

use std::collections::BTreeSet;

use itertools::Itertools;

use crate::spectra::{ScanType, SpectrumBatch};

/// The unique scan IDs of each scan type for a single mixer. Scan IDs are
/// assigned monotonically with time, so ascending order is also time order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanGroups {
    pub otf: BTreeSet<i32>,
    pub refs: BTreeSet<i32>,
    pub ref_hots: BTreeSet<i32>,
    pub hots: BTreeSet<i32>,
}

impl ScanGroups {
    pub fn get(&self, scan_type: ScanType) -> &BTreeSet<i32> {
        match scan_type {
            ScanType::Ref => &self.refs,
            ScanType::RefHot => &self.ref_hots,
            ScanType::Hot => &self.hots,
            ScanType::Otf => &self.otf,
        }
    }

    /// The scan types without any scans.
    pub fn missing(&self) -> Vec<ScanType> {
        [ScanType::Otf, ScanType::Ref, ScanType::RefHot, ScanType::Hot]
            .into_iter()
            .filter(|&t| self.get(t).is_empty())
            .collect()
    }
}

impl std::fmt::Display for ScanGroups {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "OTF: [{}], REF: [{}], REFHOT: [{}], HOT: [{}]",
            self.otf.iter().join(", "),
            self.refs.iter().join(", "),
            self.ref_hots.iter().join(", "),
            self.hots.iter().join(", ")
        )
    }
}

/// Find the scans of every scan type belonging to the mixer. Rows with a
/// non-zero row flag are ignored. Empty groups are not an error; callers need
/// to check.
pub fn classify_scans(mixer: i32, batch: &SpectrumBatch) -> ScanGroups {
    let mut groups = ScanGroups::default();
    for record in batch.records().filter(|r| r.is_valid() && r.mixer == mixer) {
        let group = match record.scan_type {
            Some(ScanType::Otf) => &mut groups.otf,
            Some(ScanType::Ref) => &mut groups.refs,
            Some(ScanType::RefHot) => &mut groups.ref_hots,
            Some(ScanType::Hot) => &mut groups.hots,
            None => continue,
        };
        group.insert(record.scan_id);
    }
    groups
}
