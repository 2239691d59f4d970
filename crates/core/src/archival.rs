// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The archival exception: a successful `DROS/Spec` transfer is only
//! recorded `completed` — and therefore only eligible for purge — once it
//! has actually reached the archival host.

use crate::job::Job;

/// Path substring that marks spectrometer data subject to the archival
/// exception. Kept as a constant rather than promoted to config (see
/// `DESIGN.md`).
pub const SPEC_PATH_MARKER: &str = "DROS/Spec";

/// Is `job` eligible to be recorded as `completed` (and thus purgeable) on
/// successful transfer?
///
/// Non-spectrometer transfers are always eligible. Spectrometer transfers
/// are eligible only when the destination is remote and is the configured
/// archival host — this preserves the invariant that spectrometer data is
/// never purged from a recorder until it has reached the archive.
pub fn is_archival_eligible(job: &Job, archival_host: &str) -> bool {
    if !job.source_path.contains(SPEC_PATH_MARKER) {
        return true;
    }
    job.is_cross_host() && job.dest_host == archival_host
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(source_path: &str, dest_host: &str) -> Job {
        Job::new_copy("DR1", source_path, dest_host, "/archive/x", "1")
    }

    #[test]
    fn non_spec_paths_are_always_eligible() {
        assert!(is_archival_eligible(&job("/a/b.dat", "archive.example"), "archive.example"));
        assert!(is_archival_eligible(&job("/a/b.dat", ""), "archive.example"));
    }

    #[test]
    fn spec_paths_require_the_archival_host() {
        let j = job("/mnt/DROS/Spec/058123_001234567", "archive.example");
        assert!(is_archival_eligible(&j, "archive.example"));

        let wrong_host = job("/mnt/DROS/Spec/058123_001234567", "cluster.example");
        assert!(!is_archival_eligible(&wrong_host, "archive.example"));

        let local = Job::new_copy("DR1", "/mnt/DROS/Spec/x", "DR1", "/other/x", "1");
        assert!(!is_archival_eligible(&local, "archive.example"));
    }
}
