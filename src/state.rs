use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::data::filter::FilterSpec;
use crate::data::model::BaseTable;
use crate::error::InvalidFilterError;
use crate::pipeline::{self, Projections};

// ---------------------------------------------------------------------------
// Explorer state
// ---------------------------------------------------------------------------

/// A recomputation request, stamped with the order in which it was issued.
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    spec: FilterSpec,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }
}

#[derive(Debug, Default)]
struct Installed {
    generation: u64,
    projections: Option<Arc<Projections>>,
}

/// Owner of the base table and of the latest complete [`Projections`].
///
/// Readers always see a whole set of projections, either the previous one
/// or the next one. A result is installed only if its ticket was issued
/// after the ticket of the installed result, so a slow recomputation for an
/// older spec can never overwrite a newer one. Rejected specs leave the
/// installed projections untouched.
#[derive(Debug)]
pub struct ExplorerState {
    base: Arc<BaseTable>,
    bin_count: usize,
    issued: AtomicU64,
    installed: Mutex<Installed>,
}

impl ExplorerState {
    pub fn new(base: Arc<BaseTable>, bin_count: usize) -> Self {
        Self {
            base,
            bin_count,
            issued: AtomicU64::new(0),
            installed: Mutex::new(Installed::default()),
        }
    }

    pub fn base(&self) -> &Arc<BaseTable> {
        &self.base
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    /// Issue a ticket for `spec`. Later calls always get later tickets.
    pub fn begin(&self, spec: FilterSpec) -> Ticket {
        let generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket { generation, spec }
    }

    /// Run the pipeline for a ticket. Touches no shared state.
    pub fn compute(&self, ticket: &Ticket) -> Result<Projections, InvalidFilterError> {
        pipeline::run(&self.base, &ticket.spec, self.bin_count)
    }

    /// Install the outcome of `compute` for `ticket`.
    ///
    /// Returns `Ok(true)` when installed, `Ok(false)` when a newer result is
    /// already in place, and the filter error unchanged when the spec was
    /// rejected.
    pub fn commit(
        &self,
        ticket: Ticket,
        outcome: Result<Projections, InvalidFilterError>,
    ) -> Result<bool, InvalidFilterError> {
        let projections = outcome.inspect_err(|e| {
            log::warn!("Rejected filter {:?}: {e}", ticket.spec);
        })?;

        let mut installed = self.lock();
        if ticket.generation <= installed.generation {
            log::debug!(
                "Discarding stale projections for generation {} (installed {})",
                ticket.generation,
                installed.generation
            );
            return Ok(false);
        }
        installed.generation = ticket.generation;
        installed.projections = Some(Arc::new(projections));
        Ok(true)
    }

    /// Begin, compute and commit in one synchronous step.
    pub fn refresh(&self, spec: FilterSpec) -> Result<bool, InvalidFilterError> {
        let ticket = self.begin(spec);
        let outcome = self.compute(&ticket);
        self.commit(ticket, outcome)
    }

    /// The latest installed projections, if any spec has succeeded yet.
    pub fn current(&self) -> Option<Arc<Projections>> {
        self.lock().projections.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Installed> {
        // Installed is replaced wholesale, so a poisoned lock still holds a
        // consistent value.
        self.installed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::data::aggregate::DEFAULT_BIN_COUNT;
    use crate::data::model::tests::listing;

    fn state() -> ExplorerState {
        let base = BaseTable::new(
            "mem",
            vec![
                listing("1", "Manhattan", 100, 10),
                listing("2", "Manhattan", 200, 20),
                listing("3", "Brooklyn", 50, 30),
            ],
            Vec::new(),
        );
        ExplorerState::new(Arc::new(base), DEFAULT_BIN_COUNT)
    }

    #[test]
    fn nothing_installed_before_first_refresh() {
        assert!(state().current().is_none());
    }

    #[test]
    fn refresh_installs_projections() {
        let state = state();
        assert!(state.refresh(FilterSpec::new("Brooklyn", 0, 1000)).unwrap());

        let current = state.current().unwrap();
        assert_eq!(current.view.len(), 1);
        assert_eq!(current.groups.len(), 1);
        assert_eq!(current.groups[0].group, "Brooklyn");
    }

    #[test]
    fn rejected_spec_keeps_previous_projections() {
        let state = state();
        state.refresh(FilterSpec::new("All", 0, 1000)).unwrap();
        let before = state.current().unwrap();

        let err = state.refresh(FilterSpec::new("All", 200, 100)).unwrap_err();
        assert_eq!(err, InvalidFilterError::InvertedRange { min: 200, max: 100 });

        let after = state.current().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.metrics.listing_count, 3);
    }

    #[test]
    fn stale_result_does_not_overwrite_newer_one() {
        let state = state();
        let older = state.begin(FilterSpec::new("All", 0, 1000));
        let newer = state.begin(FilterSpec::new("Manhattan", 0, 1000));

        let newer_out = state.compute(&newer);
        assert!(state.commit(newer, newer_out).unwrap());

        let older_out = state.compute(&older);
        assert!(!state.commit(older, older_out).unwrap());

        assert_eq!(state.current().unwrap().spec.region, "Manhattan");
    }

    #[test]
    fn tickets_are_strictly_increasing() {
        let state = state();
        let a = state.begin(FilterSpec::all_regions(10));
        let b = state.begin(FilterSpec::all_regions(10));
        assert!(b.generation() > a.generation());
    }

    #[test]
    fn concurrent_commits_keep_the_latest_ticket() {
        let state = Arc::new(state());
        let tickets: Vec<Ticket> = (0..16)
            .map(|i| state.begin(FilterSpec::new("All", 0, 100 + i)))
            .collect();
        let last_spec = tickets[tickets.len() - 1].spec().clone();

        let handles: Vec<_> = tickets
            .into_iter()
            .rev()
            .map(|ticket| {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    let outcome = state.compute(&ticket);
                    state.commit(ticket, outcome).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(state.current().unwrap().spec, last_spec);
    }
}
