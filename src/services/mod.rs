pub mod account_state;
pub mod backfill;
pub mod scan;

pub use account_state::AccountStateProvider;
pub use backfill::BackfillService;
pub use scan::{run_scan_loop, ScanReport, ScanService};
