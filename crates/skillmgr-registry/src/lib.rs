mod catalog;
mod fs_ops;
mod git_ops;
mod handle;
mod listing_index;
mod snapshot_state;
mod source_state;
mod source_store;
mod source_sync;
mod source_types;
mod transport;

pub use catalog::PackageCatalog;
pub use handle::{PackageHandle, Transport};
pub use listing_index::{ConfiguredListingIndex, ListingIndex};
pub use source_store::SkillSourceStore;
pub use source_types::{
    SkillSourceKind, SkillSourceRecord, SkillSourceSnapshotState, SkillSourceWithSnapshotState,
    SourceUpdateResult, SourceUpdateStatus,
};
pub use transport::{GitTransport, RUNTIME_REQUIREMENTS_FILE, SYSTEM_REQUIREMENTS_FILE};

pub(crate) use fs_ops::{
    compute_filesystem_snapshot_id, copy_source_to_temp, current_unix_timestamp, listing_files,
    unique_suffix, validate_staged_source_layout,
};
pub(crate) use git_ops::{git_head_snapshot_id, git_ls_remote_head, run_git_clone, run_git_command};
pub(crate) use snapshot_state::{
    read_snapshot_id, read_snapshot_state, snapshot_is_fresh, source_has_ready_snapshot,
    write_snapshot_file,
};
pub(crate) use source_state::{
    parse_source_state_file, select_update_sources, sort_sources, validate_source_location,
    validate_source_name, SkillSourceStateFile,
};
pub(crate) use source_sync::update_source;

#[cfg(test)]
mod tests;
