//! Global constants for rift-text

pub mod blocks {
    /// Allocation granularity; block capacities are rounded up to a multiple of this
    pub const MIN_ALLOC: usize = 64;

    /// Preferred maximum block size after an edit. Blocks only grow past this
    /// when they hold a single line that cannot be split.
    pub const BLOCK_EDIT_SIZE: usize = 512;

    /// Blocks smaller than this are merged with their successor after a delete
    /// when the combined size still fits in `BLOCK_EDIT_SIZE`.
    pub const BLOCK_MERGE_SIZE: usize = BLOCK_EDIT_SIZE / 4;

    /// Preferred block size when chunking a freshly loaded file
    pub const LOAD_BLOCK_SIZE: usize = 8 * 1024;

    /// Round `size` up to the allocation granularity
    #[must_use]
    pub const fn alloc_round(size: usize) -> usize {
        (size + MIN_ALLOC - 1) & !(MIN_ALLOC - 1)
    }
}

pub mod ui {
    /// Display text for buffers with no file path
    pub const NO_NAME: &str = "[No Name]";
}

pub mod errors {
    // Error Codes
    pub const LOAD_FAILED: &str = "LOAD_FAILED";
    pub const SAVE_FAILED: &str = "SAVE_FAILED";
    pub const NO_PATH: &str = "NO_PATH";
    pub const READ_ONLY: &str = "READ_ONLY";
    pub const INVALID_CURSOR: &str = "INVALID_CURSOR";
    pub const OUT_OF_RANGE: &str = "OUT_OF_RANGE";
    pub const UNKNOWN_VIEW: &str = "UNKNOWN_VIEW";
    pub const SETTING_PARSE_ERROR: &str = "SETTING_PARSE_ERROR";
    pub const SETTING_VALIDATION_ERROR: &str = "SETTING_VALIDATION_ERROR";
    pub const UNKNOWN_SETTING: &str = "UNKNOWN_SETTING";

    // Error Messages
    pub const MSG_NO_FILE_NAME: &str = "No file name";
    pub const MSG_READ_ONLY: &str = "Buffer is read-only";
}

pub mod history {
    pub const NOTHING_TO_UNDO: &str = "Nothing to undo.";
    pub const NOTHING_TO_REDO: &str = "Nothing to redo.";
}
