//! Tests for rift-text error handling

use super::*;
use crate::constants::errors;

#[test]
fn test_error_type_display() {
    assert_eq!(format!("{}", ErrorType::Io), "IO");
    assert_eq!(format!("{}", ErrorType::Parse), "Parse");
    assert_eq!(format!("{}", ErrorType::Settings), "Settings");
    assert_eq!(format!("{}", ErrorType::Execution), "Execution");
}

#[test]
fn test_rift_error_display() {
    let err = RiftError::new(ErrorType::Execution, errors::OUT_OF_RANGE, "delete 5 bytes at 3");
    assert_eq!(err.code, "OUT_OF_RANGE");
    assert_eq!(
        format!("{}", err),
        "Execution(OUT_OF_RANGE): delete 5 bytes at 3"
    );
}

#[test]
fn test_contains_msg() {
    let err = RiftError::new(ErrorType::Io, errors::LOAD_FAILED, "the quick brown fox");
    assert!(err.contains_msg("quick"));
    assert!(err.contains_msg(""));
    assert!(!err.contains_msg("lazy"));
}

#[test]
fn test_result_alias() {
    fn produce_error() -> Result<()> {
        Err(RiftError::new(ErrorType::Execution, errors::READ_ONLY, "reason"))
    }

    assert_eq!(produce_error().unwrap_err().code, errors::READ_ONLY);
}

#[test]
fn test_rift_error_is_std_error() {
    let err = RiftError::new(ErrorType::Io, errors::SAVE_FAILED, "msg");
    let std_err: &dyn std::error::Error = &err;
    assert_eq!(format!("{}", std_err), "IO(SAVE_FAILED): msg");
}
