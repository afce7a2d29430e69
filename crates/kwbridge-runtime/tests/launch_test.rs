//! Process-level launch behavior.
//!
//! Lives in its own test binary: launching claims the process, so nothing
//! else in this binary may launch.

use kwbridge_runtime::{RuntimeError, RuntimeOptions, is_launched, launch};

#[test]
fn only_one_runtime_per_process() {
    assert!(!is_launched());

    let options = RuntimeOptions::parse(["-ea", "-Dfile.encoding=UTF-8"]).unwrap();
    let runtime = launch(options).expect("first launch should succeed");
    assert!(is_launched());
    assert!(runtime.assertions_enabled());
    assert_eq!(runtime.property("file.encoding"), Some("UTF-8"));

    let second = launch(RuntimeOptions::default());
    assert!(matches!(second, Err(RuntimeError::AlreadyRunning)));
}
