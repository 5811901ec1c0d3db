//! Production code must not sleep: time moves through the companion
//! timeline and the runtime waits on deadlines with `sleep_until`.

use architectural_enforcement::{find_sleep_violations, workspace_root, PRODUCTION_DIRS};

#[test]
fn test_production_dirs_exist() {
    let root = workspace_root();
    for dir in PRODUCTION_DIRS {
        assert!(root.join(dir).is_dir(), "missing source directory {dir}");
    }
}

#[test]
fn test_no_sleep_in_production_code() {
    let violations = find_sleep_violations(&workspace_root());

    if !violations.is_empty() {
        eprintln!("\nSleep calls found in production code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nSchedule work on the companion timeline instead, or wait with sleep_until.");

        panic!("Found {} sleep violation(s) in production code", violations.len());
    }
}
