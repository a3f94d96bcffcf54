//! Dispatcher tests, driven through `Framework::run`.

use super::*;
use crate::config::CONFIG_ENV;
use crate::exec::ScopedEnv;
use crate::paths::WORKSPACE_ENV;
use chrono::TimeZone;
use serial_test::serial;
use std::cell::RefCell;
use std::rc::Rc;
use tempfile::TempDir;

type Seen = Rc<RefCell<Vec<Invocation>>>;

fn argv(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|s| s.to_string()).collect()
}

/// Keep settings discovery away from the developer's environment.
fn isolated_env() -> ScopedEnv {
    let mut env = ScopedEnv::new();
    env.remove(CONFIG_ENV).unwrap();
    env.remove(WORKSPACE_ENV).unwrap();
    env
}

fn recording(name: &str, schema: ArgSchema, seen: &Seen) -> CommandSpec {
    let seen = Rc::clone(seen);
    CommandSpec::new(name, move |invocation| {
        seen.borrow_mut().push(invocation.clone());
        Ok(())
    })
    .args(schema)
}

fn build_registry(seen: &Seen) -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry
        .register_named(recording("build", ArgSchema::new().optional("target", "debug"), seen))
        .unwrap();
    registry
        .register_named(CommandSpec::new("fail", |_| {
            Err(DushError::Config("something broke".to_string()))
        }))
        .unwrap();
    registry
        .register_named(CommandSpec::new("stop", |_| {
            Err(DushError::Interrupted {
                command: "sleep 100".to_string(),
            })
        }))
        .unwrap();
    registry
        .register_named(CommandSpec::new("explode", |_| panic!("unexpected state")))
        .unwrap();
    registry
        .register_named(CommandSpec::new("needs", |_| Ok(())).args(ArgSchema::new().required("value")))
        .unwrap();
    registry
}

#[test]
#[serial]
fn test_build_with_keyword_and_verbose_flag() {
    let _env = isolated_env();
    let seen: Seen = Rc::default();
    let mut framework = Framework::new(build_registry(&seen));

    let code = framework.run(&argv(&["tool", "build", "--target=release", "--", "-v"]));

    assert_eq!(code, exit_codes::SUCCESS);
    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].name, "build");
    assert_eq!(seen[0].args.get("target"), "release");
    assert!(seen[0].flags.verbose);
}

#[test]
#[serial]
fn test_default_argument_applied() {
    let _env = isolated_env();
    let seen: Seen = Rc::default();
    let mut framework = Framework::new(build_registry(&seen));

    assert_eq!(framework.run(&argv(&["tool", "build"])), exit_codes::SUCCESS);
    assert_eq!(seen.borrow()[0].args.get("target"), "debug");
}

#[test]
#[serial]
fn test_unknown_command() {
    let _env = isolated_env();
    let seen: Seen = Rc::default();
    let mut framework = Framework::new(build_registry(&seen));

    assert_eq!(framework.run(&argv(&["tool", "deploy"])), exit_codes::FAILURE);
    assert!(seen.borrow().is_empty());
}

#[test]
#[serial]
fn test_missing_command_name() {
    let _env = isolated_env();
    let seen: Seen = Rc::default();
    let mut framework = Framework::new(build_registry(&seen));

    assert_eq!(framework.run(&argv(&["tool"])), exit_codes::FAILURE);
    assert_eq!(framework.run(&argv(&["tool", "--", "-v"])), exit_codes::FAILURE);
}

#[test]
#[serial]
fn test_parse_error_exits_with_failure() {
    let _env = isolated_env();
    let seen: Seen = Rc::default();
    let mut framework = Framework::new(build_registry(&seen));

    assert_eq!(
        framework.run(&argv(&["tool", "build", "--target"])),
        exit_codes::FAILURE
    );
    assert_eq!(
        framework.run(&argv(&["tool", "build", "--", "--unknown"])),
        exit_codes::FAILURE
    );
    assert!(seen.borrow().is_empty());
}

#[test]
#[serial]
fn test_help_does_not_invoke() {
    let _env = isolated_env();
    let seen: Seen = Rc::default();
    let mut framework = Framework::new(build_registry(&seen));

    assert_eq!(
        framework.run(&argv(&["tool", "build", "--", "--help"])),
        exit_codes::SUCCESS
    );
    assert!(seen.borrow().is_empty());
}

#[test]
#[serial]
fn test_failing_command() {
    let _env = isolated_env();
    let seen: Seen = Rc::default();
    let mut framework = Framework::new(build_registry(&seen));

    assert_eq!(framework.run(&argv(&["tool", "fail"])), exit_codes::FAILURE);
    assert_eq!(
        framework.run(&argv(&["tool", "fail", "--", "-q"])),
        exit_codes::FAILURE
    );
}

#[test]
#[serial]
fn test_interrupted_command() {
    let _env = isolated_env();
    let seen: Seen = Rc::default();
    let mut framework = Framework::new(build_registry(&seen));

    assert_eq!(framework.run(&argv(&["tool", "stop"])), exit_codes::INTERRUPTED);
}

#[test]
#[serial]
fn test_panicking_command() {
    let _env = isolated_env();
    let seen: Seen = Rc::default();
    let mut framework = Framework::new(build_registry(&seen));

    assert_eq!(framework.run(&argv(&["tool", "explode"])), exit_codes::FAILURE);
}

#[test]
#[serial]
fn test_binding_failure() {
    let _env = isolated_env();
    let seen: Seen = Rc::default();
    let mut framework = Framework::new(build_registry(&seen));

    assert_eq!(framework.run(&argv(&["tool", "needs"])), exit_codes::FAILURE);
    assert_eq!(
        framework.run(&argv(&["tool", "needs", "--value=x"])),
        exit_codes::SUCCESS
    );
}

#[test]
#[serial]
fn test_list_command_registered_last() {
    let _env = isolated_env();
    let seen: Seen = Rc::default();
    let mut framework = Framework::new(build_registry(&seen));

    assert_eq!(framework.run(&argv(&["tool", "list"])), exit_codes::SUCCESS);
    let names = framework.registry().list();
    assert_eq!(names.last(), Some(&"list"));
    assert_eq!(names.iter().filter(|n| **n == "list").count(), 1);
}

#[test]
#[serial]
fn test_single_mode() {
    let _env = isolated_env();
    let seen: Seen = Rc::default();
    let mut registry = CommandRegistry::new();
    registry
        .register_single(recording(
            "ignored",
            ArgSchema::new().required("first").variadic("rest"),
            &seen,
        ))
        .unwrap();
    let mut framework = Framework::new(registry);

    let code = framework.run(&argv(&["tool", "a", "--b", "c", "--", "-q"]));

    assert_eq!(code, exit_codes::SUCCESS);
    let seen = seen.borrow();
    assert_eq!(seen[0].name, MAIN_COMMAND_NAME);
    assert_eq!(seen[0].args.get("first"), "a");
    assert_eq!(seen[0].args.rest(), &["--b".to_string(), "c".to_string()]);
    assert!(framework.registry().get("list").is_none());
}

#[test]
#[serial]
fn test_settings_reach_command() {
    let temp_dir = TempDir::new().unwrap();
    let settings_file = temp_dir.path().join("settings.yaml");
    std::fs::write(&settings_file, "shell: true\ndefault_timeout_seconds: 30\n").unwrap();

    let mut env = isolated_env();
    env.set(CONFIG_ENV, &settings_file).unwrap();

    let seen: Seen = Rc::default();
    let mut framework = Framework::new(build_registry(&seen));
    assert_eq!(framework.run(&argv(&["tool", "build"])), exit_codes::SUCCESS);

    let seen = seen.borrow();
    assert!(seen[0].settings.shell);
    assert_eq!(seen[0].settings.default_timeout_seconds, Some(30));
}

#[test]
#[serial]
fn test_invalid_settings_fail_before_invoking() {
    let temp_dir = TempDir::new().unwrap();
    let settings_file = temp_dir.path().join("settings.yaml");
    std::fs::write(&settings_file, "default_timeout_seconds: 0\n").unwrap();

    let mut env = isolated_env();
    env.set(CONFIG_ENV, &settings_file).unwrap();

    let seen: Seen = Rc::default();
    let mut framework = Framework::new(build_registry(&seen));
    assert_eq!(framework.run(&argv(&["tool", "build"])), exit_codes::FAILURE);
    assert!(seen.borrow().is_empty());
}

#[test]
fn test_summary_line_format() {
    let begin = Local.with_ymd_and_hms(2024, 1, 15, 10, 0, 5).unwrap();
    let end = Local.with_ymd_and_hms(2024, 1, 15, 11, 2, 7).unwrap();

    assert_eq!(
        summary_line(&Outcome::Success, begin, end),
        "\nSUCCESS   startTime=10:00:05 endTime=11:02:07 executionTime=1:02:02"
    );
    assert_eq!(
        summary_line(&Outcome::Error("boom".to_string()), begin, begin),
        "\nERROR: boom   startTime=10:00:05 endTime=10:00:05 executionTime=0:00:00"
    );
    assert!(summary_line(&Outcome::Interrupted, begin, end).starts_with("\nINTERRUPT (Ctrl+C detected)   "));
}

#[test]
fn test_summary_truncates_subseconds() {
    let begin = Local.with_ymd_and_hms(2024, 1, 15, 10, 0, 5).unwrap() + chrono::Duration::milliseconds(900);
    let end = Local.with_ymd_and_hms(2024, 1, 15, 10, 0, 6).unwrap() + chrono::Duration::milliseconds(100);

    assert!(summary_line(&Outcome::Success, begin, end).ends_with("executionTime=0:00:01"));
}

#[test]
fn test_outcome_exit_codes() {
    assert_eq!(Outcome::Success.exit_code(), 0);
    assert_eq!(Outcome::Error("x".to_string()).exit_code(), 1);
    assert_eq!(Outcome::Interrupted.exit_code(), 2);
}

fn interruptible_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry
        .register_named(CommandSpec::new("compute", |_| {
            interrupt::request();
            Ok(())
        }))
        .unwrap();
    registry
        .register_named(CommandSpec::new("steps", |invocation| {
            interrupt::request();
            interrupt::check(&invocation.name)?;
            panic!("check should have stopped the command");
        }))
        .unwrap();
    registry
        .register_named(CommandSpec::new("quick", |_| Ok(())))
        .unwrap();
    registry
}

#[test]
#[serial]
fn test_interrupt_during_in_process_work() {
    let _env = isolated_env();
    let mut framework = Framework::new(interruptible_registry());

    let code = framework.run(&argv(&["tool", "compute"]));
    interrupt::reset();

    assert_eq!(code, exit_codes::INTERRUPTED);
}

#[test]
#[serial]
fn test_interrupt_check_stops_command() {
    let _env = isolated_env();
    let mut framework = Framework::new(interruptible_registry());

    let code = framework.run(&argv(&["tool", "steps"]));
    interrupt::reset();

    assert_eq!(code, exit_codes::INTERRUPTED);
}

#[test]
#[serial]
fn test_stale_interrupt_cleared_before_invoking() {
    let _env = isolated_env();
    let mut framework = Framework::new(interruptible_registry());

    interrupt::request();
    assert_eq!(framework.run(&argv(&["tool", "quick"])), exit_codes::SUCCESS);
}

#[cfg(unix)]
#[test]
#[serial]
fn test_ctrl_c_signal_during_in_process_work() {
    use nix::sys::signal::{Signal, raise};
    use std::time::{Duration, Instant};

    let _env = isolated_env();
    let mut registry = CommandRegistry::new();
    registry
        .register_named(CommandSpec::new("compute", |_| {
            raise(Signal::SIGINT).map_err(|e| DushError::Io(e.to_string()))?;
            let deadline = Instant::now() + Duration::from_secs(2);
            while !interrupt::is_requested() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(10));
            }
            Ok(())
        }))
        .unwrap();
    let mut framework = Framework::new(registry);

    let code = framework.run(&argv(&["tool", "compute"]));
    interrupt::reset();

    assert_eq!(code, exit_codes::INTERRUPTED);
}
