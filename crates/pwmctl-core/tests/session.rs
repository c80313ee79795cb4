//! End-to-end runs against the fake sysfs tree

mod common;

use std::io;
use std::path::Path;
use std::time::Duration;

use common::{channel_path, chip_path, FakeSurface, ScriptedHold, NO_SLEEP, ROOT};
use pwmctl_core::{ErrorKind, HoldOutcome, PwmError, Registry, RunRequest, Session};

fn request(pins: &[&str]) -> RunRequest
{
    RunRequest {
        pins: pins.iter().map(ToString::to_string).collect(),
        period_ns: 20_000_000,
        duty_ns: 1_500_000,
        hold: Duration::ZERO,
        unexport: false,
    }
}

fn session<'a>(registry: &'a Registry, surface: &FakeSurface) -> Session<'a, FakeSurface>
{
    Session::new(registry, ROOT, surface.clone()).with_export_wait(NO_SLEEP)
}

#[test]
fn test_two_pins_enabled_then_disabled_in_order()
{
    let registry = Registry::jetson_hdr40();
    let surface = FakeSurface::with_chips(&[2, 3]);
    let mut hold = ScriptedHold::watching(HoldOutcome::Elapsed, &surface);

    let report = session(&registry, &surface)
        .run(&request(&["pwm5", "pwm7"]), &mut hold)
        .unwrap();

    assert_eq!(report.pins, ["pwm5", "pwm7"]);
    assert_eq!(report.hold, HoldOutcome::Elapsed);
    assert!(report.cleanup_failures.is_empty());
    assert_eq!(hold.calls, [Duration::ZERO]);
    assert_eq!(
        surface.log(),
        [
            "pwmchip2/export=0",
            "pwmchip2/pwm0/enable=0",
            "pwmchip2/pwm0/period=20000000",
            "pwmchip2/pwm0/duty_cycle=1500000",
            "pwmchip3/export=0",
            "pwmchip3/pwm0/enable=0",
            "pwmchip3/pwm0/period=20000000",
            "pwmchip3/pwm0/duty_cycle=1500000",
            "pwmchip2/pwm0/enable=1",
            "pwmchip3/pwm0/enable=1",
            "pwmchip2/pwm0/enable=0",
            "pwmchip3/pwm0/enable=0",
        ]
    );
    // both outputs were running when the hold started
    assert_eq!(hold.writes_at_hold, Some(10));
}

#[test]
fn test_empty_pin_list_selects_all_pins()
{
    let registry = Registry::jetson_hdr40();
    let surface = FakeSurface::with_chips(&[2, 3]);
    let mut hold = ScriptedHold::new(HoldOutcome::Elapsed);

    let report = session(&registry, &surface).run(&request(&[]), &mut hold).unwrap();
    assert_eq!(report.pins, ["pwm5", "pwm7"]);
}

#[test]
fn test_unknown_pin_rejects_run_without_writes()
{
    let registry = Registry::jetson_hdr40();
    let surface = FakeSurface::with_chips(&[2, 3]);
    let mut hold = ScriptedHold::new(HoldOutcome::Elapsed);

    let err = session(&registry, &surface)
        .run(&request(&["pwm5", "pwm9"]), &mut hold)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Resolution);
    assert!(matches!(err, PwmError::UnknownPin { ref name, .. } if name == "pwm9"));
    assert!(surface.writes().is_empty());
    assert!(hold.calls.is_empty());
}

#[test]
fn test_duty_equal_to_period_rejects_run_without_writes()
{
    let registry = Registry::jetson_hdr40();
    let surface = FakeSurface::with_chips(&[2, 3]);
    let mut hold = ScriptedHold::new(HoldOutcome::Elapsed);
    let request = RunRequest {
        duty_ns: 20_000_000,
        ..request(&["pwm5", "pwm7"])
    };

    let err = session(&registry, &surface).run(&request, &mut hold).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(surface.writes().is_empty());
    assert_eq!(surface.probes(&chip_path(2)), 0);
}

#[test]
fn test_interrupted_hold_still_disables_every_channel()
{
    let registry = Registry::jetson_hdr40();
    let surface = FakeSurface::with_chips(&[2, 3]);
    let mut hold = ScriptedHold::new(HoldOutcome::Interrupted);
    let request = RunRequest {
        hold: Duration::from_secs(3600),
        ..request(&["pwm5", "pwm7"])
    };

    let report = session(&registry, &surface).run(&request, &mut hold).unwrap();
    assert!(report.was_interrupted());
    assert!(report.cleanup_failures.is_empty());
    assert_eq!(hold.calls, [Duration::from_secs(3600)]);

    let log = surface.log();
    assert_eq!(&log[log.len() - 2..], ["pwmchip2/pwm0/enable=0", "pwmchip3/pwm0/enable=0"]);
}

#[test]
fn test_setup_failure_disables_channels_already_configured()
{
    let registry = Registry::jetson_hdr40();
    // pwmchip3 is missing, so pwm7 fails after pwm5 is configured
    let surface = FakeSurface::with_chips(&[2]);
    let mut hold = ScriptedHold::new(HoldOutcome::Elapsed);

    let err = session(&registry, &surface)
        .run(&request(&["pwm5", "pwm7"]), &mut hold)
        .unwrap_err();

    assert!(matches!(err, PwmError::ChipMissing { .. }));
    assert!(hold.calls.is_empty());
    let log = surface.log();
    assert!(!log.iter().any(|w| w.ends_with("enable=1")));
    assert_eq!(log.last().map(String::as_str), Some("pwmchip2/pwm0/enable=0"));
}

#[test]
fn test_enable_failure_disables_all_channels()
{
    let registry = Registry::jetson_hdr40();
    let surface = FakeSurface::with_chips(&[2, 3]);
    surface.add_dir(channel_path(3, 0));
    let mut hold = ScriptedHold::new(HoldOutcome::Elapsed);

    // EINVAL on pwm7's enable is tolerated while configuring but fatal when enabling
    let session = session(&registry, &surface);
    let plan = session.plan(&request(&["pwm5", "pwm7"])).unwrap();
    surface.fail_writes(channel_path(3, 0).join("enable"), io::ErrorKind::InvalidInput);

    let err = session.execute(&plan, &mut hold).unwrap_err();
    assert!(matches!(err, PwmError::Write { ref value, .. } if value == "1"));
    assert!(hold.calls.is_empty());

    let log = surface.log();
    assert_eq!(
        &log[log.len() - 3..],
        ["pwmchip3/pwm0/enable=1", "pwmchip2/pwm0/enable=0", "pwmchip3/pwm0/enable=0"]
    );
}

#[test]
fn test_cleanup_failure_does_not_block_siblings()
{
    let registry = Registry::jetson_hdr40();
    let surface = FakeSurface::with_chips(&[2, 3]);

    let session = session(&registry, &surface);
    let plan = session.plan(&request(&["pwm5", "pwm7"])).unwrap();

    // Fail pwm5's enable only once it is running: the hold is the last step before cleanup
    struct FailingHold
    {
        surface: FakeSurface,
    }
    impl pwmctl_core::Hold for FailingHold
    {
        fn hold(&mut self, _duration: Duration) -> HoldOutcome
        {
            self.surface
                .fail_writes(channel_path(2, 0).join("enable"), io::ErrorKind::PermissionDenied);
            HoldOutcome::Elapsed
        }
    }
    let mut failing = FailingHold {
        surface: surface.clone(),
    };

    let report = session.execute(&plan, &mut failing).unwrap();
    assert_eq!(report.cleanup_failures.len(), 1);
    assert_eq!(report.cleanup_failures[0].pin, "pwm5");
    assert_eq!(report.cleanup_failures[0].error.kind(), ErrorKind::Io);

    let log = surface.log();
    assert_eq!(log.last().map(String::as_str), Some("pwmchip3/pwm0/enable=0"));
}

#[test]
fn test_each_pin_is_announced_just_before_its_export()
{
    let registry = Registry::jetson_hdr40();
    // pwmchip3 is missing, so pwm7 is announced and then fails
    let surface = FakeSurface::with_chips(&[2]);
    let mut hold = ScriptedHold::new(HoldOutcome::Elapsed);

    let session = session(&registry, &surface);
    assert_eq!(session.root(), Path::new(ROOT));
    let plan = session.plan(&request(&["pwm5", "pwm7"])).unwrap();

    let mut announced = Vec::new();
    let err = session
        .execute_with(&plan, &mut hold, |pin| announced.push((pin.name.clone(), surface.writes().len())))
        .unwrap_err();

    assert!(matches!(err, PwmError::ChipMissing { .. }));
    // pwm5 had its export and three configure writes before pwm7 was announced
    assert_eq!(announced, [("pwm5".to_string(), 0), ("pwm7".to_string(), 4)]);
}

#[test]
fn test_unexport_after_disable()
{
    let registry = Registry::jetson_hdr40();
    let surface = FakeSurface::with_chips(&[2]);
    let mut hold = ScriptedHold::new(HoldOutcome::Elapsed);
    let request = RunRequest {
        unexport: true,
        ..request(&["pwm5"])
    };

    session(&registry, &surface).run(&request, &mut hold).unwrap();

    let log = surface.log();
    assert_eq!(&log[log.len() - 2..], ["pwmchip2/pwm0/enable=0", "pwmchip2/unexport=0"]);
}

#[test]
fn test_channels_stay_exported_by_default()
{
    let registry = Registry::jetson_hdr40();
    let surface = FakeSurface::with_chips(&[2]);
    let mut hold = ScriptedHold::new(HoldOutcome::Elapsed);

    session(&registry, &surface).run(&request(&["pwm5"]), &mut hold).unwrap();
    assert!(!surface.log().iter().any(|w| w.contains("unexport")));
}
