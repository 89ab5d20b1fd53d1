// Run:
//   cargo test --test config -- --nocapture

use std::time::Duration;

use command_framework::{
    CommandScheduler,
    ConfigError,
    ConflictResolution,
    SchedulerConfig,
    SchedulerError,
};


#[test]
fn defaults_match_a_twenty_millisecond_loop() {
    let config = SchedulerConfig::default();

    assert_eq!(config.period(), Duration::from_millis(20));
    assert_eq!(config.conflict_resolution, ConflictResolution::InOrder);
    assert!(config.report_overruns);
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn empty_document_is_the_default_configuration() {
    assert_eq!(SchedulerConfig::from_toml("").unwrap(), SchedulerConfig::default());
}

#[test]
fn every_field_can_be_set_from_toml() {
    let config = SchedulerConfig::from_toml(
        r#"
            period_ms = 10
            conflict_resolution = "check_then_cancel"
            report_overruns = false
        "#,
    )
    .unwrap();

    assert_eq!(config.period_ms, 10);
    assert_eq!(config.conflict_resolution, ConflictResolution::CheckThenCancel);
    assert!(!config.report_overruns);
}

#[test]
fn unknown_fields_are_rejected() {
    let err = SchedulerConfig::from_toml("loop_period = 5").unwrap_err();

    assert!(matches!(err, ConfigError::CannotParseToml(_)));
}

#[test]
fn zero_period_is_rejected() {
    assert_eq!(SchedulerConfig::from_toml("period_ms = 0"), Err(ConfigError::ZeroPeriod));
}

#[test]
fn scheduler_can_be_initialized_from_toml_once() {
    CommandScheduler::reset_instance();

    let scheduler = CommandScheduler::init_from_toml("period_ms = 5").unwrap();
    assert_eq!(scheduler.config().period(), Duration::from_millis(5));
    assert_eq!(CommandScheduler::instance().config().period_ms, 5);

    let again = CommandScheduler::init(SchedulerConfig::default());
    assert!(matches!(again, Err(SchedulerError::AlreadyInitialized)));
}

#[test]
fn invalid_configuration_does_not_create_a_scheduler() {
    CommandScheduler::reset_instance();

    let err = CommandScheduler::init_from_toml("period_ms = 0").unwrap_err();
    assert_eq!(err, SchedulerError::Config(ConfigError::ZeroPeriod));

    // the default instance is still available
    assert_eq!(CommandScheduler::instance().config(), SchedulerConfig::default());
}
