// Run:
//   cargo test --test requirements -- --nocapture

mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use common::*;

use command_framework::{
    CommandScheduler,
    ConflictResolution,
    InterruptionBehavior,
    MemorySink,
    ScheduleOutcome,
    SchedulerConfig,
    SchedulerError,
    SequentialCommandGroup,
    Subsystem,
    SubsystemRef,
    TelemetryValue,
};
use command_framework::CommandExt;


#[test]
fn incoming_command_interrupts_a_cancel_self_holder() {
    setup();
    let j = journal();
    let arm = SubsystemRef::named("arm");
    let holder = MockCommand::new("holder", &j).requiring(&arm).handle();
    let incoming = MockCommand::new("incoming", &j).requiring(&arm).handle();

    holder.schedule().unwrap();
    assert_eq!(incoming.schedule().unwrap(), ScheduleOutcome::Scheduled);

    assert_eq!(
        entries(&j),
        vec!["holder.initialize", "holder.end(true)", "incoming.initialize"]
    );
    assert!(!holder.is_scheduled());
    assert_eq!(CommandScheduler::instance().requiring(&arm), Some(incoming.clone()));
    assert_eq!(arm.current_command(), Some(incoming));
}

#[test]
fn cancel_incoming_holder_blocks_the_incoming_command() {
    setup();
    let j = journal();
    let arm = SubsystemRef::named("arm");
    let holder = MockCommand::new("holder", &j).requiring(&arm).cancel_incoming().handle();
    let incoming = MockCommand::new("incoming", &j).requiring(&arm).handle();

    holder.schedule().unwrap();
    let outcome = incoming.schedule().unwrap();

    assert_eq!(outcome, ScheduleOutcome::Blocked { by: holder.id() });
    assert!(!outcome.is_scheduled());
    assert!(holder.is_scheduled());
    assert!(!incoming.is_scheduled());
    assert_eq!(entries(&j), vec!["holder.initialize"]);
}

#[test]
fn explicit_cancel_ignores_interruption_behavior() {
    setup();
    let j = journal();
    let holder = MockCommand::new("holder", &j).cancel_incoming().handle();

    holder.schedule().unwrap();
    holder.cancel();

    assert_eq!(count(&j, "holder.end(true)"), 1);
}

#[test]
fn in_order_resolution_keeps_cancellations_made_before_a_blocker() {
    setup();
    let j = journal();
    let arm = SubsystemRef::named("arm");
    let wrist = SubsystemRef::named("wrist");
    let polite = MockCommand::new("polite", &j).requiring(&arm).handle();
    let stubborn = MockCommand::new("stubborn", &j).requiring(&wrist).cancel_incoming().handle();
    let incoming = MockCommand::new("incoming", &j).requiring(&arm).requiring(&wrist).handle();

    polite.schedule().unwrap();
    stubborn.schedule().unwrap();
    let outcome = incoming.schedule().unwrap();

    assert_eq!(outcome, ScheduleOutcome::Blocked { by: stubborn.id() });
    assert!(!polite.is_scheduled());
    assert_eq!(count(&j, "polite.end(true)"), 1);
    assert!(stubborn.is_scheduled());
    assert!(!incoming.is_scheduled());
    assert_eq!(CommandScheduler::instance().requiring(&arm), None);
}

#[test]
fn check_then_cancel_resolution_leaves_everything_untouched_when_blocked() {
    CommandScheduler::reset_instance();
    CommandScheduler::init(SchedulerConfig {
        conflict_resolution: ConflictResolution::CheckThenCancel,
        ..SchedulerConfig::default()
    })
    .unwrap();

    let j = journal();
    let arm = SubsystemRef::named("arm");
    let wrist = SubsystemRef::named("wrist");
    let polite = MockCommand::new("polite", &j).requiring(&arm).handle();
    let stubborn = MockCommand::new("stubborn", &j).requiring(&wrist).cancel_incoming().handle();
    let incoming = MockCommand::new("incoming", &j).requiring(&arm).requiring(&wrist).handle();

    polite.schedule().unwrap();
    stubborn.schedule().unwrap();
    let outcome = incoming.schedule().unwrap();

    assert_eq!(outcome, ScheduleOutcome::Blocked { by: stubborn.id() });
    assert!(polite.is_scheduled());
    assert_eq!(count(&j, "polite.end(true)"), 0);
}

#[test]
fn scheduled_requirement_sets_stay_disjoint() {
    setup();
    let j = journal();
    let arm = SubsystemRef::named("arm");
    let wrist = SubsystemRef::named("wrist");
    let claw = SubsystemRef::named("claw");
    let all = [arm.clone(), wrist.clone(), claw.clone()];

    let commands = [
        MockCommand::new("a", &j).requiring(&arm).handle(),
        MockCommand::new("b", &j).requiring(&wrist).requiring(&claw).handle(),
        MockCommand::new("c", &j).requiring(&arm).requiring(&wrist).handle(),
        MockCommand::new("d", &j).requiring(&claw).cancel_incoming().handle(),
        MockCommand::new("e", &j).requiring(&claw).requiring(&arm).handle(),
        MockCommand::new("f", &j).requiring(&wrist).handle(),
    ];

    for command in commands.iter().chain(commands.iter().rev()) {
        command.schedule().unwrap();
        assert_exclusive(&all);
        CommandScheduler::instance().run();
        assert_exclusive(&all);
    }
}

#[test]
fn default_command_is_initialized_on_the_tick_its_subsystem_frees_up() {
    setup();
    let j = journal();
    let arm = SubsystemRef::named("arm");
    let scheduler = CommandScheduler::instance();
    let default = MockCommand::new("default", &j).requiring(&arm).handle();
    let task = MockCommand::new("task", &j).requiring(&arm);
    let done = task.finished_flag();
    let task = task.handle();

    arm.set_default_command(default.clone()).unwrap();
    task.schedule().unwrap();
    scheduler.run();
    assert_eq!(entries(&j), vec!["task.initialize", "task.execute"]);

    clear(&j);
    done.set(true);
    scheduler.run();
    assert_eq!(entries(&j), vec!["task.execute", "task.end(false)", "default.initialize"]);

    clear(&j);
    scheduler.run();
    assert_eq!(entries(&j), vec!["default.execute"]);
}

#[test]
fn default_command_is_interrupted_by_other_commands() {
    setup();
    let j = journal();
    let arm = SubsystemRef::named("arm");
    let scheduler = CommandScheduler::instance();
    let default = MockCommand::new("default", &j).requiring(&arm).handle();
    arm.set_default_command(default.clone()).unwrap();

    scheduler.run();
    assert!(default.is_scheduled());

    let task = MockCommand::new("task", &j).requiring(&arm).instant().handle();
    task.schedule().unwrap();
    assert_eq!(count(&j, "default.end(true)"), 1);

    scheduler.run();
    assert!(default.is_scheduled());
    assert_eq!(count(&j, "default.initialize"), 2);
}

#[test]
fn default_command_must_require_its_subsystem() {
    setup();
    let j = journal();
    let arm = SubsystemRef::named("arm");
    let unrelated = MockCommand::new("unrelated", &j).handle();

    let err = arm.set_default_command(unrelated).unwrap_err();

    assert_eq!(
        err,
        SchedulerError::DefaultCommandMissingRequirement {
            command: "unrelated".into(),
            subsystem: "arm".into(),
        }
    );
    assert_eq!(arm.default_command(), None);
}

#[test]
fn default_command_cannot_be_composed() {
    setup();
    let j = journal();
    let arm = SubsystemRef::named("arm");
    let child = MockCommand::new("child", &j).requiring(&arm).handle();
    let _group = SequentialCommandGroup::new(vec![child.clone().boxed()]);

    let err = arm.set_default_command(child).unwrap_err();

    assert_eq!(err, SchedulerError::ComposedCommand { name: "child".into() });
}

#[test]
fn removed_default_command_is_not_rescheduled() {
    setup();
    let j = journal();
    let arm = SubsystemRef::named("arm");
    let scheduler = CommandScheduler::instance();
    let default = MockCommand::new("default", &j).requiring(&arm).instant().handle();
    arm.set_default_command(default.clone()).unwrap();

    scheduler.run();
    assert_eq!(count(&j, "default.initialize"), 1);

    arm.remove_default_command();
    scheduler.run();
    scheduler.run();

    assert_eq!(count(&j, "default.initialize"), 1);
    assert!(!default.is_scheduled());
}

#[test]
fn commands_not_running_when_disabled_are_cancelled_without_executing() {
    setup();
    let j = journal();
    let scheduler = CommandScheduler::instance();
    let enabled = Rc::new(Cell::new(true));
    {
        let enabled = enabled.clone();
        scheduler.set_enabled_source(move || enabled.get());
    }

    let gated = MockCommand::new("gated", &j).handle();
    let always = MockCommand::new("always", &j).run_disabled(true).handle();
    gated.schedule().unwrap();
    always.schedule().unwrap();
    scheduler.run();

    clear(&j);
    enabled.set(false);
    scheduler.run();

    assert_eq!(entries(&j), vec!["gated.end(true)", "always.execute"]);
    assert!(!gated.is_scheduled());
    assert!(always.is_scheduled());

    let late = MockCommand::new("late", &j).handle();
    assert_eq!(late.schedule().unwrap(), ScheduleOutcome::RobotDisabled);
}

#[test]
fn subsystems_run_periodic_in_registration_order_before_commands() {
    setup();
    let j = journal();
    let scheduler = CommandScheduler::instance();
    let drive = JournalSubsystem::new("drive", &j);
    let arm = JournalSubsystem::new("arm", &j);
    arm.register();

    let command = MockCommand::new("cmd", &j).handle();
    command.schedule().unwrap();
    clear(&j);
    scheduler.run();

    assert_eq!(entries(&j), vec!["drive.periodic", "arm.periodic", "cmd.execute"]);
    assert_eq!(scheduler.subsystems(), vec![drive.clone(), arm.clone()]);

    scheduler.unregister_subsystem(&drive);
    clear(&j);
    scheduler.run();
    assert_eq!(entries(&j), vec!["arm.periodic", "cmd.execute"]);

    scheduler.unregister_all_subsystems();
    assert!(scheduler.subsystems().is_empty());
}

#[test]
fn constructed_subsystems_run_periodic_on_the_first_tick() {
    setup();
    let j = journal();
    let scheduler = CommandScheduler::instance();
    let owned = JournalSubsystem::new("owned", &j);
    let shared = Rc::new(RefCell::new(Counter { ticks: 0 }));
    let shared_ref = SubsystemRef::from_shared(&shared);

    scheduler.run();

    assert_eq!(entries(&j), vec!["owned.periodic"]);
    assert_eq!(shared.borrow().ticks, 1);
    assert_eq!(scheduler.subsystems(), vec![owned, shared_ref.clone()]);

    scheduler.unregister_subsystem(&shared_ref);
    scheduler.run();
    assert_eq!(shared.borrow().ticks, 1);

    shared_ref.register();
    scheduler.run();
    assert_eq!(shared.borrow().ticks, 2);
}

struct Counter {
    ticks: u32,
}

impl Subsystem for Counter {
    fn periodic(&mut self) {
        self.ticks += 1;
    }
}

#[test]
fn subsystem_factories_require_the_subsystem() {
    setup();
    let arm = SubsystemRef::named("arm");
    let hits = Rc::new(Cell::new(0));

    let command = {
        let hits = hits.clone();
        arm.run(move || hits.set(hits.get() + 1)).into_handle()
    };
    command.schedule().unwrap();
    CommandScheduler::instance().run();
    CommandScheduler::instance().run();

    assert_eq!(hits.get(), 2);
    assert_eq!(arm.current_command(), Some(command.clone()));

    let once = arm.run_once(|| {}).into_handle();
    once.schedule().unwrap();
    assert!(!command.is_scheduled());
    assert_eq!(arm.current_command(), Some(once));
}

#[test]
fn cancel_incoming_default_commands_are_accepted() {
    setup();
    let j = journal();
    let arm = SubsystemRef::named("arm");
    let default = MockCommand::new("default", &j)
        .requiring(&arm)
        .handle();
    let stubborn = arm.idle().with_interrupt_behavior(InterruptionBehavior::CancelIncoming).into_handle();

    arm.set_default_command(default).unwrap();
    arm.set_default_command(stubborn.clone()).unwrap();

    assert_eq!(arm.default_command(), Some(stubborn));
}

#[test]
fn subsystem_telemetry_reports_default_and_current_commands() {
    setup();
    let j = journal();
    let arm = SubsystemRef::named("arm");
    let default = MockCommand::new("default", &j).requiring(&arm).handle();
    arm.set_default_command(default).unwrap();

    let mut sink = MemorySink::new();
    arm.publish_telemetry(&mut sink);
    assert_eq!(sink.get("arm/.hasDefault"), Some(&TelemetryValue::Bool(true)));
    assert_eq!(sink.get("arm/.default"), Some(&TelemetryValue::Str("default".into())));
    assert_eq!(sink.get("arm/.hasCommand"), Some(&TelemetryValue::Bool(false)));
    assert_eq!(sink.get("arm/.command"), Some(&TelemetryValue::Str("none".into())));

    CommandScheduler::instance().run();
    arm.publish_telemetry(&mut sink);
    assert_eq!(sink.get("arm/.hasCommand"), Some(&TelemetryValue::Bool(true)));
    assert_eq!(sink.get("arm/.command"), Some(&TelemetryValue::Str("default".into())));
}
