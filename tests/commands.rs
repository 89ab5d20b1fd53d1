// Run:
//   cargo test --test commands -- --nocapture

mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use common::*;

use command_framework::{
    cmd,
    Command,
    CommandExt,
    CommandScheduler,
    FunctionalCommand,
    PrintCommand,
    ScheduleCommand,
    SubsystemRef,
    Timer,
    WaitCommand,
    WaitUntilCommand,
};


fn tick() {
    CommandScheduler::instance().run();
}

#[test]
fn functional_command_calls_each_closure_in_its_phase() {
    setup();
    let calls: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let executions = Rc::new(Cell::new(0));

    let command = {
        let (c1, c2, c3) = (calls.clone(), calls.clone(), calls.clone());
        let (e1, e2) = (executions.clone(), executions.clone());
        FunctionalCommand::new(
            move || c1.borrow_mut().push("init".into()),
            move || {
                e1.set(e1.get() + 1);
                c2.borrow_mut().push("execute".into());
            },
            move |interrupted| c3.borrow_mut().push(format!("end({interrupted})")),
            move || e2.get() == 2,
            [],
        )
        .into_handle()
    };

    command.schedule().unwrap();
    tick();
    tick();
    tick();

    assert_eq!(*calls.borrow(), vec!["init", "execute", "execute", "end(false)"]);
}

#[test]
fn instant_command_acts_on_initialize_and_finishes_on_its_first_tick() {
    setup();
    let arm = SubsystemRef::named("arm");
    let hits = Rc::new(Cell::new(0));
    let command = {
        let hits = hits.clone();
        cmd::run_once(move || hits.set(hits.get() + 1), [arm.clone()]).into_handle()
    };

    command.schedule().unwrap();
    assert_eq!(hits.get(), 1);
    assert_eq!(arm.current_command(), Some(command.clone()));

    tick();
    assert_eq!(hits.get(), 1);
    assert!(!command.is_scheduled());
}

#[test]
fn run_command_acts_every_tick_until_cancelled() {
    setup();
    let hits = Rc::new(Cell::new(0));
    let command = {
        let hits = hits.clone();
        cmd::run(move || hits.set(hits.get() + 1), []).into_handle()
    };

    command.schedule().unwrap();
    for _ in 0..5 {
        tick();
    }
    command.cancel();
    tick();

    assert_eq!(hits.get(), 5);
}

#[test]
fn start_end_command_brackets_its_activation() {
    setup();
    let state: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
    let command = {
        let (on, off) = (state.clone(), state.clone());
        cmd::start_end(move || on.borrow_mut().push("start"), move || off.borrow_mut().push("end"), [])
            .into_handle()
    };

    command.schedule().unwrap();
    tick();
    tick();
    assert_eq!(*state.borrow(), vec!["start"]);

    command.cancel();
    assert_eq!(*state.borrow(), vec!["start", "end"]);
}

#[test]
fn idle_command_holds_its_subsystems_without_finishing() {
    setup();
    let arm = SubsystemRef::named("arm");
    let command = cmd::idle([arm.clone()]).into_handle();

    command.schedule().unwrap();
    for _ in 0..10 {
        tick();
    }

    assert!(command.is_scheduled());
    assert_eq!(arm.current_command(), Some(command));
}

#[test]
fn none_finishes_immediately() {
    setup();
    let command = cmd::none().into_handle();

    command.schedule().unwrap();
    tick();

    assert!(!command.is_scheduled());
}

#[test]
fn wait_command_finishes_after_its_duration() {
    let clock = setup();
    let wait = WaitCommand::new(Duration::from_millis(500));
    assert_eq!(wait.duration(), Duration::from_millis(500));
    assert!(wait.runs_when_disabled());

    let wait = wait.into_handle();
    wait.schedule().unwrap();
    clock.advance(Duration::from_millis(499));
    tick();
    assert!(wait.is_scheduled());

    clock.advance(Duration::from_millis(1));
    tick();
    assert!(!wait.is_scheduled());
}

#[test]
fn wait_command_restarts_on_every_activation() {
    let clock = setup();
    let wait = cmd::wait(Duration::from_secs(1)).into_handle();

    wait.schedule().unwrap();
    clock.advance(Duration::from_secs(2));
    tick();
    assert!(!wait.is_scheduled());

    wait.schedule().unwrap();
    tick();
    assert!(wait.is_scheduled());
}

#[test]
fn wait_until_finishes_when_its_condition_holds() {
    let clock = setup();
    let ready = Rc::new(Cell::new(false));
    let until_ready = {
        let ready = ready.clone();
        cmd::wait_until(move || ready.get()).into_handle()
    };
    let until_time = WaitUntilCommand::at(Duration::from_secs(3)).into_handle();

    CommandScheduler::instance().schedule_all([&until_ready, &until_time]).unwrap();
    tick();
    assert!(until_ready.is_scheduled() && until_time.is_scheduled());

    ready.set(true);
    clock.set(Duration::from_secs(3));
    tick();

    assert!(!until_ready.is_scheduled());
    assert!(!until_time.is_scheduled());
}

#[test]
fn print_command_finishes_immediately_and_runs_when_disabled() {
    setup();
    let print = PrintCommand::new("hello");
    assert!(print.runs_when_disabled());

    let print = print.into_handle();
    CommandScheduler::instance().set_enabled_source(|| false);
    print.schedule().unwrap();
    tick();

    assert!(!print.is_scheduled());
}

#[test]
fn schedule_command_starts_commands_it_does_not_own() {
    setup();
    let j = journal();
    let arm = SubsystemRef::named("arm");
    let forked = MockCommand::new("forked", &j).requiring(&arm).handle();
    let fork = ScheduleCommand::new([forked.clone()]);
    assert!(fork.requirements().is_empty());

    let fork = fork.into_handle();
    fork.schedule().unwrap();
    tick();

    assert!(!fork.is_scheduled());
    assert!(forked.is_scheduled());
    assert_eq!(entries(&j), vec!["forked.initialize", "forked.execute"]);
}

#[test]
fn timer_accumulates_running_time_only() {
    let clock = setup();
    let mut timer = Timer::new();
    assert!(!timer.is_running());

    clock.advance(Duration::from_secs(1));
    assert_eq!(timer.elapsed(), Duration::ZERO);

    timer.start();
    clock.advance(Duration::from_millis(300));
    timer.stop();
    clock.advance(Duration::from_secs(5));
    assert_eq!(timer.elapsed(), Duration::from_millis(300));

    timer.start();
    clock.advance(Duration::from_millis(200));
    assert!(timer.has_elapsed(Duration::from_millis(500)));

    timer.restart();
    assert_eq!(timer.elapsed(), Duration::ZERO);
    assert!(timer.is_running());

    clock.advance(Duration::from_millis(50));
    timer.reset();
    assert_eq!(timer.elapsed(), Duration::ZERO);
}

#[test]
fn either_and_select_factories_build_selections() {
    setup();
    let j = journal();

    let either = cmd::either(
        MockCommand::new("yes", &j).instant(),
        MockCommand::new("no", &j).instant(),
        || false,
    )
    .unwrap()
    .into_handle();
    let select = cmd::select(
        [
            ('a', MockCommand::new("a", &j).instant().boxed()),
            ('b', MockCommand::new("b", &j).instant().boxed()),
        ],
        || 'a',
    )
    .unwrap()
    .into_handle();

    CommandScheduler::instance().schedule_all([&either, &select]).unwrap();
    tick();

    assert_eq!(count(&j, "no.end(false)"), 1);
    assert_eq!(count(&j, "yes.initialize"), 0);
    assert_eq!(count(&j, "a.end(false)"), 1);
    assert_eq!(count(&j, "b.initialize"), 0);
}

#[test]
fn deadline_factory_uses_its_first_argument_as_the_deadline() {
    let clock = setup();
    let j = journal();
    let group = cmd::deadline(
        cmd::wait(Duration::from_millis(40)),
        vec![MockCommand::new("cohort", &j).boxed()],
    )
    .unwrap()
    .into_handle();

    group.schedule().unwrap();
    tick();
    clock.advance(Duration::from_millis(40));
    tick();

    assert!(!group.is_scheduled());
    assert_eq!(count(&j, "cohort.end(true)"), 1);
}
