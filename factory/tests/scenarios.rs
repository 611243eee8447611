use std::time::Duration;

use float_cmp::approx_eq;
use quickcheck_macros::quickcheck;
use rstest::{fixture, rstest};
use simcore::{Container, StopReason};
use strum::IntoEnumIterator;

use factory::{
    run_all, Activity, Config, ConfigError, Error, Factory, Phase, Pool, RunReport, Scenario,
    StartMark, StationKind, UnitId,
};

const HORIZON: Duration = Duration::from_secs(40);

#[fixture]
fn baseline() -> Scenario {
    Scenario::new("baseline", 0.5, 1.5, 1.1)
}

fn run(scenario: &Scenario, start_mark: StartMark) -> RunReport {
    Factory::build(scenario, start_mark)
        .unwrap()
        .run(HORIZON)
        .unwrap()
}

fn flow(report: &RunReport, pool: Pool) -> (u64, u64) {
    let pool = report.levels.iter().find(|r| r.pool == pool).unwrap();
    (pool.withdrawn, pool.deposited)
}

/// Steps through the whole run and checks every pool after every event.
fn check_levels_while_running(scenario: &Scenario, start_mark: StartMark) {
    let mut factory = Factory::build(scenario, start_mark).unwrap();
    let mut previous = factory.time();
    while factory.next_event_time().map_or(false, |t| t <= HORIZON) {
        assert!(factory.step().unwrap());
        assert!(factory.time() >= previous);
        previous = factory.time();
        for report in factory.levels() {
            assert!(
                report.level <= report.capacity,
                "{} over capacity at {:?}",
                report.pool,
                factory.time()
            );
            assert_eq!(
                report.level + report.withdrawn,
                report.pool.initial_level() + report.deposited,
                "{} out of balance",
                report.pool
            );
        }
    }
}

#[rstest(start_mark, case(StartMark::Request), case(StartMark::Acquired))]
fn test_levels_stay_within_capacity(start_mark: StartMark) {
    for scenario in &Config::default().scenarios {
        check_levels_while_running(scenario, start_mark);
    }
}

#[rstest(start_mark, case(StartMark::Request), case(StartMark::Acquired))]
fn test_start_and_end_counts(start_mark: StartMark) {
    for scenario in &Config::default().scenarios {
        let report = run(scenario, start_mark);
        assert_eq!(report.stop, StopReason::HorizonReached);
        assert_eq!(report.time, HORIZON);
        for summary in report.trace.summary() {
            assert!(
                summary.started == summary.finished || summary.started == summary.finished + 1,
                "{}: {}",
                scenario.name,
                summary
            );
        }
        let assembled = report.trace.count(Phase::End, Activity::Assembling);
        assert_eq!(report.level(Pool::Dispatch), assembled as u64);
    }
}

#[rstest(start_mark, case(StartMark::Request), case(StartMark::Acquired))]
fn test_mass_balance(baseline: Scenario, start_mark: StartMark) {
    let report = run(&baseline, start_mark);
    let trace = &report.trace;
    let count = |phase, activity| trace.count(phase, activity) as u64;

    let (plastic_withdrawn, _) = flow(&report, Pool::Plastic);
    let ended = count(Phase::End, Activity::BodyMaking) + count(Phase::End, Activity::PropellerMaking);
    let started =
        count(Phase::Start, Activity::BodyMaking) + count(Phase::Start, Activity::PropellerMaking);
    assert!(ended <= plastic_withdrawn && plastic_withdrawn <= started);
    assert_eq!(report.level(Pool::Plastic), 500 - plastic_withdrawn);

    let (body_withdrawn, body_deposited) = flow(&report, Pool::FirstBodyBuffer);
    assert_eq!(body_deposited, count(Phase::End, Activity::BodyMaking));
    assert_eq!(body_withdrawn % 2, 0);
    assert_eq!(
        body_deposited - body_withdrawn,
        report.level(Pool::FirstBodyBuffer)
    );

    let (propeller_withdrawn, propeller_deposited) = flow(&report, Pool::FirstPropellerBuffer);
    assert_eq!(
        propeller_deposited,
        4 * count(Phase::End, Activity::PropellerMaking)
    );
    assert_eq!(propeller_withdrawn % 8, 0);
    // The painter takes bodies first, so it may hold one batch of bodies without propellers.
    assert!(propeller_withdrawn / 8 <= body_withdrawn / 2);
    assert!(body_withdrawn / 2 <= propeller_withdrawn / 8 + 1);
}

#[test]
fn test_later_smaller_request_waits() {
    let mut pool = Container::new(100, 0).unwrap();
    assert!(pool.withdraw(8, "painter").unwrap().is_empty());
    assert!(pool.withdraw(4, "assembler").unwrap().is_empty());
    assert!(pool.deposit(4).unwrap().is_empty());
    assert_eq!(pool.level(), 4);
    assert_eq!(pool.deposit(4).unwrap(), vec!["painter"]);
    assert_eq!(pool.deposit(4).unwrap(), vec!["assembler"]);
    assert_eq!(pool.level(), 0);
}

#[rstest(start_mark, case(StartMark::Request), case(StartMark::Acquired))]
fn test_deterministic(baseline: Scenario, start_mark: StartMark) {
    let first = run(&baseline, start_mark);
    let second = run(&baseline, start_mark);
    assert_eq!(first.trace.records(), second.trace.records());
    assert_eq!(first.levels, second.levels);

    let mut first_csv = Vec::new();
    let mut second_csv = Vec::new();
    first.trace.write_csv(&mut first_csv).unwrap();
    second.trace.write_csv(&mut second_csv).unwrap();
    assert_eq!(first_csv, second_csv);
}

#[rstest]
fn test_baseline_when_inputs_acquired(baseline: Scenario) {
    let report = run(&baseline, StartMark::Acquired);
    let trace = &report.trace;

    for activity in &[Activity::BodyMaking, Activity::PropellerMaking] {
        let end = trace.first(Phase::End, *activity).unwrap();
        assert_eq!(end.unit, UnitId::FIRST);
        assert_eq!(end.time, Duration::from_secs(1));
        assert_eq!(trace.count(Phase::Start, *activity), 41);
        assert_eq!(trace.count(Phase::End, *activity), 40);
    }

    // Two bodies and eight propellers are in the buffers once both makers are done at 2.
    let start = trace.first(Phase::Start, Activity::Painting).unwrap();
    assert_eq!(start.unit, UnitId::FIRST);
    assert_eq!(start.station, StationKind::Painter);
    assert_eq!(start.time, Duration::from_secs(2));
    assert_eq!(start.end, None);

    let end = trace.first(Phase::End, Activity::Painting).unwrap();
    assert_eq!(end.start, Duration::from_secs(2));
    assert_eq!(end.end, Some(Duration::from_millis(3500)));
    assert_eq!(trace.count(Phase::Start, Activity::Painting), 20);
    assert_eq!(trace.count(Phase::End, Activity::Painting), 19);

    let start = trace.first(Phase::Start, Activity::Assembling).unwrap();
    assert_eq!(start.time, Duration::from_millis(3500));
    let end = trace.first(Phase::End, Activity::Assembling).unwrap();
    assert_eq!(end.time, Duration::from_millis(4600));

    assert_eq!(report.level(Pool::Plastic), 418);
    assert_eq!(report.level(Pool::FirstBodyBuffer), 0);
}

#[rstest]
fn test_baseline_when_requested(baseline: Scenario) {
    let report = run(&baseline, StartMark::Request);
    let trace = &report.trace;

    let units: Vec<_> = trace
        .iter()
        .take(4)
        .map(|r| (r.station, r.stage.phase, r.time))
        .collect();
    assert_eq!(
        units,
        StationKind::iter()
            .map(|kind| (kind, Phase::Start, Duration::default()))
            .collect::<Vec<_>>()
    );

    let end = trace.first(Phase::End, Activity::Painting).unwrap();
    assert_eq!(end.unit, UnitId::FIRST);
    assert_eq!(end.start, Duration::default());
    assert_eq!(end.time, Duration::from_millis(3500));

    // The second unit is requested right after the first one is done.
    let second = trace
        .iter()
        .filter(|r| r.stage.phase == Phase::Start && r.station == StationKind::Painter)
        .nth(1)
        .unwrap();
    assert_eq!(second.unit, UnitId::FIRST.next());
    assert_eq!(second.time, Duration::from_millis(3500));

    let end = trace.first(Phase::End, Activity::Assembling).unwrap();
    assert_eq!(end.start, Duration::default());
    assert_eq!(end.time, Duration::from_millis(4600));
}

#[rstest]
fn test_json_times(baseline: Scenario) {
    let report = run(&baseline, StartMark::Acquired);
    let mut output = Vec::new();
    report.trace.write_json_lines(&mut output).unwrap();
    let output = String::from_utf8(output).unwrap();
    let record: serde_json::Value = output
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .find(|record| record["stage"] == "End Assembling")
        .unwrap();
    assert_eq!(record["station"], "assembler");
    assert_eq!(record["unit"], 1);
    assert!(approx_eq!(f64, record["start"].as_f64().unwrap(), 3.5, ulps = 2));
    assert!(approx_eq!(f64, record["end"].as_f64().unwrap(), 4.6, ulps = 2));
    assert_eq!(output.lines().count(), report.trace.len());
}

#[test]
fn test_bad_scenario_does_not_affect_others() {
    let input = r#"
horizon: 40
scenarios:
  - name: baseline
    setup: 0.5
    painting: 1.5
    assembly: 1.1
  - name: broken
    setup: 0.5
    painting: -3
    assembly: 1.1
  - name: slow_assembly
    setup: 0.5
    painting: 1.5
    assembly: 2.5"#;
    let config = Config::from_yaml(std::io::Cursor::new(input)).unwrap();
    let results = run_all(&config).unwrap();
    assert!(matches!(
        &results[1],
        Err(Error::Config(ConfigError::InvalidDuration { scenario, .. })) if scenario == "broken"
    ));
    let baseline = results[0].as_ref().unwrap();
    let slow = results[2].as_ref().unwrap();
    assert_eq!(
        baseline.trace.records(),
        run(&config.scenarios[0], StartMark::Request).trace.records()
    );
    assert!(slow.level(Pool::Dispatch) < baseline.level(Pool::Dispatch));
}

#[test]
fn test_missing_and_malformed_durations_fail_their_scenario_only() {
    let input = r#"
scenarios:
  - name: baseline
    setup: 0.5
    painting: 1.5
    assembly: 1.1
  - name: unreadable
    setup: 0.5
    painting: fast
    assembly: 1.1
  - name: incomplete
    setup: 0.5
    painting: 1.5"#;
    let config = Config::from_yaml(std::io::Cursor::new(input)).unwrap();
    let results = run_all(&config).unwrap();
    assert_eq!(results.len(), 3);
    assert!(matches!(
        &results[1],
        Err(Error::Config(ConfigError::MalformedParameter { scenario, parameter, .. }))
            if scenario == "unreadable" && *parameter == "painting"
    ));
    assert!(matches!(
        &results[2],
        Err(Error::Config(ConfigError::MissingParameter { scenario, parameter }))
            if scenario == "incomplete" && *parameter == "assembly"
    ));
    let baseline = results[0].as_ref().unwrap();
    assert_eq!(baseline.stop, StopReason::HorizonReached);
    assert_eq!(
        baseline.trace.records(),
        run(&config.scenarios[0], StartMark::Request).trace.records()
    );
}

#[quickcheck]
fn levels_and_counts_hold_for_any_durations(painting: u8, assembly: u8) -> bool {
    let painting = 0.1 + f64::from(painting % 40) / 10.0;
    let assembly = 0.1 + f64::from(assembly % 50) / 10.0;
    let scenario = Scenario::new("arbitrary", 0.5, painting, assembly);
    check_levels_while_running(&scenario, StartMark::Acquired);
    let report = run(&scenario, StartMark::Request);
    report
        .trace
        .summary()
        .iter()
        .all(|s| s.started == s.finished || s.started == s.finished + 1)
}
