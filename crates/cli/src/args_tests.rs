// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn parse(argv: &[&str]) -> Args {
    let mut full = vec!["depot"];
    full.extend_from_slice(argv);
    Args::try_parse_from(full).unwrap()
}

#[test]
fn defaults_touch_nothing() {
    let args = parse(&[]);
    let mut config = SimConfig::default();
    args.apply(&mut config);
    assert_eq!(config.log_mode, LogMode::Summary);
    assert!(!config.perf_mode);
    assert!(!config.depart_when_full);
    assert!(config.max_passengers.is_none());
    assert!(args.scenario().is_none());
}

#[yare::parameterized(
    verbose = { "verbose", LogMode::Verbose },
    summary = { "summary", LogMode::Summary },
    minimal = { "minimal", LogMode::Minimal },
)]
fn log_flag_selects_the_mode(value: &str, expected: LogMode) {
    let args = parse(&["--log", value]);
    let mut config = SimConfig::default();
    args.apply(&mut config);
    assert_eq!(config.log_mode, expected);
}

#[test]
fn perf_and_full_flags_apply() {
    let args = parse(&["--perf", "--full"]);
    let mut config = SimConfig::default();
    args.apply(&mut config);
    assert!(config.perf_mode);
    assert!(config.depart_when_full);
}

#[test]
fn max_p_without_value_uses_the_default_cap() {
    let args = parse(&["--max-p"]);
    let mut config = SimConfig::default();
    args.apply(&mut config);
    assert_eq!(config.max_passengers, Some(SimConfig::DEFAULT_MAX_PASSENGERS));
}

#[test]
fn max_p_accepts_an_explicit_value_and_the_underscore_spelling() {
    let args = parse(&["--max-p", "20"]);
    let mut config = SimConfig::default();
    args.apply(&mut config);
    assert_eq!(config.max_passengers, Some(20));

    let args = parse(&["--max_p", "7"]);
    let mut config = SimConfig::default();
    args.apply(&mut config);
    assert_eq!(config.max_passengers, Some(7));
}

#[test]
fn scenario_flags_map_to_numbers() {
    assert_eq!(parse(&["--test1"]).scenario(), Some(1));
    assert_eq!(parse(&["--test4"]).scenario(), Some(4));
    assert_eq!(parse(&["--test10"]).scenario(), Some(10));
    // Lowest number wins when several are set
    assert_eq!(parse(&["--test3", "--test7"]).scenario(), Some(3));
}

#[test]
fn unknown_flags_are_rejected() {
    assert!(Args::try_parse_from(["depot", "--warp"]).is_err());
}
