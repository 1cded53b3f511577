//! Observational soundness of the optimization pipeline on whole
//! programs: same result, same failure kind, same logs; never a larger
//! budget on programs that do not gain extraction bindings.

use uplc::{Parameters, Plutus, Program, cost::Category, Builtin};

fn parse(source: &str) -> Program {
    source.parse().unwrap_or_else(|e| panic!("{source}: {e}"))
}

const SAMPLES: &[&str] = &[
    "(program 1.0.0 [(builtin addInteger) (con integer 5) (con integer 10)])",
    "(program 1.0.0 [(lam x x) (con integer 42)])",
    "(program 1.0.0 [(lam x [(builtin addInteger) x x]) (con integer 21)])",
    "(program 1.0.0 (force (delay (con integer 1))))",
    "(program 1.0.0 [(lam x (con integer 7)) [(builtin addInteger) (con integer 1) (con integer 2)]])",
    "(program 1.0.0 (force [(force (builtin ifThenElse)) (con bool False) (delay [(builtin addInteger) (con integer 1) (con integer 2)]) (delay (con integer 9))]))",
    "(program 1.0.0 [(force (builtin trace)) (con string \"log line\") (con integer 3)])",
    "(program 1.0.0 [(lam x x) (error)])",
    "(program 1.0.0 [(builtin divideInteger) (con integer 1) (con integer 0)])",
    "(program 1.0.0 [(force (builtin headList)) (con (list integer) [5, 6])])",
    "(program 1.1.0 (case (constr 0 (con integer 1) (con integer 2)) (builtin addInteger)))",
];

fn params_for(program: &Program) -> Parameters {
    if program.version.has_datatypes() {
        Parameters::default_for(Plutus::V3)
    } else {
        Parameters::default_for(Plutus::V2)
    }
}

#[test]
fn pipeline_preserves_results_and_logs() {
    for source in SAMPLES {
        let program = parse(source);
        let params = params_for(&program);
        let raw = program.run(&params);
        let optimized = program.optimize(params.plutus).run(&params);

        match (&raw.result, &optimized.result) {
            (Ok(a), Ok(b)) => assert_eq!(a.term, b.term, "{source}"),
            (Err(a), Err(b)) => assert_eq!(a, b, "{source}"),
            (a, b) => panic!("{source}: outcomes diverge: {a:?} vs {b:?}"),
        }
        assert_eq!(raw.logs, optimized.logs, "{source}");
    }
}

#[test]
fn pipeline_is_idempotent() {
    for source in SAMPLES {
        let program = parse(source);
        let plutus = params_for(&program).plutus;
        let once = program.optimize(plutus);
        let twice = once.optimize(plutus);
        assert_eq!(once.term, twice.term, "{source}");
    }
}

#[test]
fn pipeline_does_not_cost_more() {
    // Samples with no extraction candidates and no lazy conditionals: for
    // these the optimized budget must not exceed the raw one. (Extraction
    // adds a bounded number of binding steps; strict conditionals trade
    // laziness for steps. Both are covered by the soundness test above.)
    const SHRINKING: &[&str] = &[
        "(program 1.0.0 [(builtin addInteger) (con integer 5) (con integer 10)])",
        "(program 1.0.0 [(lam x x) (con integer 42)])",
        "(program 1.0.0 [(lam x [(builtin addInteger) x x]) (con integer 21)])",
        "(program 1.0.0 (force (delay (con integer 1))))",
        "(program 1.0.0 [(lam x (con integer 7)) [(builtin addInteger) (con integer 1) (con integer 2)]])",
        "(program 1.0.0 [(lam x x) (error)])",
        "(program 1.0.0 [(builtin divideInteger) (con integer 1) (con integer 0)])",
    ];
    for source in SHRINKING {
        let program = parse(source);
        let params = params_for(&program);
        let raw = program.run(&params);
        let optimized = program.optimize(params.plutus).run(&params);
        assert!(
            optimized.budget.execution <= raw.budget.execution,
            "{source}: {} > {}",
            optimized.budget.execution,
            raw.budget.execution
        );
        assert!(optimized.budget.memory <= raw.budget.memory, "{source}");
    }
}

#[test]
fn dead_arguments_are_never_stepped() {
    // (\x -> 7) (addInteger 1 2): the argument is pure and unused, so the
    // optimized program charges nothing for addInteger.
    let program = parse(
        "(program 1.0.0 [(lam x (con integer 7)) [(builtin addInteger) (con integer 1) (con integer 2)]])",
    );
    let params = Parameters::default_for(Plutus::V2);
    let outcome = program.evaluate_debug(&params);
    assert_eq!(
        outcome.result.unwrap().term,
        parse("(program 1.0.0 (con integer 7))").term
    );
    assert_eq!(
        outcome
            .costs
            .get(Category::BuiltinApplication(Builtin::AddInteger)),
        uplc::Budget::ZERO
    );
}

#[test]
fn eta_reduced_wrappers_behave_identically() {
    // \x -> f x around a builtin produces the same application result,
    // with fewer steps reported by the debug entry point.
    let wrapped = parse(
        "(program 1.0.0 [(lam x [(builtin lengthOfByteString) x]) (con bytestring #0102)])",
    );
    let params = Parameters::default_for(Plutus::V2);
    let raw = wrapped.run(&params);
    let optimized = wrapped.evaluate_debug(&params);
    assert_eq!(
        raw.result.unwrap().term,
        optimized.result.unwrap().term
    );
    // The pass removed steps, so the debug budget shrank.
    assert!(optimized.budget.execution < raw.budget.execution);
}

#[test]
fn forced_builtins_are_shared() {
    // Two forced headList uses become one binding; the program still
    // evaluates to the same result.
    let source = "(program 1.0.0 [(builtin addInteger) [(force (builtin headList)) (con (list integer) [1])] [(force (builtin headList)) (con (list integer) [2])]])";
    let program = parse(source);
    let params = Parameters::default_for(Plutus::V2);
    let raw = program.run(&params);
    let optimized = program.evaluate_debug(&params);
    assert_eq!(
        raw.result.unwrap().term,
        optimized.result.unwrap().term
    );
    // Only one force is charged after extraction.
    assert_eq!(
        optimized.costs.get(Category::Force).execution,
        params.base.force.execution
    );
}

#[test]
fn case_constr_compaction_preserves_results() {
    let source = "(program 1.1.0 [(lam a (lam b (lam c [(builtin addInteger) a [(builtin addInteger) b c]]))) (con integer 1) (con integer 2) (con integer 3)])";
    let program = parse(source);
    let params = Parameters::default_for(Plutus::V3);
    let raw = program.run(&params);
    let optimized = program.evaluate_debug(&params);
    assert_eq!(
        raw.result.unwrap().term,
        optimized.result.unwrap().term
    );
}

#[test]
fn v1_programs_never_gain_datatype_forms() {
    // A three-argument chain whose parts the inliner leaves alone: large
    // constants applied to a bare builtin.
    let blob = "ab".repeat(65);
    let term = format!(
        "[(builtin addInteger) (con bytestring #{blob}) (con bytestring #{blob}) (con bytestring #{blob})]"
    );

    // Under a 1.1.0 version the chain compacts into a case/constr pair.
    let v3: Program = format!("(program 1.1.0 {term})").parse().unwrap();
    let compacted = v3.optimize(Plutus::V3);
    assert!(matches!(&*compacted.term, uplc::Term::Case { .. }));

    // A 1.0.0 program must stay free of the datatype forms and decodable.
    let v1: Program = format!("(program 1.0.0 {term})").parse().unwrap();
    let optimized = v1.optimize(Plutus::V3);
    let bytes = optimized.to_flat();
    assert_eq!(Program::from_flat(&bytes).unwrap(), optimized);
    assert!(!matches!(&*optimized.term, uplc::Term::Case { .. }));
}
