//! Property tests for detection, completeness and the stage machine.

use proptest::prelude::*;
use readiness_core::flows::{trl_lexicon, trl_pipeline, TRL_COMPONENTS};
use readiness_core::{allowed_transitions, validate_transition, Candidate, Stage};
use readiness_test_utils::{fixed_clock, test_config, ScriptedService};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

const STAGES: [Stage; 6] = [
    Stage::Idle,
    Stage::Detecting,
    Stage::Requesting,
    Stage::Validating,
    Stage::DoneEmpty,
    Stage::Done,
];

fn fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(TRL_COMPONENTS.to_vec()).prop_map(str::to_string),
        prop::sample::select(TRL_COMPONENTS.to_vec()).prop_map(str::to_uppercase),
        "[a-z ]{0,12}",
    ]
}

fn document() -> impl Strategy<Value = String> {
    prop::collection::vec(fragment(), 0..12).prop_map(|parts| parts.join(" "))
}

/// Arbitrary, possibly invalid, raw entry for one component
fn raw_entry() -> impl Strategy<Value = Value> {
    prop_oneof![
        (-5i64..20, "[a-zA-Z ]{0,10}").prop_map(|(trl, j)| json!({"trl": trl, "justification": j})),
        (-5i64..20).prop_map(|score| json!({"score": score})),
        Just(json!("4")),
        Just(Value::Null),
        any::<f64>().prop_map(|trl| json!({"trl": trl, "justification": "x"})),
    ]
}

proptest! {
    #[test]
    fn detection_is_deterministic_and_distinct(text in document()) {
        let first = trl_lexicon().detect(&text);
        prop_assert_eq!(&first, &trl_lexicon().detect(&text));

        let unique: HashSet<&Candidate> = first.iter().collect();
        prop_assert_eq!(unique.len(), first.len());
        for candidate in &first {
            prop_assert!(trl_lexicon().contains(candidate));
        }
    }

    #[test]
    fn detection_ignores_case(text in document()) {
        prop_assert_eq!(
            trl_lexicon().detect(&text.to_uppercase()),
            trl_lexicon().detect(&text.to_lowercase())
        );
    }

    #[test]
    fn every_candidate_gets_one_valid_record(
        text in document(),
        entries in prop::collection::vec(raw_entry(), TRL_COMPONENTS.len()),
        extra in any::<bool>(),
    ) {
        let mut payload: Map<String, Value> = TRL_COMPONENTS
            .iter()
            .zip(entries)
            .map(|(name, entry)| ((*name).to_string(), entry))
            .collect();
        if extra {
            payload.insert("turbine".to_string(), json!({"trl": 5, "justification": "x"}));
        }
        let service = ScriptedService::reply(Value::Object(payload).to_string()).into_shared();
        let pipeline = trl_pipeline(service, &test_config()).unwrap().with_clock(fixed_clock());

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let mapping = runtime.block_on(pipeline.run(&text));

        let detected = trl_lexicon().detect(&text);
        prop_assert_eq!(mapping.candidates().cloned().collect::<Vec<_>>(), detected);

        let timestamps: HashSet<String> = mapping.iter().map(|(_, s)| s.observed_at.to_string()).collect();
        prop_assert!(timestamps.len() <= 1);
        for (_, stamped) in &mapping {
            prop_assert!((1..=9).contains(&stamped.record.score.get()));
            prop_assert!(!stamped.record.justification.trim().is_empty());
        }
    }

    #[test]
    fn transitions_follow_the_table(from in prop::sample::select(STAGES.to_vec()), to in prop::sample::select(STAGES.to_vec())) {
        prop_assert_eq!(validate_transition(from, to).is_ok(), allowed_transitions(from).contains(&to));
        if from.is_terminal() {
            prop_assert!(validate_transition(from, to).is_err());
        }
    }
}
