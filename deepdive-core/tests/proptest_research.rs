//! Property-based tests for the research engine using proptest.

use proptest::prelude::*;
use std::time::Duration;

use deepdive_core::research::classifier::classify_question;
use deepdive_core::research::hypothesis::mean_confidence;
use deepdive_core::research::parsing::{parse_decomposition, parse_verdict};
use deepdive_core::{
    ExperiencePool, Hypothesis, Problem, TaskError, TaskResult, TaskType, WorkerPool,
};
use deepdive_core::research::Synthesizer;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_time()
        .build()
        .unwrap()
}

fn task_result(index: usize, ok: bool) -> TaskResult {
    let problem = Problem::new(index, format!("problem {index}"));
    if ok {
        TaskResult::success(&problem, Vec::new(), format!("summary {index}"))
    } else {
        TaskResult::failed(&problem, "unreachable")
    }
}

// --- Worker pool properties ---

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn pool_preserves_submission_order(
        delays in prop::collection::vec(0u64..4, 0..12),
        max_workers in 1usize..6,
    ) {
        let expected: Vec<usize> = (0..delays.len()).collect();
        let items: Vec<(usize, u64)> = delays.into_iter().enumerate().collect();
        let pool = WorkerPool::new(max_workers).unwrap();

        let results = runtime().block_on(pool.run(items, |(index, delay)| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok::<_, TaskError>(index)
        }));

        let indices: Vec<usize> = results.into_iter().map(|r| r.unwrap()).collect();
        prop_assert_eq!(indices, expected);
    }

    #[test]
    fn pool_failures_stay_in_their_slot(
        failing in prop::collection::vec(any::<bool>(), 1..10),
        max_workers in 1usize..4,
    ) {
        let items: Vec<(usize, bool)> = failing.iter().copied().enumerate().collect();
        let pool = WorkerPool::new(max_workers).unwrap();

        let results = runtime().block_on(pool.run(items, |(index, fail)| async move {
            if fail {
                panic!("job {index} failed");
            }
            Ok::<_, TaskError>(index)
        }));

        prop_assert_eq!(results.len(), failing.len());
        for (i, (result, fail)) in results.iter().zip(&failing).enumerate() {
            match result {
                Ok(index) => {
                    prop_assert!(!fail);
                    prop_assert_eq!(*index, i);
                }
                Err(TaskError::Panicked { message }) => {
                    prop_assert!(fail);
                    prop_assert_eq!(message, &format!("job {i} failed"));
                }
                Err(other) => prop_assert!(false, "unexpected error {other}"),
            }
        }
    }
}

// --- Confidence properties ---

proptest! {
    #[test]
    fn mean_confidence_is_bounded(values in prop::collection::vec(any::<f64>(), 0..20)) {
        let mean = mean_confidence(values);
        prop_assert!((0.0..=1.0).contains(&mean));
    }

    #[test]
    fn pool_mean_lies_between_extremes(confidences in prop::collection::vec(0.0f64..=1.0, 1..10)) {
        let mut pool = ExperiencePool::new();
        for (i, c) in confidences.iter().enumerate() {
            let mut hypothesis = Hypothesis::new(i + 1, format!("claim {i}"), 1);
            hypothesis.mark_verified(Vec::new(), *c);
            prop_assert!(pool.record(&hypothesis));
        }
        let min = confidences.iter().copied().fold(f64::INFINITY, f64::min);
        let max = confidences.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = pool.mean_confidence();
        prop_assert!(mean >= min - 1e-9 && mean <= max + 1e-9);
    }

    #[test]
    fn proposed_hypotheses_never_enter_the_pool(statement in ".{0,40}") {
        let mut pool = ExperiencePool::new();
        prop_assert!(!pool.record(&Hypothesis::new(1, statement, 1)));
        prop_assert_eq!(pool.mean_confidence(), 0.0);
    }
}

// --- Merge properties ---

proptest! {
    #[test]
    fn merge_is_order_independent(
        outcomes in prop::collection::vec(any::<bool>(), 0..10),
        seed in any::<u64>(),
    ) {
        let results: Vec<TaskResult> = outcomes
            .iter()
            .enumerate()
            .map(|(i, ok)| task_result(i, *ok))
            .collect();
        let mut shuffled = results.clone();
        if !shuffled.is_empty() {
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
            shuffled.reverse();
        }

        let sorted = Synthesizer::merge(results);
        let merged = Synthesizer::merge(shuffled);
        prop_assert_eq!(&merged, &sorted);

        let again = Synthesizer::merge(merged.entries.clone());
        prop_assert_eq!(&again, &merged);
        prop_assert_eq!(merged.overview.total, outcomes.len());
        prop_assert_eq!(
            merged.overview.succeeded,
            outcomes.iter().filter(|ok| **ok).count()
        );
    }
}

// --- Parsing properties ---

proptest! {
    #[test]
    fn verdict_confidence_is_normalized(text in "\\PC{1,200}", threshold in 0.0f64..=1.0) {
        if let Ok(verdict) = parse_verdict(&text, threshold) {
            prop_assert!((0.0..=1.0).contains(&verdict.confidence));
        }
    }

    #[test]
    fn decomposition_never_returns_empty(text in "\\PC{0,300}", question in "[a-z]{1,30}") {
        let parsed = parse_decomposition(&text, &question);
        prop_assert!(!parsed.problems.is_empty());
        prop_assert!(parsed.problems.iter().all(|p| !p.trim().is_empty()));
    }

    #[test]
    fn classifier_never_returns_auto(question in "\\PC{0,200}") {
        prop_assert_ne!(classify_question(&question), TaskType::Auto);
    }
}
